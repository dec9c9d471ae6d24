//! DataFrame helpers shared by the export passes
//!
//! The export passes work on row keys rather than on typed columns: partition
//! values, selector values and sort keys are all read through [`CellValue`], which
//! papers over the numeric/string/categorical column types that upstream renderers
//! produce.

use polars::prelude::*;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;

use crate::naming::PANEL_COLUMN;
use crate::{AnimintError, Result};

/// Rows written to the scratch buffer from each end of a frame when estimating
/// serialized size
pub const SAMPLE_ROWS: usize = 6;

/// A single cell read from a row table
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Missing,
    Boolean(bool),
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, CellValue::Missing)
    }

    /// String key used for partition maps and selector values
    pub fn key(&self) -> Option<String> {
        match self {
            CellValue::Missing => None,
            CellValue::Boolean(b) => Some(b.to_string()),
            CellValue::Number(n) => Some(format_number(*n)),
            CellValue::Text(s) => Some(s.clone()),
        }
    }

    /// Total order: numbers before booleans before text, missing last
    pub fn compare(&self, other: &CellValue) -> Ordering {
        use CellValue::*;
        match (self, other) {
            (Missing, Missing) => Ordering::Equal,
            (Missing, _) => Ordering::Greater,
            (_, Missing) => Ordering::Less,
            (Number(a), Number(b)) => a.total_cmp(b),
            (Number(_), _) => Ordering::Less,
            (_, Number(_)) => Ordering::Greater,
            (Boolean(a), Boolean(b)) => a.cmp(b),
            (Boolean(_), _) => Ordering::Less,
            (_, Boolean(_)) => Ordering::Greater,
            (Text(a), Text(b)) => a.cmp(b),
        }
    }
}

/// Format a number the way R prints it in a TSV: integral values without a
/// fractional part, infinities as `Inf`/`-Inf`
pub fn format_number(value: f64) -> String {
    if value.is_infinite() {
        if value > 0.0 { "Inf" } else { "-Inf" }.to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Compare two key strings, numerically when both parse as numbers
pub fn compare_keys(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.total_cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        _ => a.cmp(b),
    }
}

/// Check whether a dtype holds numbers
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    use DataType::*;
    matches!(
        dtype,
        Int8 | Int16 | Int32 | Int64 | UInt8 | UInt16 | UInt32 | UInt64 | Float32 | Float64
    )
}

pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect()
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

/// Read every cell of a column
pub fn column_values(df: &DataFrame, name: &str) -> Result<Vec<CellValue>> {
    let column = df.column(name).map_err(|_| missing_column(name))?;
    let series = column.as_materialized_series();
    let dtype = series.dtype().clone();

    let values = if is_numeric_dtype(&dtype) {
        let floats = series.cast(&DataType::Float64)?;
        floats
            .f64()?
            .into_iter()
            .map(|v| match v {
                Some(n) if !n.is_nan() => CellValue::Number(n),
                _ => CellValue::Missing,
            })
            .collect()
    } else if dtype == DataType::Boolean {
        series
            .bool()?
            .into_iter()
            .map(|v| v.map_or(CellValue::Missing, CellValue::Boolean))
            .collect()
    } else {
        let strings = if dtype == DataType::String {
            series.clone()
        } else {
            series.cast(&DataType::String)?
        };
        strings
            .str()?
            .into_iter()
            .map(|v| v.map_or(CellValue::Missing, |s| CellValue::Text(s.to_string())))
            .collect()
    };
    Ok(values)
}

/// Read a column as partition keys (`None` for missing cells)
pub fn column_keys(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    Ok(column_values(df, name)?
        .iter()
        .map(CellValue::key)
        .collect())
}

/// Read a numeric column, failing when it is absent or not numeric
pub fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df.column(name).map_err(|_| missing_column(name))?;
    if !is_numeric_dtype(column.dtype()) {
        return Err(AnimintError::DataError(format!(
            "Column '{}' must be numeric, found {}",
            name,
            column.dtype()
        )));
    }
    let floats = column.as_materialized_series().cast(&DataType::Float64)?;
    Ok(floats.f64()?.into_iter().collect())
}

/// Distinct non-missing keys of a column, in natural order
pub fn distinct_keys(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let mut keys: Vec<String> = column_keys(df, name)?.into_iter().flatten().collect();
    keys.sort_by(|a, b| compare_keys(a, b));
    keys.dedup();
    Ok(keys)
}

/// Flag rows that contain a missing value
///
/// Columns missing in every row carry no data and are ignored.
pub fn rows_with_missing(df: &DataFrame) -> Result<Vec<bool>> {
    let mut missing = vec![false; df.height()];
    for name in column_names(df) {
        let values = column_values(df, &name)?;
        if values.iter().all(CellValue::is_missing) {
            continue;
        }
        for (row, value) in values.iter().enumerate() {
            if value.is_missing() {
                missing[row] = true;
            }
        }
    }
    Ok(missing)
}

/// 1-based panel number of every row; rows without a panel column belong to panel 1
pub fn panel_ids(df: &DataFrame) -> Result<Vec<usize>> {
    if !has_column(df, PANEL_COLUMN) {
        return Ok(vec![1; df.height()]);
    }
    column_values(df, PANEL_COLUMN)?
        .into_iter()
        .map(|value| match value {
            CellValue::Missing => Ok(1),
            CellValue::Number(n) if n >= 1.0 => Ok(n as usize),
            CellValue::Text(s) => s.trim().parse::<usize>().map_err(|_| {
                AnimintError::DataError(format!("Invalid {} value '{}'", PANEL_COLUMN, s))
            }),
            other => Err(AnimintError::DataError(format!(
                "Invalid {} value {:?}",
                PANEL_COLUMN, other
            ))),
        })
        .collect()
}

/// Select rows by position, in the given order
pub fn take_rows(df: &DataFrame, rows: &[usize]) -> Result<DataFrame> {
    let indices: Vec<IdxSize> = rows.iter().map(|&r| r as IdxSize).collect();
    let idx = IdxCa::from_vec("idx".into(), indices);
    Ok(df.take(&idx)?)
}

/// Group row positions by the tuple of keys in `columns`
///
/// Rows with a missing key are skipped. Groups come back in natural key order and
/// rows keep their relative order within a group.
pub fn group_rows(df: &DataFrame, columns: &[String]) -> Result<Vec<(Vec<String>, Vec<usize>)>> {
    let keys = columns
        .iter()
        .map(|c| column_keys(df, c))
        .collect::<Result<Vec<_>>>()?;

    let mut index: HashMap<Vec<String>, usize> = HashMap::new();
    let mut groups: Vec<(Vec<String>, Vec<usize>)> = Vec::new();
    'rows: for row in 0..df.height() {
        let mut key = Vec::with_capacity(keys.len());
        for column in &keys {
            match &column[row] {
                Some(k) => key.push(k.clone()),
                None => continue 'rows,
            }
        }
        match index.get(&key) {
            Some(&g) => groups[g].1.push(row),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key, vec![row]));
            }
        }
    }

    groups.sort_by(|(a, _), (b, _)| {
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| compare_keys(x, y))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    });
    Ok(groups)
}

/// Serialize a frame as TSV, missing values written as `NA`
pub fn to_tsv(df: &DataFrame, header: bool) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut frame = df.clone();
    CsvWriter::new(&mut buffer)
        .include_header(header)
        .with_separator(b'\t')
        .with_null_value("NA".to_string())
        .finish(&mut frame)
        .map_err(|e| AnimintError::WriterError(format!("Failed to serialize TSV: {}", e)))?;
    Ok(buffer)
}

/// Average serialized bytes per row, estimated from the first and last
/// [`SAMPLE_ROWS`] rows written without a header
pub fn bytes_per_row(df: &DataFrame) -> Result<f64> {
    if df.height() == 0 {
        return Ok(0.0);
    }
    let mut sample = df.head(Some(SAMPLE_ROWS));
    sample.vstack_mut(&df.tail(Some(SAMPLE_ROWS)))?;
    let bytes = to_tsv(&sample, false)?;
    Ok(bytes.len() as f64 / sample.height() as f64)
}

/// Read a CSV file, treating `NA` cells as missing
pub fn read_csv(path: &Path) -> Result<DataFrame> {
    let parse_options = CsvParseOptions::default()
        .with_null_values(Some(NullValues::AllColumnsSingle("NA".into())));
    CsvReadOptions::default()
        .with_has_header(true)
        .with_parse_options(parse_options)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .map_err(|e| {
            AnimintError::ReaderError(format!("Failed to read '{}': {}", path.display(), e))
        })
}

fn missing_column(name: &str) -> AnimintError {
    AnimintError::DataError(format!("Column '{}' does not exist", name))
}
