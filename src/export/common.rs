//! Common-data factoring
//!
//! Columns holding one value across the whole layer would be repeated in every
//! chunk file. When a layer is split into several chunks they are written once,
//! as a one-row common artifact, and removed from the chunks.

use crate::data::{column_names, column_values, take_rows};
use crate::{DataFrame, Result};

/// Common artifact of a layer
#[derive(Debug, Clone)]
pub struct Common {
    /// Columns moved out of the chunks, in frame order
    pub columns: Vec<String>,
    /// One row holding the shared values
    pub data: DataFrame,
}

/// Columns with a single value over the whole frame
///
/// `key_columns` (chunk, nest and group columns) are never common, and neither
/// are columns that are entirely missing. A column that mixes one value with
/// missing cells is not constant.
pub fn constant_columns(data: &DataFrame, key_columns: &[String]) -> Result<Vec<String>> {
    let mut constant = Vec::new();
    for name in column_names(data) {
        if key_columns.contains(&name) {
            continue;
        }
        let values = column_values(data, &name)?;
        let Some(first) = values.first() else {
            continue;
        };
        if !first.is_missing() && values.iter().all(|v| v == first) {
            constant.push(name);
        }
    }
    Ok(constant)
}

/// Factor constant columns out of a layer split into `chunk_count` chunks
///
/// Returns `None` unless there are at least two chunks and one constant column.
pub fn extract_common(
    data: &DataFrame,
    key_columns: &[String],
    chunk_count: usize,
) -> Result<Option<Common>> {
    if chunk_count < 2 {
        return Ok(None);
    }
    let columns = constant_columns(data, key_columns)?;
    if columns.is_empty() {
        return Ok(None);
    }
    let data = take_rows(data, &[0])?.select(columns.iter().map(|c| c.as_str()))?;
    Ok(Some(Common { columns, data }))
}
