//! Column type tags and colour normalisation
//!
//! The client picks how to parse and draw each column from a type tag:
//! `numeric`, `character`, `factor`, `logical`, `rgb` or `linetype`, falling back
//! to the polars dtype name. Colours are written as `#rrggbb` so the client never
//! needs a colour-name table.

use polars::prelude::*;
use std::collections::BTreeMap;
use tracing::debug;

use crate::data::{column_names, is_numeric_dtype};
use crate::types::{ArrayElement, ParameterValue};
use crate::{DataFrame, Result};

/// Aesthetics (and parameters) holding colours
pub const COLOUR_AESTHETICS: &[&str] = &[
    "colour",
    "color",
    "fill",
    "colour_off",
    "color_off",
    "fill_off",
];

const LINETYPE_NAMES: &[&str] = &[
    "blank", "solid", "dashed", "dotted", "dotdash", "longdash", "twodash",
];

pub fn is_colour_aesthetic(name: &str) -> bool {
    COLOUR_AESTHETICS.contains(&name)
}

/// Convert a colour to `#rrggbb`
///
/// Accepts CSS colours and R's `grey0`..`grey100` (or `gray`). Fully transparent
/// colours stay `transparent`; anything unparseable is returned as is.
pub fn normalize_colour(value: &str) -> String {
    if let Some(level) = grey_level(value) {
        let v = (level * 2.55).round() as u8;
        return format!("#{:02x}{:02x}{:02x}", v, v, v);
    }
    match csscolorparser::parse(value) {
        Ok(c) if c.a == 0.0 => "transparent".to_string(),
        Ok(c) => {
            let r = (c.r.clamp(0.0, 1.0) * 255.0).round() as u8;
            let g = (c.g.clamp(0.0, 1.0) * 255.0).round() as u8;
            let b = (c.b.clamp(0.0, 1.0) * 255.0).round() as u8;
            format!("#{:02x}{:02x}{:02x}", r, g, b)
        }
        Err(e) => {
            debug!("Keeping colour '{}' as is: {}", value, e);
            value.to_string()
        }
    }
}

fn grey_level(value: &str) -> Option<f64> {
    let digits = value
        .strip_prefix("grey")
        .or_else(|| value.strip_prefix("gray"))?;
    let level: u32 = digits.parse().ok()?;
    (level <= 100).then_some(level as f64)
}

/// Normalise colour-valued parameters in place
pub fn normalize_colour_params(params: &mut BTreeMap<String, ParameterValue>) {
    for (name, value) in params.iter_mut() {
        if !is_colour_aesthetic(name) {
            continue;
        }
        match value {
            ParameterValue::String(s) => *s = normalize_colour(s),
            ParameterValue::Array(items) => {
                for item in items.iter_mut() {
                    if let ArrayElement::String(s) = item {
                        *s = normalize_colour(s);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Normalise text colour columns of a frame
pub fn normalize_colour_columns(mut data: DataFrame) -> Result<DataFrame> {
    for name in column_names(&data) {
        if !is_colour_aesthetic(&name) {
            continue;
        }
        let column = data.column(&name)?;
        if !matches!(column.dtype(), DataType::String | DataType::Categorical(_, _)) {
            continue;
        }
        let strings = column.as_materialized_series().cast(&DataType::String)?;
        let normalized: Vec<Option<String>> = strings
            .str()?
            .into_iter()
            .map(|v| v.map(normalize_colour))
            .collect();
        data.with_column(Series::new(name.as_str().into(), normalized))?;
    }
    Ok(data)
}

fn is_linetype(value: &str) -> bool {
    LINETYPE_NAMES.contains(&value)
        || (matches!(value.len(), 2 | 4 | 6 | 8) && value.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Type tag of one column
pub fn column_type(data: &DataFrame, name: &str) -> Result<String> {
    let column = data.column(name)?;
    let dtype = column.dtype();
    if is_numeric_dtype(dtype) {
        return Ok("numeric".to_string());
    }
    let tag = match dtype {
        DataType::Boolean => "logical",
        DataType::Categorical(_, _) => "factor",
        DataType::String => {
            let series = column.as_materialized_series();
            let values: Vec<&str> = series.str()?.into_iter().flatten().collect();
            if !values.is_empty() && values.iter().all(|v| v.starts_with('#') && v.len() == 7) {
                "rgb"
            } else if name == "linetype"
                && !values.is_empty()
                && values.iter().all(|v| is_linetype(v))
            {
                "linetype"
            } else {
                "character"
            }
        }
        other => return Ok(other.to_string()),
    };
    Ok(tag.to_string())
}

/// Type tags of every column
pub fn column_types(data: &DataFrame) -> Result<BTreeMap<String, String>> {
    column_names(data)
        .into_iter()
        .map(|name| Ok((name.clone(), column_type(data, &name)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_colour() {
        assert_eq!(normalize_colour("red"), "#ff0000");
        assert_eq!(normalize_colour("#00F"), "#0000ff");
        assert_eq!(normalize_colour("grey50"), "#7f7f7f");
        assert_eq!(normalize_colour("grey1"), "#030303");
        assert_eq!(normalize_colour("gray100"), "#ffffff");
        assert_eq!(normalize_colour("transparent"), "transparent");
        assert_eq!(normalize_colour("not-a-colour"), "not-a-colour");
    }

    #[test]
    fn test_normalize_colour_params() {
        let mut params = BTreeMap::from([
            ("colour".to_string(), ParameterValue::String("blue".to_string())),
            (
                "fill_off".to_string(),
                ParameterValue::Array(vec![ArrayElement::String("white".to_string())]),
            ),
            ("label".to_string(), ParameterValue::String("red".to_string())),
        ]);
        normalize_colour_params(&mut params);
        assert_eq!(params["colour"].as_str(), Some("#0000ff"));
        assert_eq!(
            params["fill_off"],
            ParameterValue::Array(vec![ArrayElement::String("#ffffff".to_string())])
        );
        assert_eq!(params["label"].as_str(), Some("red"));
    }

    #[test]
    fn test_column_types() {
        let df = df! {
            "x" => &[1.0, 2.0],
            "label" => &["a", "b"],
            "colour" => &["black", "grey0"],
            "flag" => &[true, false],
            "linetype" => &["dashed", "44"],
        }
        .unwrap();
        let df = normalize_colour_columns(df).unwrap();
        let types = column_types(&df).unwrap();

        assert_eq!(types["x"], "numeric");
        assert_eq!(types["label"], "character");
        assert_eq!(types["colour"], "rgb");
        assert_eq!(types["flag"], "logical");
        assert_eq!(types["linetype"], "linetype");
    }
}
