//! Layer parameters: aesthetic overrides and usage warnings

use polars::prelude::*;
use std::collections::BTreeMap;

use crate::geom::GeomKind;
use crate::naming::CHUNK_VARS_PARAM;
use crate::selector::Classified;
use crate::types::{ArrayElement, ParameterValue};
use crate::{AnimintError, DataFrame, Result};

/// Parameters that configure the export rather than set an aesthetic
const EXPORT_PARAMS: &[&str] = &[CHUNK_VARS_PARAM];

/// Apply array-valued aesthetic parameters
///
/// A one-element array is the same as a scalar parameter. An array with one
/// element per row becomes a data column (and leaves the parameters). Any other
/// length is a data error.
pub fn apply_array_params(
    params: &mut BTreeMap<String, ParameterValue>,
    data: &mut DataFrame,
) -> Result<()> {
    let arrays: Vec<String> = params
        .iter()
        .filter(|(name, value)| {
            matches!(value, ParameterValue::Array(_)) && !EXPORT_PARAMS.contains(&name.as_str())
        })
        .map(|(name, _)| name.clone())
        .collect();

    for name in arrays {
        let Some(ParameterValue::Array(items)) = params.remove(&name) else {
            continue;
        };
        match items.len() {
            1 => {
                params.insert(name, scalar(&items[0]));
            }
            n if n == data.height() => {
                data.with_column(array_series(&name, &items))?;
            }
            n => {
                return Err(AnimintError::DataError(format!(
                    "Parameter '{}' has {} values; expected 1 or one per row ({})",
                    name,
                    n,
                    data.height()
                )))
            }
        }
    }
    Ok(())
}

fn scalar(item: &ArrayElement) -> ParameterValue {
    match item {
        ArrayElement::Boolean(b) => ParameterValue::Boolean(*b),
        ArrayElement::Number(n) => ParameterValue::Number(*n),
        ArrayElement::String(s) => ParameterValue::String(s.clone()),
        ArrayElement::Null => ParameterValue::Null,
    }
}

/// Column of an array parameter; numbers stay numeric when every element is one
fn array_series(name: &str, items: &[ArrayElement]) -> Series {
    let numeric = items
        .iter()
        .all(|i| matches!(i, ArrayElement::Number(_) | ArrayElement::Null));
    if numeric {
        let values: Vec<Option<f64>> = items
            .iter()
            .map(|i| match i {
                ArrayElement::Number(n) => Some(*n),
                _ => None,
            })
            .collect();
        Series::new(name.into(), values)
    } else {
        let values: Vec<Option<String>> = items
            .iter()
            .map(|i| match i {
                ArrayElement::Null => None,
                other => Some(other.to_key_string()),
            })
            .collect();
        Series::new(name.into(), values)
    }
}

/// Usage warnings for one layer
///
/// `geom` is the kind the layer is exported as.
pub fn usage_warnings(
    geom: GeomKind,
    classified: &Classified,
    params: &BTreeMap<String, ParameterValue>,
    stat: &str,
    position: &str,
) -> Vec<String> {
    let mut warnings = Vec::new();

    if classified.is_interactive() && (stat != "identity" || position != "identity") {
        warnings.push(format!(
            "showSelected/clickSelects with stat '{}' and position '{}' may select the wrong rows; \
             compute statistics before plotting and use stat/position identity",
            stat, position
        ));
    }

    let size = params.get("size").and_then(ParameterValue::as_number);
    if size == Some(0.0) && !geom.has_area_fill() {
        warnings.push(format!("size=0 makes {} marks invisible", geom));
    }

    if classified.click_selects.is_empty() {
        for name in params.keys().filter(|k| k.ends_with("_off")) {
            warnings.push(format!("{} has no effect without clickSelects", name));
        }
    }

    if params.contains_key("fill_off") && !geom.renders_fill() {
        warnings.push(format!("fill_off has no effect on {} marks, which have no fill", geom));
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::column_keys;
    use crate::selector::classify;
    use crate::types::Mappings;

    #[test]
    fn test_array_params() {
        let mut data = df! { "x" => &[1.0, 2.0, 3.0] }.unwrap();
        let mut params = BTreeMap::from([
            (
                "colour".to_string(),
                ParameterValue::Array(vec![ArrayElement::String("red".to_string())]),
            ),
            (
                "size".to_string(),
                ParameterValue::Array(vec![
                    ArrayElement::Number(1.0),
                    ArrayElement::Number(2.0),
                    ArrayElement::Null,
                ]),
            ),
            (
                "chunk_vars".to_string(),
                ParameterValue::Array(vec![ArrayElement::String("year".to_string())]),
            ),
        ]);
        apply_array_params(&mut params, &mut data).unwrap();

        assert_eq!(params["colour"], ParameterValue::String("red".to_string()));
        assert!(!params.contains_key("size"));
        assert!(matches!(params["chunk_vars"], ParameterValue::Array(_)));
        assert_eq!(
            column_keys(&data, "size").unwrap(),
            vec![Some("1".to_string()), Some("2".to_string()), None]
        );
    }

    #[test]
    fn test_array_param_length_mismatch() {
        let mut data = df! { "x" => &[1.0, 2.0, 3.0] }.unwrap();
        let mut params = BTreeMap::from([(
            "alpha".to_string(),
            ParameterValue::Array(vec![ArrayElement::Number(0.1), ArrayElement::Number(0.2)]),
        )]);
        let err = apply_array_params(&mut params, &mut data).unwrap_err();
        assert!(matches!(err, AnimintError::DataError(_)));
    }

    #[test]
    fn test_usage_warnings() {
        let interactive = classify(
            &[("showSelected", "year")].into_iter().collect::<Mappings>(),
        )
        .unwrap();
        let params = BTreeMap::from([
            ("size".to_string(), ParameterValue::Number(0.0)),
            ("alpha_off".to_string(), ParameterValue::Number(0.5)),
            ("fill_off".to_string(), ParameterValue::String("#ffffff".to_string())),
        ]);

        let warnings = usage_warnings(GeomKind::Line, &interactive, &params, "bin", "identity");
        assert_eq!(warnings.len(), 5, "{:?}", warnings);
        assert!(warnings[0].contains("stat 'bin'"));

        let warnings = usage_warnings(
            GeomKind::Rect,
            &Classified::default(),
            &BTreeMap::new(),
            "bin",
            "stack",
        );
        assert!(warnings.is_empty());
    }
}
