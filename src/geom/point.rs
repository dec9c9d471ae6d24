//! Point geom pre-processing

use super::{copy_column, is_specified, GeomData};
use crate::data::has_column;
use crate::Result;

/// Points are drawn as filled circles: without an explicit fill, the fill follows
/// the colour so the mark does not render hollow.
pub(super) fn pre_process(mut input: GeomData) -> Result<GeomData> {
    if !is_specified(&input, "fill")? && has_column(&input.data, "colour") {
        copy_column(&mut input.data, "colour", "fill")?;
    }
    Ok(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::GeomKind;
    use crate::types::{Mappings, ParameterValue};
    use polars::prelude::*;
    use std::collections::BTreeMap;

    fn input(data: DataFrame) -> GeomData {
        GeomData {
            geom: GeomKind::Point,
            mapping: Mappings::new(),
            params: BTreeMap::new(),
            data,
        }
    }

    #[test]
    fn test_fill_follows_colour() {
        let df = df! { "x" => &[1.0, 2.0], "colour" => &["#ff0000", "#0000ff"] }.unwrap();
        let out = pre_process(input(df)).unwrap();
        let fill: Vec<Option<&str>> = out
            .data
            .column("fill")
            .unwrap()
            .as_materialized_series()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(fill, vec![Some("#ff0000"), Some("#0000ff")]);
    }

    #[test]
    fn test_explicit_fill_is_kept() {
        let df = df! { "x" => &[1.0], "colour" => &["#ff0000"] }.unwrap();
        let mut layer = input(df);
        layer
            .params
            .insert("fill".to_string(), ParameterValue::String("#ffffff".to_string()));
        let out = pre_process(layer).unwrap();
        assert!(!has_column(&out.data, "fill"));
    }
}
