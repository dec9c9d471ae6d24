//! Text geom pre-processing

use polars::prelude::*;

use super::GeomData;
use crate::data::{has_column, numeric_column};
use crate::types::ParameterValue;
use crate::{AnimintError, Result};

/// SVG text-anchor for a horizontal justification
fn anchor_for(hjust: f64) -> Result<&'static str> {
    if hjust == 0.0 {
        Ok("start")
    } else if hjust == 0.5 {
        Ok("middle")
    } else if hjust == 1.0 {
        Ok("end")
    } else {
        Err(AnimintError::ConfigurationError(format!(
            "Text hjust must be 0, 0.5 or 1, found {}",
            hjust
        )))
    }
}

/// Replace `hjust` (in data and params) by the equivalent `anchor`
pub(super) fn pre_process(mut input: GeomData) -> Result<GeomData> {
    if has_column(&input.data, "hjust") {
        let anchors = numeric_column(&input.data, "hjust")?
            .into_iter()
            .map(|h| h.map(anchor_for).transpose())
            .collect::<Result<Vec<Option<&str>>>>()?;
        input.data.with_column(Series::new("anchor".into(), anchors))?;
        input.data = input.data.drop("hjust")?;
    }

    if let Some(hjust) = input.params.remove("hjust") {
        let value = match &hjust {
            ParameterValue::Number(n) => *n,
            ParameterValue::String(s) => s.parse::<f64>().map_err(|_| {
                AnimintError::ConfigurationError(format!(
                    "Text hjust must be numeric, found '{}'",
                    s
                ))
            })?,
            other => {
                return Err(AnimintError::ConfigurationError(format!(
                    "Text hjust must be numeric, found {:?}",
                    other
                )))
            }
        };
        input.params.insert(
            "anchor".to_string(),
            ParameterValue::String(anchor_for(value)?.to_string()),
        );
    }
    Ok(input)
}
