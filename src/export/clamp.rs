//! Clamp position columns to their panel's axis range
//!
//! Infinite positions (e.g. reference lines spanning the whole panel) would
//! otherwise be unplottable; clamping keeps the row and pins it to the edge.

use polars::prelude::*;

use crate::data::{column_names, is_numeric_dtype, numeric_column, panel_ids};
use crate::layer::PanelRange;
use crate::{DataFrame, Result};

/// Clamp every numeric column whose name starts with `x` or `y`
///
/// The panel of each row comes from the `PANEL` column (panel 1 when absent).
/// Missing values stay missing and panels without a range are left alone.
pub fn clamp_to_ranges(mut data: DataFrame, ranges: &[PanelRange]) -> Result<DataFrame> {
    if ranges.is_empty() {
        return Ok(data);
    }
    let panels = panel_ids(&data)?;

    for name in column_names(&data) {
        let Some(axis) = name.chars().next().filter(|c| *c == 'x' || *c == 'y') else {
            continue;
        };
        if !is_numeric_dtype(data.column(&name)?.dtype()) {
            continue;
        }

        let values = numeric_column(&data, &name)?;
        let mut changed = false;
        let clamped: Vec<Option<f64>> = values
            .iter()
            .zip(&panels)
            .map(|(value, panel)| {
                let range = panel.checked_sub(1).and_then(|i| ranges.get(i));
                match (value, range.and_then(|r| r.axis(axis))) {
                    (Some(v), Some((min, max))) if !v.is_nan() && (*v < min || *v > max) => {
                        changed = true;
                        Some(v.clamp(min, max))
                    }
                    _ => *value,
                }
            })
            .collect();

        if changed {
            data.with_column(Series::new(name.as_str().into(), clamped))?;
        }
    }
    Ok(data)
}
