//! Reference lines (abline, hline, vline) become segments spanning their panel

use polars::prelude::*;

use super::{GeomData, GeomKind};
use crate::data::{numeric_column, panel_ids};
use crate::layer::PanelRange;
use crate::{AnimintError, Result};

fn panel_range(ranges: &[PanelRange], panel: usize) -> Result<&PanelRange> {
    panel
        .checked_sub(1)
        .and_then(|i| ranges.get(i))
        .ok_or_else(|| {
            AnimintError::DataError(format!(
                "Reference line in panel {} needs that panel's axis ranges",
                panel
            ))
        })
}

type Segment = (Option<f64>, Option<f64>, Option<f64>, Option<f64>);

fn segments(kind: GeomKind, data: &DataFrame, ranges: &[PanelRange]) -> Result<Vec<Segment>> {
    let panels = panel_ids(data)?;
    match kind {
        GeomKind::Abline => {
            let slope = numeric_column(data, "slope")?;
            let intercept = numeric_column(data, "intercept")?;
            panels
                .iter()
                .zip(slope.iter().zip(intercept.iter()))
                .map(|(&panel, (&slope, &intercept))| {
                    let (x0, x1) = panel_range(ranges, panel)?.x;
                    let line = |x: f64| match (slope, intercept) {
                        (Some(m), Some(b)) => Some(m * x + b),
                        _ => None,
                    };
                    Ok((Some(x0), line(x0), Some(x1), line(x1)))
                })
                .collect()
        }
        GeomKind::Hline => {
            let y = numeric_column(data, "yintercept")?;
            panels
                .iter()
                .zip(y.iter())
                .map(|(&panel, &y)| {
                    let (x0, x1) = panel_range(ranges, panel)?.x;
                    Ok((Some(x0), y, Some(x1), y))
                })
                .collect()
        }
        GeomKind::Vline => {
            let x = numeric_column(data, "xintercept")?;
            panels
                .iter()
                .zip(x.iter())
                .map(|(&panel, &x)| {
                    let (y0, y1) = panel_range(ranges, panel)?.y;
                    Ok((x, Some(y0), x, Some(y1)))
                })
                .collect()
        }
        other => Err(AnimintError::InternalError(format!(
            "'{}' is not a reference line geom",
            other
        ))),
    }
}

pub(super) fn pre_process(
    kind: GeomKind,
    mut input: GeomData,
    ranges: &[PanelRange],
) -> Result<GeomData> {
    let segments = segments(kind, &input.data, ranges)?;
    let consumed: &[&str] = match kind {
        GeomKind::Abline => &["slope", "intercept"],
        GeomKind::Hline => &["yintercept"],
        _ => &["xintercept"],
    };

    let mut data = input.data.drop_many(consumed.iter().copied());
    let columns: [(&str, Vec<Option<f64>>); 4] = [
        ("x", segments.iter().map(|s| s.0).collect()),
        ("y", segments.iter().map(|s| s.1).collect()),
        ("xend", segments.iter().map(|s| s.2).collect()),
        ("yend", segments.iter().map(|s| s.3).collect()),
    ];
    for (name, values) in columns {
        data.with_column(Series::new(name.into(), values))?;
    }

    input.data = data;
    input.geom = GeomKind::Segment;
    Ok(input)
}
