//! Rect-like geom pre-processing (tile, raster, histogram, bar)

use polars::prelude::*;

use super::{copy_column, GeomData, GeomKind};
use crate::data::has_column;
use crate::Result;

/// Tiles, rasters, histograms and bars are all exported as rects. Tiles, rasters
/// and histograms get a borderless outline in their fill colour unless a colour
/// was rendered.
pub(super) fn pre_process(kind: GeomKind, mut input: GeomData) -> Result<GeomData> {
    let outlined_by_fill = matches!(
        kind,
        GeomKind::Tile | GeomKind::Raster | GeomKind::Histogram
    );
    if outlined_by_fill && !has_column(&input.data, "colour") && has_column(&input.data, "fill") {
        copy_column(&mut input.data, "fill", "colour")?;
        if !has_column(&input.data, "size") {
            let zeros = vec![0.0f64; input.data.height()];
            input.data.with_column(Series::new("size".into(), zeros))?;
        }
    }
    input.geom = GeomKind::Rect;
    Ok(input)
}
