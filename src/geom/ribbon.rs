//! Ribbon geom pre-processing (also area and density)

use super::{copy_column, GeomData, GeomKind};
use crate::data::has_column;
use crate::Result;

/// Areas and densities are exported as ribbons. A ribbon with a fill but no
/// colour gets an outline matching its fill.
pub(super) fn pre_process(mut input: GeomData) -> Result<GeomData> {
    if has_column(&input.data, "fill") && !has_column(&input.data, "colour") {
        copy_column(&mut input.data, "fill", "colour")?;
    }
    input.geom = GeomKind::Ribbon;
    Ok(input)
}
