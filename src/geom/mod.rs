//! Geom kinds and their pre-processing hook
//!
//! Some geoms need their rendered data reshaped before the generic export runs:
//! tiles become rects, steps become stair-stepped paths, reference lines get
//! endpoints from the panel ranges, and so on. Every kind exposes the same pure
//! hook, [`GeomKind::pre_process`], which the exporter calls exactly once per layer.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::data::has_column;
use crate::layer::PanelRange;
use crate::types::{Mappings, ParameterValue};
use crate::{AnimintError, Result};

mod point;
mod rect;
mod reference;
mod ribbon;
mod step;
mod text;

/// Geom kinds understood by the exporter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeomKind {
    Point,
    Line,
    Path,
    Polygon,
    Ribbon,
    Area,
    Density,
    Rect,
    Tile,
    Raster,
    Bar,
    Histogram,
    Segment,
    Text,
    Step,
    Freqpoly,
    Abline,
    Hline,
    Vline,
}

impl GeomKind {
    pub const ALL: &'static [GeomKind] = &[
        GeomKind::Point,
        GeomKind::Line,
        GeomKind::Path,
        GeomKind::Polygon,
        GeomKind::Ribbon,
        GeomKind::Area,
        GeomKind::Density,
        GeomKind::Rect,
        GeomKind::Tile,
        GeomKind::Raster,
        GeomKind::Bar,
        GeomKind::Histogram,
        GeomKind::Segment,
        GeomKind::Text,
        GeomKind::Step,
        GeomKind::Freqpoly,
        GeomKind::Abline,
        GeomKind::Hline,
        GeomKind::Vline,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            GeomKind::Point => "point",
            GeomKind::Line => "line",
            GeomKind::Path => "path",
            GeomKind::Polygon => "polygon",
            GeomKind::Ribbon => "ribbon",
            GeomKind::Area => "area",
            GeomKind::Density => "density",
            GeomKind::Rect => "rect",
            GeomKind::Tile => "tile",
            GeomKind::Raster => "raster",
            GeomKind::Bar => "bar",
            GeomKind::Histogram => "histogram",
            GeomKind::Segment => "segment",
            GeomKind::Text => "text",
            GeomKind::Step => "step",
            GeomKind::Freqpoly => "freqpoly",
            GeomKind::Abline => "abline",
            GeomKind::Hline => "hline",
            GeomKind::Vline => "vline",
        }
    }

    /// Geoms drawn as one connected object per group
    pub fn is_data_object(&self) -> bool {
        matches!(
            self,
            GeomKind::Line | GeomKind::Path | GeomKind::Ribbon | GeomKind::Polygon
        )
    }

    /// Geoms whose marks have an area fill, so a zero-size outline is still visible
    pub fn has_area_fill(&self) -> bool {
        matches!(
            self,
            GeomKind::Polygon
                | GeomKind::Ribbon
                | GeomKind::Area
                | GeomKind::Density
                | GeomKind::Rect
                | GeomKind::Tile
                | GeomKind::Raster
                | GeomKind::Bar
                | GeomKind::Histogram
        )
    }

    /// Geoms that can render a fill colour at all (points via filled shapes)
    pub fn renders_fill(&self) -> bool {
        self.has_area_fill() || *self == GeomKind::Point
    }

    /// Reshape a layer's rendered data before export
    ///
    /// Returns the geom the layer is exported as, which may differ from `self`
    /// (e.g. `tile` is exported as `rect`).
    pub fn pre_process(&self, input: GeomData, ranges: &[PanelRange]) -> Result<GeomData> {
        match self {
            GeomKind::Point => point::pre_process(input),
            GeomKind::Text => text::pre_process(input),
            GeomKind::Ribbon | GeomKind::Area | GeomKind::Density => ribbon::pre_process(input),
            GeomKind::Tile | GeomKind::Raster | GeomKind::Histogram | GeomKind::Bar => {
                rect::pre_process(*self, input)
            }
            GeomKind::Step => step::pre_process(input),
            GeomKind::Abline | GeomKind::Hline | GeomKind::Vline => {
                reference::pre_process(*self, input, ranges)
            }
            GeomKind::Freqpoly => Ok(GeomData {
                geom: GeomKind::Line,
                ..input
            }),
            GeomKind::Line
            | GeomKind::Path
            | GeomKind::Polygon
            | GeomKind::Rect
            | GeomKind::Segment => Ok(input),
        }
    }
}

impl FromStr for GeomKind {
    type Err = AnimintError;

    fn from_str(s: &str) -> Result<Self> {
        GeomKind::ALL
            .iter()
            .copied()
            .find(|g| g.name() == s)
            .ok_or_else(|| {
                AnimintError::ConfigurationError(format!(
                    "Unknown geom '{}'. Supported geoms: {}",
                    s,
                    GeomKind::ALL
                        .iter()
                        .map(|g| g.name())
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })
    }
}

impl std::fmt::Display for GeomKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// What a geom's pre-processing hook reads and returns
#[derive(Debug, Clone)]
pub struct GeomData {
    /// Geom the layer is exported as
    pub geom: GeomKind,
    pub mapping: Mappings,
    pub params: BTreeMap<String, ParameterValue>,
    pub data: DataFrame,
}

/// Copy column `from` into a new or replaced column `to`
pub(crate) fn copy_column(data: &mut DataFrame, from: &str, to: &str) -> Result<()> {
    let mut series = data.column(from)?.as_materialized_series().clone();
    series.rename(to.into());
    data.with_column(series)?;
    Ok(())
}

/// Whether an aesthetic is set, either as a data column with some non-missing
/// value or as a non-null parameter
pub(crate) fn is_specified(input: &GeomData, aesthetic: &str) -> Result<bool> {
    let in_data = has_column(&input.data, aesthetic)
        && input.data.column(aesthetic)?.null_count() < input.data.height();
    let in_params = input
        .params
        .get(aesthetic)
        .is_some_and(|v| *v != ParameterValue::Null);
    Ok(in_data || in_params)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(geom: GeomKind, data: DataFrame) -> GeomData {
        GeomData {
            geom,
            mapping: Mappings::new(),
            params: BTreeMap::new(),
            data,
        }
    }

    #[test]
    fn test_geom_names_round_trip() {
        for geom in GeomKind::ALL {
            assert_eq!(geom.name().parse::<GeomKind>().unwrap(), *geom);
        }
        let err = "violin".parse::<GeomKind>().unwrap_err();
        assert!(err.to_string().contains("violin"));
    }

    #[test]
    fn test_data_object_geoms() {
        let objects: Vec<&str> = GeomKind::ALL
            .iter()
            .filter(|g| g.is_data_object())
            .map(|g| g.name())
            .collect();
        assert_eq!(objects, vec!["line", "path", "polygon", "ribbon"]);
    }

    #[test]
    fn test_identity_geoms_are_untouched() {
        let df = df! { "x" => &[1.0, 2.0], "y" => &[3.0, 4.0] }.unwrap();
        let out = GeomKind::Line
            .pre_process(input(GeomKind::Line, df.clone()), &[])
            .unwrap();
        assert_eq!(out.geom, GeomKind::Line);
        assert!(out.data.equals(&df));

        let out = GeomKind::Freqpoly
            .pre_process(input(GeomKind::Freqpoly, df), &[])
            .unwrap();
        assert_eq!(out.geom, GeomKind::Line);
    }

    #[test]
    fn test_is_specified() {
        let df = df! { "fill" => &[None::<&str>, None], "colour" => &["red", "blue"] }.unwrap();
        let mut layer = input(GeomKind::Point, df);
        assert!(!is_specified(&layer, "fill").unwrap());
        assert!(is_specified(&layer, "colour").unwrap());

        layer
            .params
            .insert("fill".to_string(), ParameterValue::String("red".to_string()));
        assert!(is_specified(&layer, "fill").unwrap());
    }
}
