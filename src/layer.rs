//! Input model: visualizations, plots and layers
//!
//! A [`Visualization`] is everything exported in one run: several plots sharing one
//! set of selectors. Each [`Plot`] carries its panel layout and ranges, and each
//! [`Layer`] carries the rendered row table produced upstream.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::geom::GeomKind;
use crate::types::{Mappings, ParameterValue};
use crate::DataFrame;

/// Axis ranges of one panel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PanelRange {
    /// Horizontal (min, max)
    pub x: (f64, f64),
    /// Vertical (min, max)
    pub y: (f64, f64),
}

impl PanelRange {
    pub fn new(x: (f64, f64), y: (f64, f64)) -> Self {
        Self { x, y }
    }

    /// Range of the axis named by its letter
    pub fn axis(&self, axis: char) -> Option<(f64, f64)> {
        match axis {
            'x' => Some(self.x),
            'y' => Some(self.y),
            _ => None,
        }
    }
}

/// Animation settings: the selector that advances over time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Animation {
    /// Selector (column) name driven by the animation
    pub variable: String,
    /// Milliseconds between frames
    pub ms: u64,
}

/// A single rendered layer
#[derive(Debug, Clone)]
pub struct Layer {
    /// Geom kind of the layer
    pub geom: GeomKind,
    /// Aesthetic mapping as declared (aesthetic -> source column)
    pub mapping: Mappings,
    /// Layer parameters (aesthetic constants, `chunk_vars`, `*_off` variants)
    pub params: BTreeMap<String, ParameterValue>,
    /// Statistical transform tag
    pub stat: String,
    /// Position adjustment tag
    pub position: String,
    /// Selector types declared by this layer, as written by the author
    pub selector_types: BTreeMap<String, String>,
    /// Rendered row table; columns are named by aesthetic
    pub data: DataFrame,
}

impl Layer {
    pub fn new(geom: GeomKind, data: DataFrame) -> Self {
        Self {
            geom,
            mapping: Mappings::new(),
            params: BTreeMap::new(),
            stat: "identity".to_string(),
            position: "identity".to_string(),
            selector_types: BTreeMap::new(),
            data,
        }
    }

    pub fn with_aesthetic(
        mut self,
        aesthetic: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        self.mapping.insert(aesthetic, column);
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn with_stat(mut self, stat: impl Into<String>) -> Self {
        self.stat = stat.into();
        self
    }

    pub fn with_position(mut self, position: impl Into<String>) -> Self {
        self.position = position.into();
        self
    }

    pub fn with_selector_type(
        mut self,
        selector: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        self.selector_types.insert(selector.into(), kind.into());
        self
    }
}

/// One plot: a panel layout and its layers
#[derive(Debug, Clone)]
pub struct Plot {
    pub name: String,
    /// Number of panels (facets)
    pub panels: usize,
    /// Axis ranges, index 0 is panel 1
    pub ranges: Vec<PanelRange>,
    pub layers: Vec<Layer>,
}

impl Plot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            panels: 1,
            ranges: Vec::new(),
            layers: Vec::new(),
        }
    }

    pub fn with_range(mut self, range: PanelRange) -> Self {
        self.ranges.push(range);
        self.panels = self.panels.max(self.ranges.len());
        self
    }

    pub fn with_layer(mut self, layer: Layer) -> Self {
        self.layers.push(layer);
        self
    }
}

/// Everything exported in one run
#[derive(Debug, Clone, Default)]
pub struct Visualization {
    pub plots: Vec<Plot>,
    /// Selector types declared for the whole visualization
    pub selector_types: BTreeMap<String, String>,
    /// Initial selection per selector
    pub first: BTreeMap<String, Vec<String>>,
    /// Transition duration (ms) per selector
    pub duration: BTreeMap<String, f64>,
    pub time: Option<Animation>,
}

impl Visualization {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plot(mut self, plot: Plot) -> Self {
        self.plots.push(plot);
        self
    }

    pub fn with_selector_type(
        mut self,
        selector: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        self.selector_types.insert(selector.into(), kind.into());
        self
    }

    pub fn with_time(mut self, variable: impl Into<String>, ms: u64) -> Self {
        self.time = Some(Animation {
            variable: variable.into(),
            ms,
        });
        self
    }
}
