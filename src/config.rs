//! JSON export configuration
//!
//! A configuration file describes a whole visualization: its plots, their
//! layers (each pointing at a CSV of rendered rows) and the visualization-wide
//! selector settings.
//!
//! ```json
//! {
//!   "plots": {
//!     "scatter": {
//!       "ranges": [{ "x": [0, 100], "y": [0, 10] }],
//!       "layers": [{
//!         "geom": "point",
//!         "aes": { "x": "gdp", "y": "life", "showSelected": "year" },
//!         "params": { "colour": "grey50" },
//!         "data": "scatter.csv"
//!       }]
//!     }
//!   },
//!   "selector_types": { "country": "multiple" },
//!   "time": { "variable": "year", "ms": 2000 },
//!   "options": { "parallel": true }
//! }
//! ```
//!
//! Plots are exported in name order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::data::read_csv;
use crate::export::ExportOptions;
use crate::geom::GeomKind;
use crate::layer::{Animation, Layer, PanelRange, Plot, Visualization};
use crate::types::{Mappings, ParameterValue};
use crate::{AnimintError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    pub plots: BTreeMap<String, PlotConfig>,

    /// Selector types declared for the whole visualization
    #[serde(default)]
    pub selector_types: BTreeMap<String, String>,

    /// Initial selection per selector
    #[serde(default)]
    pub first: BTreeMap<String, Vec<String>>,

    /// Transition duration (ms) per selector
    #[serde(default)]
    pub duration: BTreeMap<String, f64>,

    #[serde(default)]
    pub time: Option<Animation>,

    #[serde(default)]
    pub options: ExportOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotConfig {
    /// Number of panels; defaults to the number of ranges (at least 1)
    #[serde(default)]
    pub panels: Option<usize>,

    #[serde(default)]
    pub ranges: Vec<PanelRange>,

    pub layers: Vec<LayerConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    pub geom: GeomKind,

    #[serde(default)]
    pub aes: Mappings,

    #[serde(default)]
    pub params: BTreeMap<String, ParameterValue>,

    #[serde(default = "default_identity")]
    pub stat: String,

    #[serde(default = "default_identity")]
    pub position: String,

    /// CSV file of rendered rows, relative to the configuration file
    pub data: PathBuf,

    #[serde(default)]
    pub selector_types: BTreeMap<String, String>,
}

fn default_identity() -> String {
    "identity".to_string()
}

impl ExportConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            AnimintError::ConfigurationError(format!("Invalid export configuration: {}", e))
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|e| {
            AnimintError::ReaderError(format!("Failed to read '{}': {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    /// Build the visualization, reading every layer's CSV relative to `base_dir`
    pub fn into_visualization(self, base_dir: &Path) -> Result<Visualization> {
        let mut visualization = Visualization {
            selector_types: self.selector_types,
            first: self.first,
            duration: self.duration,
            time: self.time,
            ..Visualization::default()
        };

        for (name, plot) in self.plots {
            let panels = plot.panels.unwrap_or(plot.ranges.len()).max(1);
            let layers = plot
                .layers
                .into_iter()
                .map(|layer| layer.into_layer(base_dir))
                .collect::<Result<Vec<_>>>()?;
            visualization.plots.push(Plot {
                name,
                panels,
                ranges: plot.ranges,
                layers,
            });
        }
        Ok(visualization)
    }
}

impl LayerConfig {
    fn into_layer(self, base_dir: &Path) -> Result<Layer> {
        let data = read_csv(&base_dir.join(&self.data))?;
        Ok(Layer {
            geom: self.geom,
            mapping: self.aes,
            params: self.params,
            stat: self.stat,
            position: self.position,
            selector_types: self.selector_types,
            data,
        })
    }
}
