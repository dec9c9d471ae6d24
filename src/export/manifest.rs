//! Manifest written to `plot.json`

use serde::Serialize;
use std::collections::BTreeMap;

use super::partition::Node;
use crate::selector::SelectorDescriptor;
use crate::types::{Mappings, ParameterValue};

/// Export description of one layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerManifest {
    /// Geom the layer is drawn as
    pub geom: String,
    pub classed: String,
    /// Plot the layer belongs to
    pub plot: String,
    /// Aesthetic mapping as declared
    pub aes: Mappings,
    /// Parameters, colours normalised
    pub params: BTreeMap<String, ParameterValue>,
    /// Type tag per exported column
    pub types: BTreeMap<String, String>,
    /// Variables the client selects by, in lookup order
    pub subset_order: Vec<String>,
    /// Keys of the in-file index, in nesting order
    pub nest_order: Vec<String>,
    /// Selectors whose values pick a chunk file
    pub chunk_order: Vec<String>,
    /// Chunk file index
    pub chunks: Node<String>,
    /// Number of chunk files
    pub total: usize,
    pub columns: ColumnSets,
    /// Common artifact, when constant columns were factored out
    #[serde(skip_serializing_if = "Option::is_none")]
    pub common: Option<String>,
    /// Selectors changed by clicking this layer's marks
    pub update_selectors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ColumnSets {
    /// Columns of the common artifact
    pub common: Vec<String>,
    /// Columns of the chunk files
    pub varied: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlotManifest {
    /// Classed names of the plot's exported layers, in drawing order
    pub geoms: Vec<String>,
    pub panels: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeManifest {
    pub variable: String,
    pub ms: u64,
    /// Values the animation steps through
    pub sequence: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Manifest {
    pub plots: BTreeMap<String, PlotManifest>,
    pub geoms: BTreeMap<String, LayerManifest>,
    pub selectors: BTreeMap<String, SelectorDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<TimeManifest>,
}

impl Manifest {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
