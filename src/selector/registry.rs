//! Run-wide selector registry
//!
//! The registry is created at the start of an export run, updated by every layer
//! that references a selector, and consumed at the end to produce the selector
//! table the client uses to build its widgets. All updates are merges: flags are
//! OR-ed, chunk groups and layers are set insertions, and observed values are
//! overwritten per layer key, so applying layer updates in any order gives the
//! same result.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use crate::data::compare_keys;
use crate::{AnimintError, Result};

/// How many values of a selector may be selected at once
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectorType {
    #[default]
    Single,
    Multiple,
}

impl FromStr for SelectorType {
    type Err = AnimintError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "single" => Ok(SelectorType::Single),
            "multiple" => Ok(SelectorType::Multiple),
            other => Err(AnimintError::ConfigurationError(format!(
                "Unknown selector type '{}'; expected 'single' or 'multiple'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for SelectorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectorType::Single => write!(f, "single"),
            SelectorType::Multiple => write!(f, "multiple"),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct SelectorState {
    selector_type: Option<SelectorType>,
    drives_click: bool,
    drives_show: bool,
    chunks: BTreeSet<String>,
    layers: BTreeSet<String>,
    /// Observed values keyed by the layer that reported them
    values: BTreeMap<String, Vec<String>>,
}

/// Selector table entry written to the manifest
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectorDescriptor {
    #[serde(rename = "type")]
    pub selector_type: SelectorType,
    /// Some layer changes this selector when clicked
    pub click: bool,
    /// Some layer filters rows on this selector
    pub show: bool,
    /// Chunk groups whose files depend on this selector
    pub chunks: Vec<String>,
    /// Layers referencing this selector
    pub layers: Vec<String>,
    /// Union of observed values, in natural order
    pub levels: Vec<String>,
    /// Initial selection
    pub selected: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct SelectorRegistry {
    selectors: BTreeMap<String, SelectorState>,
    /// Visualization-wide type declarations, applied on first reference
    declared: BTreeMap<String, SelectorType>,
    first: BTreeMap<String, Vec<String>>,
    duration: BTreeMap<String, f64>,
}

impl SelectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with visualization-wide type declarations
    pub fn with_declared_types(types: &BTreeMap<String, String>) -> Result<Self> {
        let declared = types
            .iter()
            .map(|(name, kind)| Ok((name.clone(), kind.parse::<SelectorType>()?)))
            .collect::<Result<BTreeMap<_, _>>>()?;
        Ok(Self {
            declared,
            ..Self::default()
        })
    }

    pub fn with_first(mut self, first: BTreeMap<String, Vec<String>>) -> Self {
        self.first = first;
        self
    }

    pub fn with_duration(mut self, duration: BTreeMap<String, f64>) -> Self {
        self.duration = duration;
        self
    }

    fn known_type(&self, name: &str) -> Option<SelectorType> {
        self.selectors
            .get(name)
            .and_then(|s| s.selector_type)
            .or_else(|| self.declared.get(name).copied())
    }

    /// Check that a reference could be registered without a type conflict
    pub fn check_reference(&self, name: &str, declared: Option<SelectorType>) -> Result<()> {
        match (self.known_type(name), declared) {
            (Some(existing), Some(new)) if existing != new => {
                Err(AnimintError::ConfigurationError(format!(
                    "Selector '{}' has type '{}' and cannot be redeclared as '{}'",
                    name, existing, new
                )))
            }
            _ => Ok(()),
        }
    }

    /// Merge one reference to a selector
    ///
    /// Flags are OR-ed. The type is set on the first declaration and a conflicting
    /// later declaration is a configuration error.
    pub fn register_reference(
        &mut self,
        name: &str,
        is_click: bool,
        is_show: bool,
        declared: Option<SelectorType>,
    ) -> Result<()> {
        self.check_reference(name, declared)?;
        let known = self.known_type(name);
        let state = self.selectors.entry(name.to_string()).or_default();
        state.drives_click |= is_click;
        state.drives_show |= is_show;
        if state.selector_type.is_none() {
            state.selector_type = declared.or(known);
        }
        Ok(())
    }

    /// Record the values a layer observed for a selector, replacing whatever the
    /// same key reported before
    pub fn record_values(&mut self, name: &str, key: &str, values: Vec<String>) {
        self.selectors
            .entry(name.to_string())
            .or_default()
            .values
            .insert(key.to_string(), values);
    }

    pub fn associate_chunk_group(&mut self, name: &str, label: &str) {
        self.selectors
            .entry(name.to_string())
            .or_default()
            .chunks
            .insert(label.to_string());
    }

    pub fn associate_layer(&mut self, name: &str, layer: &str) {
        self.selectors
            .entry(name.to_string())
            .or_default()
            .layers
            .insert(layer.to_string());
    }

    /// Registered type; selectors nobody declared are single-choice
    pub fn selector_type(&self, name: &str) -> SelectorType {
        self.known_type(name).unwrap_or_default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.selectors.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.selectors.keys().map(|k| k.as_str())
    }

    /// Union of observed values in natural order
    pub fn levels(&self, name: &str) -> Vec<String> {
        let Some(state) = self.selectors.get(name) else {
            return Vec::new();
        };
        let mut levels: Vec<String> = state
            .values
            .values()
            .flatten()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        levels.sort_by(|a, b| compare_keys(a, b));
        levels
    }

    pub fn chunk_groups(&self, name: &str) -> Vec<String> {
        self.selectors
            .get(name)
            .map(|s| s.chunks.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Descriptor of one selector
    pub fn descriptor(&self, name: &str) -> Option<SelectorDescriptor> {
        let state = self.selectors.get(name)?;
        let selector_type = self.selector_type(name);
        let levels = self.levels(name);
        let selected = match self.first.get(name) {
            Some(first) => first.clone(),
            None => match selector_type {
                SelectorType::Single => levels.iter().take(1).cloned().collect(),
                SelectorType::Multiple => levels.clone(),
            },
        };
        Some(SelectorDescriptor {
            selector_type,
            click: state.drives_click,
            show: state.drives_show,
            chunks: state.chunks.iter().cloned().collect(),
            layers: state.layers.iter().cloned().collect(),
            levels,
            selected,
            duration: self.duration.get(name).copied(),
        })
    }

    /// Consume the registry into the selector table
    pub fn into_descriptors(self) -> BTreeMap<String, SelectorDescriptor> {
        self.selectors
            .keys()
            .filter_map(|name| Some((name.clone(), self.descriptor(name)?)))
            .collect()
    }
}
