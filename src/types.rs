//! Value types shared by layers, configuration and manifests
//!
//! - `Mappings`: ordered aesthetic -> column mapping
//! - `ParameterValue`: layer parameter values (`size = 2`, `chunk_vars = ["year"]`)
//! - `ArrayElement`: elements of array-valued parameters

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Ordered mapping from aesthetic name to source column name
///
/// Order is significant: showSelected variables are planned in the order they were
/// declared, so this keeps insertion order instead of sorting keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mappings {
    entries: Vec<(String, String)>,
}

impl Mappings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an aesthetic, keeping the original position on replace
    pub fn insert(&mut self, aesthetic: impl Into<String>, column: impl Into<String>) {
        let aesthetic = aesthetic.into();
        let column = column.into();
        match self.entries.iter_mut().find(|(a, _)| *a == aesthetic) {
            Some(entry) => entry.1 = column,
            None => self.entries.push((aesthetic, column)),
        }
    }

    pub fn get(&self, aesthetic: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(a, _)| a == aesthetic)
            .map(|(_, c)| c.as_str())
    }

    pub fn contains(&self, aesthetic: &str) -> bool {
        self.get(aesthetic).is_some()
    }

    pub fn remove(&mut self, aesthetic: &str) -> Option<String> {
        let pos = self.entries.iter().position(|(a, _)| a == aesthetic)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(a, c)| (a.as_str(), c.as_str()))
    }

    pub fn aesthetics(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(a, _)| a.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<A: Into<String>, C: Into<String>> FromIterator<(A, C)> for Mappings {
    fn from_iter<I: IntoIterator<Item = (A, C)>>(iter: I) -> Self {
        let mut mappings = Mappings::new();
        for (aesthetic, column) in iter {
            mappings.insert(aesthetic, column);
        }
        mappings
    }
}

impl Serialize for Mappings {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (aesthetic, column) in &self.entries {
            map.serialize_entry(aesthetic, column)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Mappings {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct MappingsVisitor;

        impl<'de> Visitor<'de> for MappingsVisitor {
            type Value = Mappings;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "an object mapping aesthetic names to column names")
            }

            fn visit_map<M: MapAccess<'de>>(
                self,
                mut access: M,
            ) -> std::result::Result<Mappings, M::Error> {
                let mut mappings = Mappings::new();
                while let Some((aesthetic, column)) = access.next_entry::<String, String>()? {
                    mappings.insert(aesthetic, column);
                }
                Ok(mappings)
            }
        }

        deserializer.deserialize_map(MappingsVisitor)
    }
}

/// Element of an array-valued parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArrayElement {
    Boolean(bool),
    Number(f64),
    String(String),
    Null,
}

impl ArrayElement {
    /// String form used for comparisons and map keys
    pub fn to_key_string(&self) -> String {
        match self {
            ArrayElement::Boolean(b) => b.to_string(),
            ArrayElement::Number(n) => crate::data::format_number(*n),
            ArrayElement::String(s) => s.clone(),
            ArrayElement::Null => "NA".to_string(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArrayElement::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Layer parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Boolean(bool),
    Number(f64),
    String(String),
    Array(Vec<ArrayElement>),
    Null,
}

impl ParameterValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParameterValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            ParameterValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::String(value.to_string())
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        ParameterValue::Number(value)
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        ParameterValue::Boolean(value)
    }
}
