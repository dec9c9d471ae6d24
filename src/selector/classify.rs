//! Aesthetic classification
//!
//! Interactive aesthetics follow a naming scheme:
//!
//! - `clickSelects`, `clickSelects2`, ... - clicking a mark selects the row's value
//! - `showSelected`, `showSelected2`, ... - the row is shown only when its value is selected
//! - `clickSelects.variable` + `clickSelects.value` (optionally numbered) - the
//!   `.variable` column names the selector per row and the `.value` column holds
//!   the value, so one column can drive many selectors.

use regex::Regex;
use std::sync::OnceLock;

use crate::types::Mappings;
use crate::{AnimintError, Result};

/// A selector bound by name: `showSelected = year`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleSelector {
    /// Aesthetic (and data column) name, e.g. `showSelected2`
    pub aesthetic: String,
    /// Selector name: the mapped source column, e.g. `year`
    pub selector: String,
}

/// A `.variable`/`.value` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeveralSelector {
    /// Aesthetic whose values name the selectors, e.g. `clickSelects.variable`
    pub variable: String,
    /// Aesthetic whose values are bound to those selectors
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorGroup {
    pub one: Vec<SingleSelector>,
    pub several: Vec<SeveralSelector>,
}

impl SelectorGroup {
    pub fn is_empty(&self) -> bool {
        self.one.is_empty() && self.several.is_empty()
    }
}

/// Result of classifying a layer's aesthetics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classified {
    pub click_selects: SelectorGroup,
    pub show_selected: SelectorGroup,
    /// Non-interactive aesthetics, in declaration order
    pub plain: Vec<String>,
}

impl Classified {
    /// Whether the layer uses any interactive aesthetic
    pub fn is_interactive(&self) -> bool {
        !self.click_selects.is_empty() || !self.show_selected.is_empty()
    }
}

fn selector_aes_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(clickSelects|showSelected)([1-9][0-9]*)?(?:\.(variable|value))?$")
            .expect("selector aesthetic pattern is valid")
    })
}

/// Classify a layer's aesthetic mapping
///
/// Fails with a configuration error for unrecognised `clickSelects*`/`showSelected*`
/// names and for a `.variable` without its `.value` (or vice versa).
pub fn classify(mapping: &Mappings) -> Result<Classified> {
    let pattern = selector_aes_pattern();
    let mut classified = Classified::default();
    // (prefix, suffix) -> (variable aesthetic, value aesthetic)
    let mut pairs: Vec<((String, String), Option<String>, Option<String>)> = Vec::new();

    for (aesthetic, column) in mapping.iter() {
        if !aesthetic.starts_with("clickSelects") && !aesthetic.starts_with("showSelected") {
            classified.plain.push(aesthetic.to_string());
            continue;
        }
        let caps = pattern.captures(aesthetic).ok_or_else(|| {
            AnimintError::ConfigurationError(format!(
                "Unrecognised interactive aesthetic '{}'; use clickSelects, showSelected, \
                 an integer suffix (e.g. showSelected2) or a .variable/.value pair",
                aesthetic
            ))
        })?;
        let prefix = caps[1].to_string();
        let suffix = caps.get(2).map_or("", |m| m.as_str()).to_string();

        match caps.get(3).map(|m| m.as_str()) {
            None => {
                let selector = SingleSelector {
                    aesthetic: aesthetic.to_string(),
                    selector: column.to_string(),
                };
                group_mut(&mut classified, &prefix).one.push(selector);
            }
            Some(half) => {
                let key = (prefix, suffix);
                let pos = match pairs.iter().position(|(k, _, _)| *k == key) {
                    Some(pos) => pos,
                    None => {
                        pairs.push((key, None, None));
                        pairs.len() - 1
                    }
                };
                if half == "variable" {
                    pairs[pos].1 = Some(aesthetic.to_string());
                } else {
                    pairs[pos].2 = Some(aesthetic.to_string());
                }
            }
        }
    }

    for ((prefix, suffix), variable, value) in pairs {
        match (variable, value) {
            (Some(variable), Some(value)) => {
                group_mut(&mut classified, &prefix)
                    .several
                    .push(SeveralSelector { variable, value });
            }
            (Some(present), None) | (None, Some(present)) => {
                let missing = if present.ends_with(".variable") {
                    format!("{}{}.value", prefix, suffix)
                } else {
                    format!("{}{}.variable", prefix, suffix)
                };
                return Err(AnimintError::ConfigurationError(format!(
                    "'{}' requires a matching '{}' aesthetic",
                    present, missing
                )));
            }
            (None, None) => {}
        }
    }

    Ok(classified)
}

fn group_mut<'a>(classified: &'a mut Classified, prefix: &str) -> &'a mut SelectorGroup {
    if prefix == "clickSelects" {
        &mut classified.click_selects
    } else {
        &mut classified.show_selected
    }
}
