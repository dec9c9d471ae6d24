//! Chunk planning
//!
//! Decides which showSelected variables get their own chunk files (chunk
//! variables) and which stay as an in-memory index inside each file (nest
//! variables). Splitting on a variable saves the client from downloading rows it
//! will not show, but every file costs a request, so a variable is only used for
//! chunking when every resulting file is big enough.

use tracing::debug;

use crate::data::{bytes_per_row, group_rows};
use crate::selector::{Classified, SelectorRegistry, SelectorType};
use crate::types::ParameterValue;
use crate::{AnimintError, DataFrame, Result};

/// Smallest estimated size (bytes) of a chunk file worth a separate request
pub const MIN_CHUNK_BYTES: f64 = 4096.0;

/// A showSelected variable that may become a chunk or nest variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Aesthetic and data column, e.g. `showSelected2`
    pub aesthetic: String,
    /// Selector name, e.g. `year`
    pub selector: String,
}

/// Outcome of chunk planning
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkPlan {
    pub chunk: Vec<Candidate>,
    pub nest: Vec<Candidate>,
}

impl ChunkPlan {
    /// Data columns whose values select a chunk file
    pub fn chunk_columns(&self) -> Vec<String> {
        self.chunk.iter().map(|c| c.aesthetic.clone()).collect()
    }

    /// Data columns indexed inside each chunk file
    pub fn nest_columns(&self) -> Vec<String> {
        self.nest.iter().map(|c| c.aesthetic.clone()).collect()
    }

    /// Selector names whose values select a chunk file
    pub fn chunk_order(&self) -> Vec<String> {
        self.chunk.iter().map(|c| c.selector.clone()).collect()
    }

    fn nothing_chunked(candidates: &[Candidate]) -> Self {
        Self {
            chunk: Vec::new(),
            nest: candidates.to_vec(),
        }
    }
}

/// showSelected variables of a layer, in declaration order
///
/// The animation variable, when the layer shows it, comes first.
pub fn subset_vec(classified: &Classified, time: Option<&str>) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = classified
        .show_selected
        .one
        .iter()
        .map(|s| Candidate {
            aesthetic: s.aesthetic.clone(),
            selector: s.selector.clone(),
        })
        .collect();
    if let Some(time) = time {
        if let Some(pos) = candidates.iter().position(|c| c.selector == time) {
            let animated = candidates.remove(pos);
            candidates.insert(0, animated);
        }
    }
    candidates
}

/// Split candidates into chunk and nest variables
///
/// An explicit `chunk_vars` parameter (a selector name or array of selector
/// names) overrides the size heuristic. It may only name single-choice selectors.
pub fn plan_chunks(
    candidates: &[Candidate],
    chunk_vars: Option<&ParameterValue>,
    data: &DataFrame,
    registry: &SelectorRegistry,
    min_chunk_bytes: f64,
) -> Result<ChunkPlan> {
    if let Some(requested) = chunk_vars {
        return explicit_plan(candidates, requested, registry);
    }
    if registry.is_empty() || candidates.is_empty() {
        return Ok(ChunkPlan::nothing_chunked(candidates));
    }

    let mut eligible: Vec<String> = candidates
        .iter()
        .filter(|c| registry.selector_type(&c.selector) == SelectorType::Single)
        .map(|c| c.aesthetic.clone())
        .collect();
    let bytes = bytes_per_row(data)?;

    while !eligible.is_empty() {
        if !too_small_cells(data, &eligible, bytes, min_chunk_bytes)? {
            break;
        }
        let dropped = eligible.remove(column_to_drop(data, &eligible)?);
        debug!("Chunks too small, nesting '{}' instead", dropped);
    }

    let chunk: Vec<Candidate> = candidates
        .iter()
        .filter(|c| eligible.contains(&c.aesthetic))
        .cloned()
        .collect();
    let nest = candidates
        .iter()
        .filter(|c| !eligible.contains(&c.aesthetic))
        .cloned()
        .collect();
    Ok(ChunkPlan { chunk, nest })
}

fn explicit_plan(
    candidates: &[Candidate],
    requested: &ParameterValue,
    registry: &SelectorRegistry,
) -> Result<ChunkPlan> {
    let names: Vec<&str> = match requested {
        ParameterValue::String(name) => vec![name.as_str()],
        ParameterValue::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str().ok_or_else(|| {
                    AnimintError::ConfigurationError(format!(
                        "chunk_vars must contain selector names, found {}",
                        item.to_key_string()
                    ))
                })
            })
            .collect::<Result<_>>()?,
        other => {
            return Err(AnimintError::ConfigurationError(format!(
                "chunk_vars must be a selector name or an array of selector names, found {:?}",
                other
            )))
        }
    };

    for name in &names {
        if !candidates.iter().any(|c| c.selector == *name) {
            let possible: Vec<&str> = candidates.iter().map(|c| c.selector.as_str()).collect();
            return Err(AnimintError::ConfigurationError(format!(
                "chunk_vars entry '{}' is not a showSelected variable of this layer. \
                 Possible: [{}]",
                name,
                possible.join(", ")
            )));
        }
        if registry.selector_type(name) == SelectorType::Multiple {
            return Err(AnimintError::ConfigurationError(format!(
                "chunk_vars entry '{}' is a multiple selector; only single selectors \
                 can select a chunk file",
                name
            )));
        }
    }

    let (chunk, nest): (Vec<_>, Vec<_>) = candidates
        .iter()
        .cloned()
        .partition(|c| names.contains(&c.selector.as_str()));
    Ok(ChunkPlan { chunk, nest })
}

/// Whether some observed combination of `columns` would produce a chunk file of
/// at most `min_chunk_bytes`
///
/// A frame with no complete combination counts as too small.
pub fn too_small_cells(
    data: &DataFrame,
    columns: &[String],
    bytes_per_row: f64,
    min_chunk_bytes: f64,
) -> Result<bool> {
    let cells = group_rows(data, columns)?;
    Ok(cells.is_empty()
        || cells
            .iter()
            .any(|(_, rows)| rows.len() as f64 * bytes_per_row <= min_chunk_bytes))
}

/// Position of the column whose smallest single-column cell is smallest
///
/// Ties go to the earliest column.
pub fn column_to_drop(data: &DataFrame, columns: &[String]) -> Result<usize> {
    let mut best: Option<(usize, usize)> = None;
    for (pos, column) in columns.iter().enumerate() {
        let smallest = group_rows(data, std::slice::from_ref(column))?
            .iter()
            .map(|(_, rows)| rows.len())
            .min()
            .unwrap_or(0);
        if best.map_or(true, |(_, size)| smallest < size) {
            best = Some((pos, smallest));
        }
    }
    Ok(best.map_or(0, |(pos, _)| pos))
}
