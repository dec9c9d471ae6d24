//! Recursive partitioning of a layer's rows
//!
//! Rows are first split by the chunk columns, one artifact per observed
//! combination, and then indexed inside each artifact by the nest entries. Both
//! levels are [`Node`] trees keyed by the row values.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::data::{column_keys, compare_keys, take_rows};
use crate::naming::{self, pair_label};
use crate::{DataFrame, Result};

/// Tree keyed by partition values
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Node<T> {
    Branch(BTreeMap<String, Node<T>>),
    Leaf(T),
}

impl<T> Node<T> {
    /// Follow a path of keys from this node
    pub fn get(&self, path: &[&str]) -> Option<&Node<T>> {
        match path.split_first() {
            None => Some(self),
            Some((key, rest)) => match self {
                Node::Branch(children) => children.get(*key)?.get(rest),
                Node::Leaf(_) => None,
            },
        }
    }

    /// Leaf values in key order
    pub fn leaves(&self) -> Vec<&T> {
        match self {
            Node::Leaf(value) => vec![value],
            Node::Branch(children) => children.values().flat_map(|c| c.leaves()).collect(),
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            Node::Leaf(_) => 0,
            Node::Branch(children) => 1 + children.values().map(|c| c.depth()).max().unwrap_or(0),
        }
    }
}

/// One level of the nest index
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NestKey {
    /// Keyed by the values of one column
    Column(String),
    /// Keyed by `"<variable> <value>"` of a `.variable`/`.value` pair
    Pair { variable: String, value: String },
}

impl NestKey {
    /// Entry written to `nest_order`
    pub fn label(&self) -> String {
        match self {
            NestKey::Column(name) => name.clone(),
            NestKey::Pair { variable, value } => pair_label(variable, value),
        }
    }

    /// Data columns this level reads
    pub fn columns(&self) -> Vec<String> {
        match self {
            NestKey::Column(name) => vec![name.clone()],
            NestKey::Pair { variable, value } => vec![variable.clone(), value.clone()],
        }
    }

    fn keys(&self, data: &DataFrame) -> Result<Vec<Option<String>>> {
        match self {
            NestKey::Column(name) => column_keys(data, name),
            NestKey::Pair { variable, value } => {
                let variables = column_keys(data, variable)?;
                let values = column_keys(data, value)?;
                Ok(variables
                    .into_iter()
                    .zip(values)
                    .map(|(var, val)| Some(pair_label(&var?, &val?)))
                    .collect())
            }
        }
    }
}

/// One chunk artifact
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Artifact name
    pub name: String,
    /// Chunk column values selecting this chunk
    pub key: Vec<String>,
    /// Rows of the chunk, ordered by the nest index
    pub data: DataFrame,
    /// Nest index over row positions in `data`
    pub nest: Node<Vec<usize>>,
}

/// A layer split into chunks
#[derive(Debug, Clone)]
pub struct Partition {
    /// Chunk index: chunk column values down to artifact names
    pub index: Node<String>,
    pub chunks: Vec<Chunk>,
}

impl Partition {
    pub fn total(&self) -> usize {
        self.chunks.len()
    }
}

/// Split `data` into chunk artifacts of layer `classed`
///
/// Rows with a missing chunk or nest value are dropped. Chunks are numbered from
/// 1 in the natural order of their keys and groups without rows are omitted.
pub fn partition(
    data: &DataFrame,
    classed: &str,
    chunk_columns: &[String],
    nest: &[NestKey],
) -> Result<Partition> {
    let chunk_levels = chunk_columns
        .iter()
        .map(|c| column_keys(data, c))
        .collect::<Result<Vec<_>>>()?;
    let nest_levels = nest
        .iter()
        .map(|key| key.keys(data))
        .collect::<Result<Vec<_>>>()?;

    let mut chunks = Vec::new();
    let all_rows: Vec<usize> = (0..data.height()).collect();
    let index = build(&chunk_levels, all_rows, &mut Vec::new(), &mut |key, rows| {
        let Some((ordered, nest)) = nest_rows(&nest_levels, rows) else {
            return Ok(None);
        };
        let name = naming::chunk_file(classed, chunks.len() + 1);
        chunks.push(Chunk {
            name: name.clone(),
            key: key.to_vec(),
            data: take_rows(data, &ordered)?,
            nest,
        });
        Ok(Some(name))
    })?;

    Ok(Partition {
        index: index.unwrap_or_else(|| Node::Branch(BTreeMap::new())),
        chunks,
    })
}

/// Index `rows` by the nest levels
///
/// Returns the rows in leaf order together with a tree over their positions in
/// that order, or `None` when no row has a complete key.
pub fn nest_rows(
    levels: &[Vec<Option<String>>],
    rows: Vec<usize>,
) -> Option<(Vec<usize>, Node<Vec<usize>>)> {
    let mut ordered = Vec::new();
    let tree = build(levels, rows, &mut Vec::new(), &mut |_, rows| {
        let start = ordered.len();
        ordered.extend_from_slice(&rows);
        Ok(Some((start..ordered.len()).collect()))
    })
    .ok()??;
    Some((ordered, tree))
}

/// Recursively group `rows` by `levels`, calling `leaf` on each complete group
/// in natural key order
fn build<T>(
    levels: &[Vec<Option<String>>],
    rows: Vec<usize>,
    path: &mut Vec<String>,
    leaf: &mut impl FnMut(&[String], Vec<usize>) -> Result<Option<T>>,
) -> Result<Option<Node<T>>> {
    let Some((level, rest)) = levels.split_first() else {
        if rows.is_empty() {
            return Ok(None);
        }
        return Ok(leaf(path, rows)?.map(Node::Leaf));
    };

    let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for row in rows {
        let Some(key) = level[row].as_deref() else {
            continue;
        };
        match index.get(key) {
            Some(&g) => groups[g].1.push(row),
            None => {
                index.insert(key, groups.len());
                groups.push((key.to_string(), vec![row]));
            }
        }
    }
    groups.sort_by(|(a, _), (b, _)| compare_keys(a, b));

    let mut children = BTreeMap::new();
    for (key, rows) in groups {
        path.push(key.clone());
        let child = build(rest, rows, path, leaf)?;
        path.pop();
        if let Some(child) = child {
            children.insert(key, child);
        }
    }
    Ok((!children.is_empty()).then_some(Node::Branch(children)))
}
