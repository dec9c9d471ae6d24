//! Naming conventions for exported artifacts and reserved columns
//!
//! Every name the web client needs to reconstruct (artifact files, layer identifiers,
//! nest entries) is built here so the conventions live in one place.

/// File name of the top-level manifest
pub const MANIFEST_FILE: &str = "plot.json";

/// Column holding the 1-based panel number of each row
pub const PANEL_COLUMN: &str = "PANEL";

/// Column holding the group id of each row
pub const GROUP_COLUMN: &str = "group";

/// Layer parameter overriding chunk planning
pub const CHUNK_VARS_PARAM: &str = "chunk_vars";

/// Extension of tabular artifacts
pub const CHUNK_EXTENSION: &str = "tsv";

/// Classed layer name: `geom<index>_<geom>_<plot>`
///
/// `index` counts layers across the whole visualization, starting at 1.
pub fn classed(index: usize, geom: &str, plot: &str) -> String {
    format!("geom{}_{}_{}", index, geom, plot)
}

/// Artifact name of the `number`-th chunk of a layer (1-based)
pub fn chunk_file(classed: &str, number: usize) -> String {
    format!("{}_chunk{}.{}", classed, number, CHUNK_EXTENSION)
}

/// Artifact name of the common (shared) chunk of a layer
pub fn common_file(classed: &str) -> String {
    format!("{}_chunk_common.{}", classed, CHUNK_EXTENSION)
}

/// Chunk group label: the chunk selector names joined by an underscore
pub fn chunk_group_label(selectors: &[String]) -> String {
    selectors.join("_")
}

/// Nest entry of a `.variable`/`.value` aesthetic pair
pub fn pair_label(variable: &str, value: &str) -> String {
    format!("{} {}", variable, value)
}
