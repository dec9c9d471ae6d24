//! Artifact writers
//!
//! The exporter produces named byte blobs (TSV chunks and the `plot.json`
//! manifest). Where they end up is decided by an [`ArtifactWriter`]:
//!
//! - [`DirectoryWriter`] - one file per artifact under an output directory
//! - [`MemoryWriter`] - keeps artifacts in memory, for tests and dry runs
//!
//! # Example
//!
//! ```rust,ignore
//! use animint::writer::{ArtifactWriter, DirectoryWriter};
//!
//! let writer = DirectoryWriter::new("out")?;
//! writer.write_artifact("plot.json", b"{}")?;
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::{AnimintError, Result};

/// Destination for exported artifacts
///
/// Writers are shared between layer workers, so implementations must be
/// thread-safe. Writes of different artifacts have no ordering.
pub trait ArtifactWriter: Send + Sync {
    /// Store one artifact
    ///
    /// # Arguments
    ///
    /// * `name` - Artifact name, e.g. `geom1_point_scatter_chunk1.tsv`
    /// * `bytes` - Full artifact content; replaces any earlier artifact of that name
    ///
    /// # Errors
    ///
    /// Returns `AnimintError::WriterError` if the artifact cannot be stored.
    fn write_artifact(&self, name: &str, bytes: &[u8]) -> Result<()>;
}

/// Writes every artifact as a file in one directory
#[derive(Debug, Clone)]
pub struct DirectoryWriter {
    dir: PathBuf,
}

impl DirectoryWriter {
    /// Create the writer, creating `dir` if it does not exist
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| {
            AnimintError::WriterError(format!(
                "Failed to create output directory '{}': {}",
                dir.display(),
                e
            ))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ArtifactWriter for DirectoryWriter {
    fn write_artifact(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.dir.join(name);
        fs::write(&path, bytes).map_err(|e| {
            AnimintError::WriterError(format!("Failed to write '{}': {}", path.display(), e))
        })
    }
}

/// Keeps artifacts in memory
#[derive(Debug, Default)]
pub struct MemoryWriter {
    artifacts: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Content of one artifact
    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.artifacts
            .lock()
            .ok()
            .and_then(|artifacts| artifacts.get(name).cloned())
    }

    /// Content of one artifact as text
    pub fn get_string(&self, name: &str) -> Option<String> {
        self.get(name)
            .and_then(|bytes| String::from_utf8(bytes).ok())
    }

    /// Names of all stored artifacts, sorted
    pub fn names(&self) -> Vec<String> {
        self.artifacts
            .lock()
            .map(|artifacts| artifacts.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Take every stored artifact out of the writer
    pub fn into_artifacts(self) -> BTreeMap<String, Vec<u8>> {
        self.artifacts
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ArtifactWriter for MemoryWriter {
    fn write_artifact(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let mut artifacts = self.artifacts.lock().map_err(|_| {
            AnimintError::InternalError("Artifact store lock was poisoned".to_string())
        })?;
        artifacts.insert(name.to_string(), bytes.to_vec());
        Ok(())
    }
}
