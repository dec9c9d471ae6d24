/*!
# animint - interactive layer export compiler

Compiles the rendered row data of grammar-of-graphics layers into a partitioned,
selector-indexed export that a web client can fetch selectively.

## Pipeline

For every layer of every plot:

- **Classify** aesthetics into `clickSelects` / `showSelected` selectors
- **Register** selectors in a run-wide [`SelectorRegistry`]
- **Plan** which showSelected variables become separate chunk files
- **Clamp** coordinates to the panel ranges and **split** groups at missing values
- **Factor** constant columns into a common file
- **Partition** rows into chunk files, each indexed by the nest variables

The result is a set of TSV artifacts plus a `plot.json` [`Manifest`].

## Example

```rust,ignore
use animint::{Exporter, ExportOptions, MemoryWriter, Visualization};

let writer = MemoryWriter::new();
let exporter = Exporter::new(ExportOptions::default(), &writer);
let report = exporter.export(&visualization)?;
assert!(report.failures.is_empty());
```
*/

pub mod config;
pub mod data;
pub mod export;
pub mod geom;
pub mod layer;
pub mod naming;
pub mod selector;
pub mod types;
pub mod writer;

pub use export::manifest::{LayerManifest, Manifest};
pub use export::partition::{NestKey, Node};
pub use export::{ExportOptions, ExportReport, ExportWarning, Exporter, LayerFailure};
pub use geom::GeomKind;
pub use layer::{Animation, Layer, PanelRange, Plot, Visualization};
pub use selector::{SelectorRegistry, SelectorType};
pub use types::{ArrayElement, Mappings, ParameterValue};
pub use writer::{ArtifactWriter, DirectoryWriter, MemoryWriter};

// DataFrame abstraction (wraps Polars)
pub use polars::prelude::DataFrame;

/// Main library error type
#[derive(thiserror::Error, Debug)]
pub enum AnimintError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Data source error: {0}")]
    ReaderError(String),

    #[error("Output generation error: {0}")]
    WriterError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Layer '{classed}': {source}")]
    Layer {
        classed: String,
        #[source]
        source: Box<AnimintError>,
    },

    #[error("Data processing error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),
}

impl AnimintError {
    /// Attach the classed name of the layer being exported
    pub fn in_layer(self, classed: &str) -> Self {
        match self {
            AnimintError::Layer { .. } => self,
            other => AnimintError::Layer {
                classed: classed.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// The error without layer context
    pub fn root(&self) -> &AnimintError {
        match self {
            AnimintError::Layer { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, AnimintError>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
