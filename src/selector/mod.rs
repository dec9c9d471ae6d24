//! Selectors: named pieces of client-side interactive state
//!
//! - `classify`: splits a layer's aesthetics into clickSelects/showSelected groups
//! - `registry`: run-wide accumulator of selector metadata

pub mod classify;
pub mod registry;

pub use classify::{classify, Classified, SelectorGroup, SeveralSelector, SingleSelector};
pub use registry::{SelectorDescriptor, SelectorRegistry, SelectorType};
