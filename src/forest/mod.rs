//! Tree ensembles.

mod soa;

pub use soa::{ForestError, SoAForest};
