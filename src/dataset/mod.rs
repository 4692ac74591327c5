//! Labeled datasets - documents and queries with ground truth
//!
//! Public interface:
//! - `DatasetReader` - loading seam injected into the runner and tuner
//! - `JsonlDatasetReader` - one JSON object per line
//! - `validate_dataset()` - full consistency report for a dataset pair
//!
//! Follows dependable-rust: row parsing is internal

mod internal;

use anyhow::Result;
use std::path::Path;

use crate::models::{Document, Query};

pub use internal::{DatasetStats, DatasetValidation, FieldStats};

/// Source of documents and queries for a scenario
pub trait DatasetReader {
    fn load_documents(&self, path: &Path) -> Result<Vec<Document>>;
    fn load_queries(&self, path: &Path) -> Result<Vec<Query>>;
}

/// JSON-Lines reader; blank lines are skipped
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonlDatasetReader;

impl DatasetReader for JsonlDatasetReader {
    fn load_documents(&self, path: &Path) -> Result<Vec<Document>> {
        internal::load_documents(path)
    }

    fn load_queries(&self, path: &Path) -> Result<Vec<Query>> {
        internal::load_queries(path)
    }
}

/// Check a documents/queries pair for missing keys, duplicate ids and dangling positives
///
/// Unlike the reader this collects every problem instead of stopping at the first.
pub fn validate_dataset(documents: &Path, queries: &Path) -> Result<DatasetValidation> {
    internal::validate(documents, queries)
}
