//! Core value types: documents, labeled queries, search parameter sets

use serde::{Deserialize, Serialize};

/// Flat JSON object used for metadata and filters
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// A corpus document to ingest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<JsonMap>,
}

/// A benchmark query with its full relevance judgment set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub id: String,
    pub query: String,
    /// Ids of every relevant document (order irrelevant)
    pub positive_ids: Vec<String>,
    /// Per-query filter, merged with the parameter set's filter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<JsonMap>,
}

/// One search configuration under test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchParam {
    /// Report label; should be unique within a scenario. Blank names are
    /// filled in by the config loader.
    #[serde(default)]
    pub name: String,
    pub k: usize,
    /// Index exploration breadth
    #[serde(default)]
    pub ef: Option<u32>,
    /// Lexical/vector blend weight
    #[serde(default)]
    pub alpha: Option<f64>,
    #[serde(default)]
    pub filter: Option<JsonMap>,
}

impl SearchParam {
    pub fn new(name: impl Into<String>, k: usize) -> Self {
        Self {
            name: name.into(),
            k,
            ef: None,
            alpha: None,
            filter: None,
        }
    }

    pub fn with_ef(mut self, ef: u32) -> Self {
        self.ef = Some(ef);
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = Some(alpha);
        self
    }

    pub fn with_filter(mut self, filter: JsonMap) -> Self {
        self.filter = Some(filter);
        self
    }
}
