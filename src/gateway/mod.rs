//! Search gateway - the network boundary to the musubi backend
//!
//! This module defines the seam the runner talks through:
//! - **SearchGateway**: health, batch upload, ingestion start/status, search
//! - **MusubiHttpClient**: blocking HTTP implementation with retry/backoff
//! - **SearchResponse**: normalization of the backend's result-list shapes
//!
//! # Usage
//!
//! ```ignore
//! use musubi_eval::gateway::{MusubiHttpClient, SearchGateway, SearchRequest};
//!
//! let client = MusubiHttpClient::new("localhost:8080", timeout, retry)?;
//! client.health()?;
//! let ids = client.search(&SearchRequest::new("what is rust", 10))?;
//! ```

mod http;
mod response;

use serde::Serialize;
use serde_json::Value;

use crate::error::{EvalError, GatewayError};
use crate::models::{Document, JsonMap};

pub use http::MusubiHttpClient;
pub use response::SearchResponse;

/// Operations the evaluation pipeline needs from a retrieval backend
///
/// Implementations apply their own retry policy and surface only the final outcome.
pub trait SearchGateway {
    /// Liveness check
    fn health(&self) -> Result<Value, GatewayError>;

    /// Upload the whole corpus in one call (all-or-nothing)
    fn documents_batch(&self, documents: &[Document]) -> Result<Value, GatewayError>;

    /// Begin an asynchronous ingestion job; see [`extract_job_id`]
    fn ingestion_start(&self) -> Result<Value, GatewayError>;

    /// Current status of an ingestion job
    fn ingestion_get(&self, job_id: &str) -> Result<IngestionStatus, GatewayError>;

    /// Run one query, returning result ids in rank order
    fn search(&self, request: &SearchRequest) -> Result<Vec<String>, GatewayError>;
}

/// Search payload as sent to the backend
///
/// Optional fields are omitted from the JSON entirely when absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    pub text: String,
    pub k: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ef: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<JsonMap>,
}

impl SearchRequest {
    pub fn new(text: impl Into<String>, k: usize) -> Self {
        Self {
            text: text.into(),
            k,
            ef: None,
            alpha: None,
            filter: None,
        }
    }
}

/// Ingestion job status payload
#[derive(Debug, Clone, PartialEq)]
pub struct IngestionStatus(pub Value);

impl IngestionStatus {
    /// Lowercased `state` (or `status`) field; empty when neither is a non-empty string
    pub fn state(&self) -> String {
        ["state", "status"]
            .iter()
            .filter_map(|key| self.0.get(key).and_then(Value::as_str))
            .find(|s| !s.is_empty())
            .unwrap_or("")
            .to_lowercase()
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

/// Job id from an ingestion-start response (`id`, else `job_id`)
///
/// A non-empty string is used as-is. A numeric id, including `0`, is accepted
/// and stringified. Fails fast with [`EvalError::MissingJobId`] when neither key
/// holds one of those.
pub fn extract_job_id(response: &Value) -> Result<String, EvalError> {
    for key in ["id", "job_id"] {
        match response.get(key) {
            Some(Value::String(s)) if !s.is_empty() => return Ok(s.clone()),
            Some(Value::Number(n)) => return Ok(n.to_string()),
            _ => {}
        }
    }
    Err(EvalError::MissingJobId {
        response: response.clone(),
    })
}
