//! Error taxonomy for the evaluation pipeline
//!
//! `GatewayError` covers a single backend call and knows whether it is worth
//! retrying. `EvalError` covers orchestration failures that abort a scenario run
//! or a tuning trial. Both travel inside `anyhow::Error` at the library boundary;
//! callers recover the kind with `downcast_ref`.

use std::time::Duration;

/// Failure of one call to the search backend
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Connection refused, DNS failure, request timeout, broken body read.
    #[error("transport error calling {url}: {message}")]
    Transport { url: String, message: String },

    /// 5xx response.
    #[error("server error: {status}{}", body_suffix(.body))]
    Server { status: u16, body: String },

    /// 4xx response. Never retried.
    #[error("client error: {status}{}", body_suffix(.body))]
    Client { status: u16, body: String },

    /// The response arrived but its shape is unusable.
    #[error("invalid response from {url}: {message}")]
    InvalidResponse { url: String, message: String },
}

fn body_suffix(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(" body={}", body)
    }
}

impl GatewayError {
    /// Transport and 5xx failures are transient; everything else is fatal
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayError::Transport { .. } | GatewayError::Server { .. }
        )
    }

    /// HTTP status code, if the failure carried one
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Server { status, .. } | GatewayError::Client { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

/// Fatal orchestration failure
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    /// Ingestion job reached a failed/error state. Carries the status payload.
    #[error("ingestion job failed: {status}")]
    IngestionFailed { status: serde_json::Value },

    /// Ingestion job still not terminal when the timeout expired.
    #[error("ingestion job timed out after {:.1}s", .timeout.as_secs_f64())]
    IngestionTimeout { timeout: Duration },

    /// Search kept failing during warm-up after ingestion completed.
    #[error("search backend is not ready after {:.1}s of warm-up retries", .waited.as_secs_f64())]
    SearchNotReady {
        waited: Duration,
        #[source]
        source: GatewayError,
    },

    /// The ingestion-start response had neither a usable `id` nor `job_id`.
    #[error("cannot determine ingestion job id: {response}")]
    MissingJobId { response: serde_json::Value },

    /// The optimizer finished without a single completed trial.
    #[error("study finished without any completed trial")]
    NoCompletedTrials,
}
