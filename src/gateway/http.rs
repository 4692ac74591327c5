//! Blocking HTTP client for the musubi backend

use anyhow::{Context, Result};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::{IngestionStatus, SearchGateway, SearchRequest, SearchResponse};
use crate::clock::{Clock, SystemClock};
use crate::error::GatewayError;
use crate::models::Document;
use crate::retry::RetryPolicy;

/// Error bodies are truncated to this many characters
const BODY_PREVIEW_CHARS: usize = 300;

/// musubi HTTP client
pub struct MusubiHttpClient {
    base_url: String,
    http: HttpClient,
    retry: RetryPolicy,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl MusubiHttpClient {
    /// Create a client for the given address (host:port or full URL)
    pub fn new(address: &str, timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        Self::with_clock(address, timeout, retry, Arc::new(SystemClock::new()))
    }

    /// Same as [`new`](Self::new) with an explicit clock for backoff sleeps
    pub fn with_clock(
        address: &str,
        timeout: Duration,
        retry: RetryPolicy,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: normalize_base_url(address),
            http,
            retry,
            clock,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Value, GatewayError> {
        let url = format!("{}{}", self.base_url, path);
        let label = format!("{} {}", method, path);
        self.retry.run(self.clock.as_ref(), &label, |attempt| {
            debug!(%label, attempt, "sending request");
            self.send_once(method.clone(), &url, body)
        })
    }

    fn send_once<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<Value, GatewayError> {
        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().map_err(|e| transport(url, &e))?;
        let status = response.status();

        if status.is_client_error() {
            let body = response.text().unwrap_or_default();
            return Err(GatewayError::Client {
                status: status.as_u16(),
                body: preview(&body),
            });
        }
        if status.is_server_error() {
            let body = response.text().unwrap_or_default();
            return Err(GatewayError::Server {
                status: status.as_u16(),
                body: preview(&body),
            });
        }

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("application/json"))
            .unwrap_or(false);
        let text = response.text().map_err(|e| transport(url, &e))?;

        if is_json {
            serde_json::from_str(&text).map_err(|e| GatewayError::InvalidResponse {
                url: url.to_string(),
                message: format!("malformed JSON body: {}", e),
            })
        } else {
            Ok(json!({ "text": text }))
        }
    }
}

impl SearchGateway for MusubiHttpClient {
    fn health(&self) -> Result<Value, GatewayError> {
        self.request::<Value>(Method::GET, "/health", None)
    }

    fn documents_batch(&self, documents: &[Document]) -> Result<Value, GatewayError> {
        let body = json!({ "documents": documents });
        self.request(Method::POST, "/documents/batch", Some(&body))
    }

    fn ingestion_start(&self) -> Result<Value, GatewayError> {
        self.request::<Value>(Method::POST, "/ingestion/jobs", None)
    }

    fn ingestion_get(&self, job_id: &str) -> Result<IngestionStatus, GatewayError> {
        let path = format!("/ingestion/jobs/{}", job_id);
        self.request::<Value>(Method::GET, &path, None)
            .map(IngestionStatus)
    }

    fn search(&self, request: &SearchRequest) -> Result<Vec<String>, GatewayError> {
        let body = self.request(Method::POST, "/search", Some(request))?;
        let parsed =
            SearchResponse::from_value(body).map_err(|e| GatewayError::InvalidResponse {
                url: format!("{}/search", self.base_url),
                message: format!("unrecognized search response shape: {}", e),
            })?;
        Ok(parsed.into_ids())
    }
}

fn normalize_base_url(address: &str) -> String {
    let address = address.trim_end_matches('/');
    if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    }
}

fn transport(url: &str, err: &reqwest::Error) -> GatewayError {
    GatewayError::Transport {
        url: url.to_string(),
        message: err.to_string(),
    }
}

fn preview(body: &str) -> String {
    body.trim().chars().take(BODY_PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_url_normalization() {
        let retry = RetryPolicy::default();
        let timeout = Duration::from_secs(1);

        let client = MusubiHttpClient::new("localhost:8080", timeout, retry).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");

        let client = MusubiHttpClient::new("http://localhost:8080/", timeout, retry).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");

        let client = MusubiHttpClient::new("https://musubi.internal", timeout, retry).unwrap();
        assert_eq!(client.base_url(), "https://musubi.internal");
    }

    #[test]
    fn test_preview_truncates() {
        let long = "x".repeat(1000);
        assert_eq!(preview(&long).len(), BODY_PREVIEW_CHARS);
        assert_eq!(preview("  short \n"), "short");
    }
}
