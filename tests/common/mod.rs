//! Shared fixtures: in-memory dataset, scripted gateway, blocking stub HTTP server

#![allow(dead_code)]

use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::sync::Arc;

use musubi_eval::gateway::IngestionStatus;
use musubi_eval::models::JsonMap;
use musubi_eval::{DatasetReader, Document, GatewayError, Query, SearchGateway, SearchRequest};

// =============================================================================
// Dataset
// =============================================================================

/// Reader that ignores paths and hands back fixed rows
pub struct InMemoryReader {
    pub documents: Vec<Document>,
    pub queries: Vec<Query>,
}

impl DatasetReader for InMemoryReader {
    fn load_documents(&self, _path: &Path) -> anyhow::Result<Vec<Document>> {
        Ok(self.documents.clone())
    }

    fn load_queries(&self, _path: &Path) -> anyhow::Result<Vec<Query>> {
        Ok(self.queries.clone())
    }
}

pub fn object(value: Value) -> JsonMap {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {}", other),
    }
}

pub fn document(id: &str, text: &str) -> Document {
    Document {
        id: id.to_string(),
        text: text.to_string(),
        metadata: None,
    }
}

pub fn query(id: &str, text: &str, positives: &[&str], filter: Option<Value>) -> Query {
    Query {
        id: id.to_string(),
        query: text.to_string(),
        positive_ids: positives.iter().map(|s| s.to_string()).collect(),
        filter: filter.map(object),
    }
}

/// Two documents, two queries that each match exactly one of them
pub fn two_doc_dataset() -> InMemoryReader {
    InMemoryReader {
        documents: vec![
            document("d1", "rust ownership and borrowing"),
            document("d2", "sourdough bread recipe"),
        ],
        queries: vec![
            query("q1", "how does borrowing work", &["d1"], Some(json!({"category": "tech"}))),
            query("q2", "how to bake bread", &["d2"], Some(json!({"category": "food"}))),
        ],
    }
}

pub const TWO_DOC_SCENARIO: &str = r#"
base_url: http://musubi.test
datasets:
  documents: unused/documents.jsonl
  queries: unused/queries.jsonl
search:
  params:
    - name: narrow
      k: 1
    - name: wide
      k: 5
      ef: 64
      alpha: 0.5
      filter: {lang: en}
"#;

// =============================================================================
// Scripted gateway
// =============================================================================

/// In-process gateway with scripted ingestion and search behavior
pub struct FakeGateway {
    /// Query text -> ranked ids
    results: HashMap<String, Vec<String>>,
    start_response: Value,
    /// Popped per poll; the last state repeats
    ingestion_states: Mutex<VecDeque<Value>>,
    /// Searches that fail with 503 before the first success
    failing_searches: Mutex<u32>,
    /// Every search fails when set
    search_always_fails: bool,
    /// 0-based positions in the search call sequence that fail
    failing_search_positions: Vec<usize>,
    calls: Mutex<Vec<String>>,
    searches: Mutex<Vec<SearchRequest>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            results: HashMap::new(),
            start_response: json!({"id": "job-1"}),
            ingestion_states: Mutex::new(VecDeque::from([json!({"state": "ready"})])),
            failing_searches: Mutex::new(0),
            search_always_fails: false,
            failing_search_positions: Vec::new(),
            calls: Mutex::new(Vec::new()),
            searches: Mutex::new(Vec::new()),
        }
    }

    /// Gateway that returns each document id for the matching query of [`two_doc_dataset`]
    pub fn echoing_two_docs() -> Self {
        Self::new()
            .with_results("how does borrowing work", &["d1"])
            .with_results("how to bake bread", &["d2"])
    }

    pub fn with_results(mut self, text: &str, ids: &[&str]) -> Self {
        self.results
            .insert(text.to_string(), ids.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_start_response(mut self, response: Value) -> Self {
        self.start_response = response;
        self
    }

    pub fn with_ingestion_states(self, states: Vec<Value>) -> Self {
        *self.ingestion_states.lock() = states.into();
        self
    }

    pub fn with_failing_searches(self, n: u32) -> Self {
        *self.failing_searches.lock() = n;
        self
    }

    pub fn with_search_always_failing(mut self) -> Self {
        self.search_always_fails = true;
        self
    }

    /// Fail only the search calls at these positions (0 is the first search)
    pub fn with_failing_search_positions(mut self, positions: &[usize]) -> Self {
        self.failing_search_positions = positions.to_vec();
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.as_str() == name).count()
    }

    pub fn searches(&self) -> Vec<SearchRequest> {
        self.searches.lock().clone()
    }

    fn record(&self, call: &str) {
        self.calls.lock().push(call.to_string());
    }
}

impl SearchGateway for FakeGateway {
    fn health(&self) -> Result<Value, GatewayError> {
        self.record("health");
        Ok(json!({"status": "ok"}))
    }

    fn documents_batch(&self, documents: &[Document]) -> Result<Value, GatewayError> {
        self.record("documents_batch");
        Ok(json!({"accepted": documents.len()}))
    }

    fn ingestion_start(&self) -> Result<Value, GatewayError> {
        self.record("ingestion_start");
        Ok(self.start_response.clone())
    }

    fn ingestion_get(&self, _job_id: &str) -> Result<IngestionStatus, GatewayError> {
        self.record("ingestion_get");
        let mut states = self.ingestion_states.lock();
        let state = if states.len() > 1 {
            states.pop_front().unwrap_or_default()
        } else {
            states.front().cloned().unwrap_or_default()
        };
        Ok(IngestionStatus(state))
    }

    fn search(&self, request: &SearchRequest) -> Result<Vec<String>, GatewayError> {
        self.record("search");
        let position = {
            let mut searches = self.searches.lock();
            searches.push(request.clone());
            searches.len() - 1
        };

        let mut failing = self.failing_searches.lock();
        if self.search_always_fails
            || *failing > 0
            || self.failing_search_positions.contains(&position)
        {
            *failing = failing.saturating_sub(1);
            return Err(GatewayError::Server {
                status: 503,
                body: "index warming up".to_string(),
            });
        }
        Ok(self.results.get(&request.text).cloned().unwrap_or_default())
    }
}

// =============================================================================
// Stub HTTP server
// =============================================================================

/// A request as seen by the stub server
#[derive(Debug, Clone)]
pub struct StubRequest {
    pub method: String,
    pub path: String,
    pub body: Vec<u8>,
}

impl StubRequest {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }
}

pub struct StubResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl StubResponse {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.to_string(),
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/plain",
            body: body.to_string(),
        }
    }
}

type Handler = dyn Fn(&StubRequest, usize) -> StubResponse + Send + Sync;

/// Blocking HTTP/1.1 server on an ephemeral port, one request per connection
///
/// The handler receives each request plus how many earlier requests hit the
/// same method and path, which makes "fail twice, then succeed" easy to script.
pub struct StubServer {
    address: String,
    requests: Arc<Mutex<Vec<StubRequest>>>,
}

impl StubServer {
    pub fn start<F>(handler: F) -> Self
    where
        F: Fn(&StubRequest, usize) -> StubResponse + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub server");
        let address = format!("http://{}", listener.local_addr().expect("local addr"));
        let requests: Arc<Mutex<Vec<StubRequest>>> = Arc::new(Mutex::new(Vec::new()));
        let handler: Arc<Handler> = Arc::new(handler);

        let seen = Arc::clone(&requests);
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                let Some(request) = read_request(&mut stream) else {
                    continue;
                };
                let prior = {
                    let mut seen = seen.lock();
                    let prior = seen
                        .iter()
                        .filter(|r| r.method == request.method && r.path == request.path)
                        .count();
                    seen.push(request.clone());
                    prior
                };
                let response = handler(&request, prior);
                write_response(&mut stream, &response);
            }
        });

        Self { address, requests }
    }

    pub fn url(&self) -> &str {
        &self.address
    }

    pub fn requests(&self) -> Vec<StubRequest> {
        self.requests.lock().clone()
    }

    pub fn count(&self, method: &str, path: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }
}

fn read_request(stream: &mut TcpStream) -> Option<StubRequest> {
    let mut header_buf = Vec::with_capacity(1024);
    let mut byte = [0u8; 1];
    while !header_buf.ends_with(b"\r\n\r\n") {
        match stream.read(&mut byte) {
            Ok(0) | Err(_) => return None,
            Ok(_) => header_buf.push(byte[0]),
        }
    }

    let mut headers = [httparse::EMPTY_HEADER; 64];
    let mut req = httparse::Request::new(&mut headers);
    match req.parse(&header_buf) {
        Ok(httparse::Status::Complete(_)) => {}
        _ => return None,
    }

    let content_length = req
        .headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case("Content-Length"))
        .and_then(|h| std::str::from_utf8(h.value).ok())
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = vec![0u8; content_length];
    stream.read_exact(&mut body).ok()?;

    Some(StubRequest {
        method: req.method.unwrap_or("").to_string(),
        path: req.path.unwrap_or("/").to_string(),
        body,
    })
}

fn write_response(stream: &mut TcpStream, response: &StubResponse) {
    let head = format!(
        "HTTP/1.1 {} Stub\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        response.status,
        response.content_type,
        response.body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(response.body.as_bytes());
    let _ = stream.flush();
}
