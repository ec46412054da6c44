//! Shared helpers for markbook-gs integration tests
//!
//! Provides fake ephemeral-port servers for the two external boundaries
//! (the grading model API and the course directory) plus an event stream
//! wrapper for asserting on broadcast events.

#![allow(dead_code)]

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use markbook_common::events::{EventBus, MarkbookEvent};
use markbook_gs::config::GradingConfig;
use markbook_gs::models::ExamDocument;
use markbook_gs::AppState;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, Mutex};

/// 1x1 transparent PNG, base64-encoded
pub const PNG_B64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

/// Valid PNG exam document for upload tests
pub fn png_document(file_name: &str) -> ExamDocument {
    ExamDocument::new(
        PNG_B64.to_string(),
        "image/png".to_string(),
        Some(file_name.to_string()),
    )
    .expect("test document should pass intake")
}

/// Scripted response for the fake model server
#[derive(Debug, Clone)]
pub enum ModelScript {
    /// 200 with the given text as the single candidate part
    Text(String),
    /// Like `Text`, after holding the response for the given delay
    DelayedText(Duration, String),
    /// Raw status code with a plain body
    Status(u16, String),
    /// 200 with no candidates at all
    Empty,
}

/// Captured generateContent request
#[derive(Debug, Clone)]
pub struct CapturedModelRequest {
    /// Path segment, e.g. "gemini-3-flash-preview:generateContent"
    pub model_call: String,
    /// `key` query parameter
    pub api_key: Option<String>,
    /// Request body as sent
    pub body: Value,
}

type ModelState = (
    Arc<Mutex<VecDeque<ModelScript>>>,
    Arc<Mutex<Vec<CapturedModelRequest>>>,
);

/// Fake generative-model API server on an ephemeral port.
///
/// Responses are scripted in FIFO order; an unscripted call answers with
/// empty candidates so a missing script shows up as model silence, not a
/// test hang.
pub struct FakeModelServer {
    pub base_url: String,
    scripts: Arc<Mutex<VecDeque<ModelScript>>>,
    requests: Arc<Mutex<Vec<CapturedModelRequest>>>,
}

impl FakeModelServer {
    pub async fn start() -> Self {
        let scripts: Arc<Mutex<VecDeque<ModelScript>>> = Arc::new(Mutex::new(VecDeque::new()));
        let requests: Arc<Mutex<Vec<CapturedModelRequest>>> = Arc::new(Mutex::new(Vec::new()));

        let state: ModelState = (scripts.clone(), requests.clone());
        let app = Router::new()
            .route("/v1beta/models/:model_call", post(handle_generate))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake model server");
        let addr = listener.local_addr().expect("fake model server addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake model server");
        });

        Self {
            base_url: format!("http://{}", addr),
            scripts,
            requests,
        }
    }

    /// Queue a 200 text response.
    pub async fn push_text(&self, text: &str) {
        self.scripts
            .lock()
            .await
            .push_back(ModelScript::Text(text.to_string()));
    }

    /// Queue a 200 text response held back for the given delay.
    pub async fn push_delayed_text(&self, delay: Duration, text: &str) {
        self.scripts
            .lock()
            .await
            .push_back(ModelScript::DelayedText(delay, text.to_string()));
    }

    /// Queue an error status response.
    pub async fn push_status(&self, status: u16, body: &str) {
        self.scripts
            .lock()
            .await
            .push_back(ModelScript::Status(status, body.to_string()));
    }

    /// Queue a 200 response with no candidates.
    pub async fn push_empty(&self) {
        self.scripts.lock().await.push_back(ModelScript::Empty);
    }

    pub async fn request_count(&self) -> usize {
        self.requests.lock().await.len()
    }

    pub async fn captured_requests(&self) -> Vec<CapturedModelRequest> {
        self.requests.lock().await.clone()
    }
}

async fn handle_generate(
    State((scripts, requests)): State<ModelState>,
    Path(model_call): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> axum::response::Response {
    requests.lock().await.push(CapturedModelRequest {
        model_call,
        api_key: params.get("key").cloned(),
        body,
    });

    let script = scripts
        .lock()
        .await
        .pop_front()
        .unwrap_or(ModelScript::Empty);

    match script {
        ModelScript::Text(text) => Json(json!({
            "candidates": [{
                "content": { "parts": [{ "text": text }] }
            }]
        }))
        .into_response(),
        ModelScript::DelayedText(delay, text) => {
            tokio::time::sleep(delay).await;
            Json(json!({
                "candidates": [{
                    "content": { "parts": [{ "text": text }] }
                }]
            }))
            .into_response()
        }
        ModelScript::Status(status, body) => (
            StatusCode::from_u16(status).expect("valid scripted status"),
            body,
        )
            .into_response(),
        ModelScript::Empty => Json(json!({ "candidates": [] })).into_response(),
    }
}

/// Captured directory request
#[derive(Debug, Clone)]
pub struct CapturedDirectoryRequest {
    /// Request path, e.g. "/MyCourses"
    pub path: String,
    /// Query string as sent, if any
    pub query: Option<String>,
    /// Selected headers the client is expected to set
    pub headers: HashMap<String, String>,
}

type DirectoryState = (
    Arc<Mutex<VecDeque<(u16, Value)>>>,
    Arc<Mutex<Vec<CapturedDirectoryRequest>>>,
);

/// Fake ORDS-style course directory server on an ephemeral port.
pub struct FakeDirectoryServer {
    pub base_url: String,
    pages: Arc<Mutex<VecDeque<(u16, Value)>>>,
    requests: Arc<Mutex<Vec<CapturedDirectoryRequest>>>,
}

impl FakeDirectoryServer {
    pub async fn start() -> Self {
        let pages: Arc<Mutex<VecDeque<(u16, Value)>>> = Arc::new(Mutex::new(VecDeque::new()));
        let requests: Arc<Mutex<Vec<CapturedDirectoryRequest>>> =
            Arc::new(Mutex::new(Vec::new()));

        let state: DirectoryState = (pages.clone(), requests.clone());
        let app = Router::new()
            .route("/MyCourses", get(handle_directory))
            .route("/StudentCourses", get(handle_directory))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake directory server");
        let addr = listener.local_addr().expect("fake directory server addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake directory server");
        });

        Self {
            base_url: format!("http://{}", addr),
            pages,
            requests,
        }
    }

    /// Queue a 200 page with the given items, final (hasMore false).
    pub async fn push_items(&self, items: Value) {
        self.push_page(200, json!({ "items": items, "hasMore": false, "links": [] }))
            .await;
    }

    /// Queue an arbitrary page response.
    pub async fn push_page(&self, status: u16, body: Value) {
        self.pages.lock().await.push_back((status, body));
    }

    pub async fn captured_requests(&self) -> Vec<CapturedDirectoryRequest> {
        self.requests.lock().await.clone()
    }
}

async fn handle_directory(
    State((pages, requests)): State<DirectoryState>,
    headers: HeaderMap,
    request: axum::extract::Request,
) -> axum::response::Response {
    let mut seen = HashMap::new();
    for name in ["APP_USER", "COURSE_CODE", "content-type"] {
        if let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) {
            seen.insert(name.to_string(), value.to_string());
        }
    }
    requests.lock().await.push(CapturedDirectoryRequest {
        path: request.uri().path().to_string(),
        query: request.uri().query().map(|q| q.to_string()),
        headers: seen,
    });

    let (status, body) = pages
        .lock()
        .await
        .pop_front()
        .unwrap_or((200, json!({ "items": [], "hasMore": false, "links": [] })));

    (
        StatusCode::from_u16(status).expect("valid scripted status"),
        Json(body),
    )
        .into_response()
}

/// Config pointing the grading client at a fake model server.
///
/// Rate limiting is disabled so scripted tests run at full speed.
pub fn test_config(model_base_url: &str) -> GradingConfig {
    GradingConfig {
        api_key: "test-key".to_string(),
        api_base_url: model_base_url.to_string(),
        min_request_interval_ms: 0,
        request_timeout_secs: 5,
        seed_demo_data: false,
        ..GradingConfig::default()
    }
}

/// Full application state wired to a fake model server.
///
/// The roster base URL points at a closed port, so directory lookups
/// degrade to empty results unless a fake directory server is supplied.
pub fn test_state(model_base_url: &str, roster_base_url: Option<&str>) -> AppState {
    let mut config = test_config(model_base_url);
    // Port 9 (discard) is never served in the test environment
    config.roster_base_url = roster_base_url
        .unwrap_or("http://127.0.0.1:9")
        .to_string();

    AppState::new(config, EventBus::new(100)).expect("test state")
}

/// Broadcast event stream wrapper for tests
pub struct EventCollector {
    receiver: broadcast::Receiver<MarkbookEvent>,
}

impl EventCollector {
    pub fn subscribe(event_bus: &EventBus) -> Self {
        Self {
            receiver: event_bus.subscribe(),
        }
    }

    /// Wait for the next event with a timeout.
    pub async fn next_timeout(&mut self, timeout: Duration) -> Option<MarkbookEvent> {
        tokio::time::timeout(timeout, self.receiver.recv())
            .await
            .ok()
            .and_then(|r| r.ok())
    }

    /// Wait for a specific event type, discarding others.
    pub async fn wait_for(&mut self, event_type: &str, timeout: Duration) -> Option<MarkbookEvent> {
        let deadline = Instant::now() + timeout;

        loop {
            if Instant::now() > deadline {
                return None;
            }

            let remaining = deadline.duration_since(Instant::now());
            match self.next_timeout(remaining).await {
                Some(event) if event.event_type() == event_type => return Some(event),
                Some(_) => continue,
                None => return None,
            }
        }
    }

    /// Collect every event type seen until the given type arrives.
    pub async fn types_until(&mut self, last_type: &str, timeout: Duration) -> Vec<String> {
        let mut seen = Vec::new();
        let deadline = Instant::now() + timeout;

        while Instant::now() <= deadline {
            let remaining = deadline.duration_since(Instant::now());
            match self.next_timeout(remaining).await {
                Some(event) => {
                    let event_type = event.event_type().to_string();
                    let done = event_type == last_type;
                    seen.push(event_type);
                    if done {
                        break;
                    }
                }
                None => break,
            }
        }

        seen
    }
}
