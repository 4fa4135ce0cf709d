//! In-process mock of the summarization/RAG backend.
//!
//! Binds an axum server to `127.0.0.1:0`, records every request, and
//! answers each endpoint from a per-path FIFO of scripted replies. An
//! endpoint with nothing scripted answers `200 {}`.

#![allow(dead_code)]

use axum::body::Bytes;
use axum::extract::{Multipart, State};
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

impl Reply {
    pub fn json(body: Value) -> Self {
        Self {
            status: 200,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Debug, Clone)]
pub struct UploadPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl UploadPart {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).to_string()
    }
}

#[derive(Debug, Clone)]
pub enum Recorded {
    Json { path: String, body: Value },
    Get { path: String },
    Multipart { path: String, parts: Vec<UploadPart> },
}

impl Recorded {
    pub fn path(&self) -> &str {
        match self {
            Recorded::Json { path, .. }
            | Recorded::Get { path }
            | Recorded::Multipart { path, .. } => path,
        }
    }
}

#[derive(Default)]
struct Inner {
    replies: HashMap<String, VecDeque<Reply>>,
    log: Vec<Recorded>,
}

type Shared = Arc<Mutex<Inner>>;

pub struct MockBackend {
    pub base_url: String,
    inner: Shared,
}

impl MockBackend {
    pub async fn start() -> Self {
        let inner: Shared = Arc::new(Mutex::new(Inner::default()));
        let app = Router::new()
            .route("/api/summarize", post(record_json))
            .route("/api/generate", post(record_json))
            .route("/api/documents/delete", post(record_json))
            .route("/api/upload", post(record_upload))
            .route("/api/debug/collections", get(record_get))
            .route("/healthz", get(record_get))
            .with_state(inner.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            inner,
        }
    }

    /// Queue a reply for `path`.
    pub fn script(&self, path: &str, reply: Reply) {
        self.inner
            .lock()
            .unwrap()
            .replies
            .entry(path.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.inner.lock().unwrap().log.clone()
    }

    pub fn count(&self, path: &str) -> usize {
        self.requests().iter().filter(|r| r.path() == path).count()
    }

    /// JSON bodies received on `path`, in arrival order.
    pub fn json_bodies(&self, path: &str) -> Vec<Value> {
        self.requests()
            .into_iter()
            .filter_map(|r| match r {
                Recorded::Json { path: p, body } if p == path => Some(body),
                _ => None,
            })
            .collect()
    }

    /// Wait until `path` has received at least `n` requests.
    pub async fn wait_for(&self, path: &str, n: usize) {
        for _ in 0..200 {
            if self.count(path) >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("mock backend never saw {} request(s) on {}", n, path);
    }
}

fn take_reply(inner: &Shared, recorded: Recorded) -> Reply {
    let mut guard = inner.lock().unwrap();
    let path = recorded.path().to_string();
    guard.log.push(recorded);
    guard
        .replies
        .get_mut(&path)
        .and_then(|q| q.pop_front())
        .unwrap_or_else(|| Reply::json(serde_json::json!({})))
}

async fn respond(reply: Reply) -> Response {
    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }
    let status = StatusCode::from_u16(reply.status).unwrap();
    (status, [(header::CONTENT_TYPE, "application/json")], reply.body).into_response()
}

async fn record_json(State(inner): State<Shared>, uri: Uri, body: Bytes) -> Response {
    let body = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let reply = take_reply(
        &inner,
        Recorded::Json {
            path: uri.path().to_string(),
            body,
        },
    );
    respond(reply).await
}

async fn record_get(State(inner): State<Shared>, uri: Uri) -> Response {
    let reply = take_reply(
        &inner,
        Recorded::Get {
            path: uri.path().to_string(),
        },
    );
    respond(reply).await
}

async fn record_upload(State(inner): State<Shared>, uri: Uri, mut multipart: Multipart) -> Response {
    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.unwrap().to_vec();
        parts.push(UploadPart {
            name,
            file_name,
            content_type,
            data,
        });
    }
    let reply = take_reply(
        &inner,
        Recorded::Multipart {
            path: uri.path().to_string(),
            parts,
        },
    );
    respond(reply).await
}
