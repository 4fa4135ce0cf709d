//! HTTP transport to the summarization/RAG backend.
//!
//! The [`Backend`] trait is the seam between controllers and the network:
//! [`HttpBackend`] is the production implementation over `reqwest`, tests
//! may substitute their own.
//!
//! # Contract
//!
//! - Any non-2xx status fails with [`TransportError::Http`], carrying the
//!   status, the endpoint and the response body (read best-effort).
//! - A 2xx body is returned as parsed JSON without interpretation. An
//!   `error` field inside a 2xx body is the caller's concern.
//! - No retries. No timeout unless `backend.timeout_secs` is configured.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::config::BackendConfig;
use crate::error::{Result, TransportError};
use crate::models::UploadRequest;

/// Backend endpoint paths.
pub mod endpoints {
    pub const SUMMARIZE: &str = "/api/summarize";
    pub const UPLOAD: &str = "/api/upload";
    pub const GENERATE: &str = "/api/generate";
    pub const COLLECTIONS: &str = "/api/debug/collections";
    pub const DELETE_DOCUMENTS: &str = "/api/documents/delete";
    pub const HEALTH: &str = "/healthz";
}

/// Request/response primitives the controllers depend on.
#[async_trait]
pub trait Backend: Send + Sync {
    /// `POST` a JSON body and return the parsed JSON response.
    async fn send_json(&self, endpoint: &str, payload: &Value) -> Result<Value>;

    /// `GET` and return the parsed JSON response.
    async fn get_json(&self, endpoint: &str) -> Result<Value>;

    /// `POST` a multipart form: text fields plus one binary `file` part.
    async fn send_multipart(&self, endpoint: &str, upload: &UploadRequest) -> Result<Value>;
}

/// [`Backend`] over a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// Turn a response into JSON or a transport failure.
    async fn finish(endpoint: &str, response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(endpoint, status = status.as_u16(), "non-success response");
            return Err(TransportError::Http {
                status: status.as_u16(),
                endpoint: endpoint.to_string(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|source| TransportError::Network {
                endpoint: endpoint.to_string(),
                source,
            })?;
        serde_json::from_slice(&bytes).map_err(|e| TransportError::Decode {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })
    }

    fn network(endpoint: &str) -> impl FnOnce(reqwest::Error) -> TransportError + '_ {
        move |source| TransportError::Network {
            endpoint: endpoint.to_string(),
            source,
        }
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn send_json(&self, endpoint: &str, payload: &Value) -> Result<Value> {
        debug!(endpoint, "POST json");
        let response = self
            .client
            .post(self.url(endpoint))
            .json(payload)
            .send()
            .await
            .map_err(Self::network(endpoint))?;
        Self::finish(endpoint, response).await
    }

    async fn get_json(&self, endpoint: &str) -> Result<Value> {
        debug!(endpoint, "GET");
        let response = self
            .client
            .get(self.url(endpoint))
            .send()
            .await
            .map_err(Self::network(endpoint))?;
        Self::finish(endpoint, response).await
    }

    async fn send_multipart(&self, endpoint: &str, upload: &UploadRequest) -> Result<Value> {
        debug!(endpoint, file = %upload.file.name, bytes = upload.file.bytes.len(), "POST multipart");
        let part = Part::bytes(upload.file.bytes.clone())
            .file_name(upload.file.name.clone())
            .mime_str(&upload.file.mime_type)
            .map_err(Self::network(endpoint))?;

        let mut form = Form::new().part("file", part);
        for (name, value) in &upload.fields {
            form = form.text(name.clone(), value.clone());
        }

        let response = self
            .client
            .post(self.url(endpoint))
            .multipart(form)
            .send()
            .await
            .map_err(Self::network(endpoint))?;
        Self::finish(endpoint, response).await
    }
}

/// Reachability check against the health endpoint. `Ok(true)` only when
/// the backend answers 2xx with `{"ok": true}`.
pub async fn ping(backend: &dyn Backend) -> Result<bool> {
    let body = backend.get_json(endpoints::HEALTH).await?;
    Ok(body.get("ok").and_then(Value::as_bool).unwrap_or(false))
}
