//! Wire and domain types shared by the controllers.
//!
//! Request bodies mirror the backend's JSON contract exactly (field names,
//! omission vs. `null`). Response types are lenient: every optional field
//! defaults so a partial body still deserializes.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;

// ============ Generation parameters ============

/// Summary granularity as a percentage in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Detail(u8);

impl Detail {
    pub const MIN: u8 = 0;
    pub const MAX: u8 = 100;

    /// Clamp any integer into range.
    pub fn new(value: i64) -> Self {
        Self(value.clamp(Self::MIN as i64, Self::MAX as i64) as u8)
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Detail {
    fn default() -> Self {
        Self(40)
    }
}

impl fmt::Display for Detail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sampling temperature in `[0.0, 1.0]`, on a 0.05 grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Temperature(f64);

impl Temperature {
    pub const STEP: f64 = 0.05;

    /// Clamp into `[0, 1]` and snap to the nearest step. Non-finite input
    /// becomes `0.0`.
    pub fn new(value: f64) -> Self {
        if !value.is_finite() {
            return Self(0.0);
        }
        let steps = (value.clamp(0.0, 1.0) / Self::STEP).round();
        Self(steps / 20.0)
    }

    /// Default for summarization requests.
    pub fn summarize_default() -> Self {
        Self(0.2)
    }

    /// Default for RAG generation requests.
    pub fn generate_default() -> Self {
        Self(0.6)
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Both knobs of a summarization request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub detail: Detail,
    pub temperature: Temperature,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            detail: Detail::default(),
            temperature: Temperature::summarize_default(),
        }
    }
}

// ============ Input selection ============

/// File accepted for upload, held in memory until submission.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl StagedFile {
    /// Stage in-memory content. Only PDF and plain text are accepted.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let name = name.into();
        let mime_type = match mime_for(&name) {
            Some(m) => m,
            None => bail!(
                "Unsupported file type: '{}'. Upload a .pdf or .txt file.",
                name
            ),
        };
        Ok(Self {
            name,
            mime_type: mime_type.to_string(),
            bytes,
        })
    }

    /// Read and stage a file from disk.
    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("Invalid file name: {}", path.display()))?
            .to_string();
        // Check the type before reading potentially large content.
        if mime_for(&name).is_none() {
            bail!(
                "Unsupported file type: '{}'. Upload a .pdf or .txt file.",
                name
            );
        }
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        Self::from_bytes(name, bytes)
    }
}

fn mime_for(name: &str) -> Option<&'static str> {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())?;
    match ext.as_str() {
        "pdf" => Some("application/pdf"),
        "txt" => Some("text/plain"),
        _ => None,
    }
}

/// The source a request was built from.
#[derive(Debug, Clone, PartialEq)]
pub enum InputSelection {
    Url(String),
    Text(String),
    File(StagedFile),
}

impl InputSelection {
    pub fn kind(&self) -> &'static str {
        match self {
            InputSelection::Url(_) => "url",
            InputSelection::Text(_) => "text",
            InputSelection::File(_) => "file",
        }
    }
}

// ============ Requests ============

/// Body of `POST /api/summarize`. Absent sources are omitted, never `""`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummarizeRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub detail: Detail,
    pub temperature: Temperature,
}

/// Multipart body of `POST /api/upload`.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRequest {
    /// Text fields in send order (`detail`, `temperature`).
    pub fields: Vec<(String, String)>,
    pub file: StagedFile,
}

/// Body of `POST /api/generate`. `system_prompt` is sent as `null` when unset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateRequest {
    pub message: String,
    pub system_prompt: Option<String>,
    pub temperature: Temperature,
}

/// Body of `POST /api/documents/delete`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeleteRequest {
    pub collection: String,
    pub source: String,
}

// ============ Responses ============

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SummaryStats {
    #[serde(default)]
    pub chunks_total: Option<u64>,
    #[serde(default)]
    pub chunks_used: Option<u64>,
}

/// Successful summarize/upload envelope.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SummaryResult {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub chunks_used: Option<Vec<i64>>,
    #[serde(default)]
    pub stats: Option<SummaryStats>,
}

/// A retrieved passage reference returned alongside a generated answer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SourceMatch {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub meta: Option<Value>,
}

impl SourceMatch {
    /// The `source` metadata entry, if the backend recorded one.
    pub fn source(&self) -> Option<&str> {
        self.meta.as_ref()?.get("source")?.as_str()
    }
}

/// Successful generate envelope.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GenerateResult {
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub matches: Vec<SourceMatch>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Collection {
    pub name: String,
    #[serde(default)]
    pub count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CollectionList {
    #[serde(default)]
    pub collections: Option<Vec<Collection>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeleteResponse {
    #[serde(default)]
    pub deleted: Option<u64>,
    #[serde(default)]
    pub collection: Option<String>,
}

/// Extract a logical failure from a 2xx body.
///
/// Returns `None` when `error` is absent or falsy (`null`, `false`, `""`,
/// `0`). A string is returned as-is; an object contributes its `message`
/// field. Any other truthy value yields an empty message so the caller's
/// fallback text is shown.
pub fn logical_error(body: &Value) -> Option<String> {
    match body.get("error")? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => Some(
            map.get("message")
                .and_then(|m| m.as_str())
                .unwrap_or_default()
                .to_string(),
        ),
        _ => Some(String::new()),
    }
}
