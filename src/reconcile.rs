//! Input reconciliation: turning raw form state into request payloads.
//!
//! A summarize request carries a URL or pasted text, never `""`: each field
//! is trimmed and a blank result is omitted. When both are non-blank the
//! configured [`SourceConflict`] policy decides the outcome. Upload
//! requests always send `detail` and `temperature` as strings next to the
//! file part.

use serde::Deserialize;
use thiserror::Error;

use crate::models::{
    GenerationParams, InputSelection, StagedFile, SummarizeRequest, UploadRequest,
};

/// What to do when both a URL and pasted text are supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceConflict {
    /// Send the URL and drop the text.
    #[default]
    PreferUrl,
    /// Send both fields and let the backend decide.
    SendBoth,
    /// Refuse to build a request.
    Reject,
}

/// Local precondition failures. No network call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Provide either a URL or text, not both.")]
    ConflictingSources,
}

/// Trim and map blank strings to `None`.
pub fn normalize(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Build the `/api/summarize` body from the raw URL and text fields.
pub fn build_summarize_request(
    url: &str,
    text: &str,
    params: GenerationParams,
    policy: SourceConflict,
) -> Result<SummarizeRequest, ValidationError> {
    let url = normalize(url);
    let mut text = normalize(text);

    if url.is_some() && text.is_some() {
        match policy {
            SourceConflict::PreferUrl => text = None,
            SourceConflict::SendBoth => {}
            SourceConflict::Reject => return Err(ValidationError::ConflictingSources),
        }
    }

    // Both blank is left to the backend, which answers with a logical error.
    Ok(SummarizeRequest {
        url,
        text,
        detail: params.detail,
        temperature: params.temperature,
    })
}

/// Build the multipart `/api/upload` request for a staged file.
pub fn build_upload_request(file: StagedFile, params: GenerationParams) -> UploadRequest {
    UploadRequest {
        fields: vec![
            ("detail".to_string(), params.detail.to_string()),
            ("temperature".to_string(), params.temperature.to_string()),
        ],
        file,
    }
}

/// The effective source of a summarize request, for logging and display.
pub fn selection_of(request: &SummarizeRequest) -> Option<InputSelection> {
    request
        .url
        .clone()
        .map(InputSelection::Url)
        .or_else(|| request.text.clone().map(InputSelection::Text))
}
