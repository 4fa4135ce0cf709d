//! Summarization session controller.
//!
//! Owns the URL/text/file inputs, the generation parameters and the last
//! result. Two submission paths share one lifecycle:
//!
//! ```text
//! Idle ──submit()/submit_upload()──▶ Submitting ──▶ Succeeded | Failed
//!   ▲                                                      │
//!   └──────────────────────── reset() ─────────────────────┘
//! ```
//!
//! Starting a request clears the previous result and error. Failures keep
//! the user's inputs so a retry needs no retyping. A successful upload
//! clears URL and text to show where the result came from.

use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::models::{
    Detail, GenerationParams, StagedFile, SummaryResult, Temperature, UploadRequest,
};
use crate::reconcile::{self, SourceConflict};
use crate::session::{decode_envelope, lock, Failure, SessionPhase, Sequencer, Ticket};
use crate::transport::{endpoints, Backend};

const SUMMARIZE_FALLBACK: &str = "Failed";
const UPLOAD_FALLBACK: &str = "Upload failed";

/// Point-in-time copy of the controller state.
#[derive(Debug, Clone, PartialEq)]
pub struct SummarizeView {
    pub url: String,
    pub text: String,
    pub file_name: Option<String>,
    pub params: GenerationParams,
    pub phase: SessionPhase,
    pub result: Option<SummaryResult>,
    pub error: Option<String>,
}

#[derive(Default)]
struct State {
    url: String,
    text: String,
    file: Option<StagedFile>,
    params: GenerationParams,
    phase: SessionPhase,
    result: Option<SummaryResult>,
    error: Option<String>,
    seq: Sequencer,
}

pub struct SummarizeSession {
    backend: Arc<dyn Backend>,
    policy: SourceConflict,
    state: Mutex<State>,
}

impl SummarizeSession {
    pub fn new(backend: Arc<dyn Backend>, params: GenerationParams, policy: SourceConflict) -> Self {
        Self {
            backend,
            policy,
            state: Mutex::new(State {
                params,
                ..State::default()
            }),
        }
    }

    pub fn set_url(&self, url: impl Into<String>) {
        lock(&self.state).url = url.into();
    }

    pub fn set_text(&self, text: impl Into<String>) {
        lock(&self.state).text = text.into();
    }

    /// Stage a file for [`submit_upload`](Self::submit_upload), replacing any
    /// previously staged one. `None` unstages.
    pub fn stage_file(&self, file: Option<StagedFile>) {
        lock(&self.state).file = file;
    }

    pub fn set_detail(&self, detail: Detail) {
        lock(&self.state).params.detail = detail;
    }

    pub fn set_temperature(&self, temperature: Temperature) {
        lock(&self.state).params.temperature = temperature;
    }

    pub fn view(&self) -> SummarizeView {
        let s = lock(&self.state);
        SummarizeView {
            url: s.url.clone(),
            text: s.text.clone(),
            file_name: s.file.as_ref().map(|f| f.name.clone()),
            params: s.params,
            phase: s.phase,
            result: s.result.clone(),
            error: s.error.clone(),
        }
    }

    /// Summarize from the URL or text field. Returns the phase once this
    /// request has settled (or been superseded).
    pub async fn submit(&self) -> SessionPhase {
        let (ticket, request) = {
            let mut s = lock(&self.state);
            let built = reconcile::build_summarize_request(&s.url, &s.text, s.params, self.policy);
            let ticket = begin(&mut s);
            match built {
                Ok(req) => (ticket, req),
                Err(e) => {
                    let failure = Failure::Validation(e.to_string());
                    warn!(error = %e, "summarize rejected before sending");
                    fail(&mut s, &failure, SUMMARIZE_FALLBACK);
                    return s.phase;
                }
            }
        };

        if let Some(selection) = reconcile::selection_of(&request) {
            debug!(seq = ticket.number(), source = selection.kind(), "summarize request");
        }

        let outcome = match serde_json::to_value(&request) {
            Ok(payload) => self
                .backend
                .send_json(endpoints::SUMMARIZE, &payload)
                .await
                .map_err(Failure::from)
                .and_then(|body| decode_envelope::<SummaryResult>(endpoints::SUMMARIZE, body)),
            Err(e) => Err(Failure::Validation(e.to_string())),
        };

        self.settle(ticket, outcome, SUMMARIZE_FALLBACK, false)
    }

    /// Summarize the staged file. A no-op when nothing is staged.
    ///
    /// The staged file is consumed by the attempt whatever its outcome,
    /// so the same file can be picked again.
    pub async fn submit_upload(&self) -> SessionPhase {
        let (ticket, upload): (Ticket, UploadRequest) = {
            let mut s = lock(&self.state);
            let Some(file) = s.file.take() else {
                return s.phase;
            };
            let upload = reconcile::build_upload_request(file, s.params);
            (begin(&mut s), upload)
        };

        debug!(seq = ticket.number(), file = %upload.file.name, "upload request");

        let outcome = self
            .backend
            .send_multipart(endpoints::UPLOAD, &upload)
            .await
            .map_err(Failure::from)
            .and_then(|body| decode_envelope::<SummaryResult>(endpoints::UPLOAD, body));

        self.settle(ticket, outcome, UPLOAD_FALLBACK, true)
    }

    /// Clear inputs, result and error. Responses still in flight are
    /// discarded when they arrive.
    pub fn reset(&self) {
        let mut s = lock(&self.state);
        s.url.clear();
        s.text.clear();
        s.file = None;
        s.result = None;
        s.error = None;
        s.phase = SessionPhase::Idle;
        s.seq.invalidate();
    }

    fn settle(
        &self,
        ticket: Ticket,
        outcome: Result<SummaryResult, Failure>,
        fallback: &str,
        from_file: bool,
    ) -> SessionPhase {
        let mut s = lock(&self.state);
        if !s.seq.is_current(ticket) {
            warn!(seq = ticket.number(), "discarding superseded summarize response");
            return s.phase;
        }
        match outcome {
            Ok(result) => {
                debug!(seq = ticket.number(), title = ?result.title, "summarize succeeded");
                s.result = Some(result);
                s.phase = SessionPhase::Succeeded;
                if from_file {
                    s.url.clear();
                    s.text.clear();
                }
            }
            Err(failure) => {
                warn!(seq = ticket.number(), error = %failure.message(fallback), "summarize failed");
                fail(&mut s, &failure, fallback);
            }
        }
        s.phase
    }
}

fn begin(s: &mut State) -> Ticket {
    s.result = None;
    s.error = None;
    s.phase = SessionPhase::Submitting;
    s.seq.issue()
}

fn fail(s: &mut State, failure: &Failure, fallback: &str) {
    s.result = None;
    s.error = Some(failure.message(fallback));
    s.phase = SessionPhase::Failed;
}
