//! Generation (RAG query) session controller.
//!
//! Independent of summarization: a single `message` input, a temperature,
//! and a system prompt that is written through to a [`PreferenceStore`] on
//! every edit. The prompt is read from the store once, when the session is
//! created.

use anyhow::Result;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::models::{GenerateRequest, GenerateResult, Temperature};
use crate::prefs::{PreferenceStore, SYSTEM_PROMPT_KEY};
use crate::reconcile::normalize;
use crate::session::{decode_envelope, lock, Failure, SessionPhase, Sequencer, Ticket};
use crate::transport::{endpoints, Backend};

const GENERATE_FALLBACK: &str = "Failed";

#[derive(Debug, Clone, PartialEq)]
pub struct GenerateView {
    pub message: String,
    pub system_prompt: String,
    pub temperature: Temperature,
    pub phase: SessionPhase,
    pub answer: Option<GenerateResult>,
    pub error: Option<String>,
}

struct State {
    message: String,
    system_prompt: String,
    temperature: Temperature,
    phase: SessionPhase,
    answer: Option<GenerateResult>,
    error: Option<String>,
    seq: Sequencer,
}

pub struct GenerateSession {
    backend: Arc<dyn Backend>,
    prefs: Arc<dyn PreferenceStore>,
    state: Mutex<State>,
}

impl GenerateSession {
    /// Create a session, loading the persisted system prompt.
    pub fn new(
        backend: Arc<dyn Backend>,
        prefs: Arc<dyn PreferenceStore>,
        temperature: Temperature,
    ) -> Result<Self> {
        let system_prompt = prefs.load(SYSTEM_PROMPT_KEY)?.unwrap_or_default();
        Ok(Self {
            backend,
            prefs,
            state: Mutex::new(State {
                message: String::new(),
                system_prompt,
                temperature,
                phase: SessionPhase::Idle,
                answer: None,
                error: None,
                seq: Sequencer::default(),
            }),
        })
    }

    pub fn set_message(&self, message: impl Into<String>) {
        lock(&self.state).message = message.into();
    }

    pub fn set_temperature(&self, temperature: Temperature) {
        lock(&self.state).temperature = temperature;
    }

    /// Edit the system prompt. The new value is persisted before it takes
    /// effect; a blank value removes the stored prompt.
    pub fn set_system_prompt(&self, prompt: impl Into<String>) -> Result<()> {
        let prompt = prompt.into();
        self.prefs.save(SYSTEM_PROMPT_KEY, &prompt)?;
        lock(&self.state).system_prompt = prompt;
        Ok(())
    }

    pub fn clear_system_prompt(&self) -> Result<()> {
        self.set_system_prompt(String::new())
    }

    pub fn view(&self) -> GenerateView {
        let s = lock(&self.state);
        GenerateView {
            message: s.message.clone(),
            system_prompt: s.system_prompt.clone(),
            temperature: s.temperature,
            phase: s.phase,
            answer: s.answer.clone(),
            error: s.error.clone(),
        }
    }

    /// Send the current message and wait for the answer.
    pub async fn run(&self) -> SessionPhase {
        let (ticket, request) = {
            let mut s = lock(&self.state);
            s.answer = None;
            s.error = None;
            s.phase = SessionPhase::Submitting;
            let request = GenerateRequest {
                message: s.message.clone(),
                system_prompt: normalize(&s.system_prompt).map(|_| s.system_prompt.clone()),
                temperature: s.temperature,
            };
            (s.seq.issue(), request)
        };

        debug!(
            seq = ticket.number(),
            has_system_prompt = request.system_prompt.is_some(),
            "generate request"
        );

        let outcome = match serde_json::to_value(&request) {
            Ok(payload) => self
                .backend
                .send_json(endpoints::GENERATE, &payload)
                .await
                .map_err(Failure::from)
                .and_then(|body| decode_envelope::<GenerateResult>(endpoints::GENERATE, body)),
            Err(e) => Err(Failure::Validation(e.to_string())),
        };

        self.settle(ticket, outcome)
    }

    /// Clear message, answer and error. The system prompt is kept.
    pub fn reset(&self) {
        let mut s = lock(&self.state);
        s.message.clear();
        s.answer = None;
        s.error = None;
        s.phase = SessionPhase::Idle;
        s.seq.invalidate();
    }

    fn settle(&self, ticket: Ticket, outcome: Result<GenerateResult, Failure>) -> SessionPhase {
        let mut s = lock(&self.state);
        if !s.seq.is_current(ticket) {
            warn!(seq = ticket.number(), "discarding superseded generate response");
            return s.phase;
        }
        match outcome {
            Ok(answer) => {
                debug!(seq = ticket.number(), matches = answer.matches.len(), "generate succeeded");
                s.answer = Some(answer);
                s.phase = SessionPhase::Succeeded;
            }
            Err(failure) => {
                let message = failure.message(GENERATE_FALLBACK);
                warn!(seq = ticket.number(), error = %message, "generate failed");
                s.error = Some(message);
                s.phase = SessionPhase::Failed;
            }
        }
        s.phase
    }
}
