//! Request lifecycle shared by the session controllers.
//!
//! Each controller hands out a [`Ticket`] when a request starts and applies
//! the outcome only if that ticket is still the latest one issued. Reset
//! invalidates outstanding tickets, so a response that lands after a reset
//! or after a newer submission is dropped instead of overwriting state.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::{Mutex, MutexGuard};

use crate::error::TransportError;
use crate::models::logical_error;

/// Where a controller is in its request lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    Submitting,
    Succeeded,
    Failed,
}

/// Proof that a request was started at a given point in the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

impl Ticket {
    pub fn number(self) -> u64 {
        self.0
    }
}

/// Monotonic per-controller request counter.
#[derive(Debug, Default)]
pub struct Sequencer {
    latest: u64,
}

impl Sequencer {
    pub fn issue(&mut self) -> Ticket {
        self.latest += 1;
        Ticket(self.latest)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 == self.latest
    }

    /// Make every outstanding ticket stale.
    pub fn invalidate(&mut self) {
        self.latest += 1;
    }
}

/// Why a request did not produce a result.
#[derive(Debug)]
pub enum Failure {
    /// Non-2xx status, network failure or undecodable body.
    Transport(TransportError),
    /// 2xx body carrying an `error` field.
    Logical(String),
    /// Local precondition not met; nothing was sent.
    Validation(String),
}

impl Failure {
    /// User-facing message, or `fallback` when the failure carries none.
    pub fn message(&self, fallback: &str) -> String {
        let msg = match self {
            Failure::Transport(e) => e.to_string(),
            Failure::Logical(m) | Failure::Validation(m) => m.clone(),
        };
        if msg.trim().is_empty() {
            fallback.to_string()
        } else {
            msg
        }
    }
}

impl From<TransportError> for Failure {
    fn from(e: TransportError) -> Self {
        Failure::Transport(e)
    }
}

/// Interpret a 2xx body: promote `error` to a logical failure, otherwise
/// decode the success envelope.
pub fn decode_envelope<T: DeserializeOwned>(endpoint: &str, body: Value) -> Result<T, Failure> {
    if let Some(message) = logical_error(&body) {
        return Err(Failure::Logical(message));
    }
    serde_json::from_value(body).map_err(|e| {
        Failure::Transport(TransportError::Decode {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })
    })
}

/// Lock a controller's state, recovering from poisoning.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
