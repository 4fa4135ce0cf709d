//! Transport failure type.
//!
//! Only the transport layer produces a typed error. Logical failures
//! (`{"error": ...}` inside a 2xx body) and local validation failures are
//! turned into display strings by the controllers and never reach here.

use thiserror::Error;

/// Result alias for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// A request that did not yield a usable 2xx JSON body.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Backend answered with a non-2xx status. `body` is read best-effort.
    #[error("HTTP {status} from {endpoint}: {body}")]
    Http {
        status: u16,
        endpoint: String,
        body: String,
    },

    /// The request never produced a response (DNS, connect, TLS, reset).
    #[error("request to {endpoint} failed: {source}")]
    Network {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// A 2xx response whose body was not valid JSON.
    #[error("invalid JSON from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },
}

impl TransportError {
    /// HTTP status for [`TransportError::Http`], `None` otherwise.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn endpoint(&self) -> &str {
        match self {
            TransportError::Http { endpoint, .. }
            | TransportError::Network { endpoint, .. }
            | TransportError::Decode { endpoint, .. } => endpoint,
        }
    }
}
