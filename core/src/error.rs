//! Backend failure taxonomy.
//!
//! # Design
//! Four classifications cover every way a backend call can fail. They exist
//! for logging and for the connection-check report; outside of those two
//! places callers only ever see the opaque `CallFailed`, so the taxonomy
//! never leaks into scan outcomes or API envelopes.

use thiserror::Error;

/// Classified failure of a single backend call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// Connection failure, timeout, or an empty body outside HTTP 204.
    #[error("backend unreachable")]
    TransportUnavailable,

    /// The backend rejected the API key (HTTP 401).
    #[error("backend rejected the API key")]
    Unauthorized,

    /// Non-JSON body, or a backend error payload not on the benign
    /// allow-list.
    #[error("malformed backend response: {0}")]
    MalformedResponse(String),

    /// Certificate, hostname or chain validation failed. Distinguished from
    /// `TransportUnavailable` only for messaging.
    #[error("TLS validation failed")]
    TlsValidationFailure,
}

/// Returned by facade operations after the failure has been classified and
/// logged at the choke point. Carries no detail on purpose.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("backend call failed")]
pub struct CallFailed;
