//! Authenticated request execution against the inventory backend.
//!
//! # Design
//! Semantics follow the cURL layer this replaces: one auth header on every
//! call, JSON bodies, no retries, an empty body only legal on HTTP 204, and a
//! short allow-list of benign backend errors that must not surface as
//! failures. Status interpretation lives here; the transport only moves
//! bytes.

use std::sync::{Arc, LazyLock};
use std::time::Instant;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::error::BackendError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportFailure};

/// Header carrying the backend API key on every outbound call.
pub const AUTH_HEADER: &str = "GROCY-API-KEY";

/// Backend error payloads that do not indicate a real failure. The backend
/// answers unknown lookups with an `error_message` payload; these patterns
/// turn into absent results instead of `MalformedResponse`.
static IGNORED_API_ERRORS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        "No product with barcode .+ found",
        "Product does not exist",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("static pattern"))
    .collect()
});

/// Credentials for one backend. The override form is used by connection
/// checks against arbitrary servers.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// API root including the trailing slash.
    pub base_url: String,
    pub api_key: String,
}

/// Builds and executes authenticated backend calls.
pub struct BackendClient {
    credentials: Credentials,
    transport: Arc<dyn Transport>,
    debug_timing: bool,
}

impl BackendClient {
    pub fn new(credentials: Credentials, transport: Arc<dyn Transport>, debug_timing: bool) -> Self {
        Self {
            credentials,
            transport,
            debug_timing,
        }
    }

    /// Execute a call against `endpoint` (relative to the API root unless
    /// `absolute_url`) and return the parsed JSON payload. A 204 with an
    /// empty body parses as JSON null.
    pub fn execute(
        &self,
        endpoint: &str,
        method: HttpMethod,
        body: Option<&Value>,
        credential_override: Option<&Credentials>,
        absolute_url: bool,
    ) -> Result<Value, BackendError> {
        let credentials = credential_override.unwrap_or(&self.credentials);
        let url = if absolute_url {
            endpoint.to_string()
        } else {
            format!("{}{}", credentials.base_url, endpoint)
        };

        let mut headers = vec![(AUTH_HEADER.to_string(), credentials.api_key.clone())];
        let body = body.map(|value| {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
            value.to_string()
        });

        let request = HttpRequest {
            method,
            url,
            headers,
            body,
        };
        let started = Instant::now();
        let response = self
            .transport
            .execute(&request)
            .map_err(|failure| match failure {
                TransportFailure::Tls => BackendError::TlsValidationFailure,
                TransportFailure::Unreachable => BackendError::TransportUnavailable,
            })?;
        if self.debug_timing {
            debug!(
                endpoint,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "backend call finished"
            );
        }
        interpret(response)
    }
}

/// Map status and body to the taxonomy; benign backend errors pass through
/// as their parsed payload so lookups can report absence.
fn interpret(response: HttpResponse) -> Result<Value, BackendError> {
    if response.status == 401 {
        return Err(BackendError::Unauthorized);
    }
    if response.body.trim().is_empty() {
        return if response.status == 204 {
            Ok(Value::Null)
        } else {
            Err(BackendError::TransportUnavailable)
        };
    }
    let payload: Value = serde_json::from_str(&response.body)
        .map_err(|err| BackendError::MalformedResponse(err.to_string()))?;
    if let Some(message) = payload.get("error_message").and_then(Value::as_str) {
        let benign = IGNORED_API_ERRORS
            .iter()
            .any(|pattern| pattern.is_match(message));
        if !benign {
            return Err(BackendError::MalformedResponse(message.to_string()));
        }
    }
    Ok(payload)
}
