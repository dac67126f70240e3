//! HTTP transport seam for the backend client.
//!
//! # Design
//! Requests and responses are plain data. `BackendClient` builds
//! `HttpRequest` values and interprets `HttpResponse` values without touching
//! the network; the `Transport` trait owns the actual round-trip.
//! `UreqTransport` is the production implementation, tests substitute an
//! in-memory double. A transport failure keeps only the distinction the error
//! taxonomy needs: TLS problems versus everything else.

use std::time::Duration;

/// HTTP method for a backend request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
}

/// A backend request described as plain data.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// A backend response described as plain data. Non-2xx statuses are data,
/// not errors; the client layer owns status interpretation.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Failure below the HTTP layer, before any status code exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFailure {
    /// Connection refused, DNS failure, timeout, broken pipe.
    Unreachable,
    /// Certificate, hostname or chain validation problem.
    Tls,
}

/// Executes `HttpRequest`s against the network.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportFailure>;
}

/// Production transport backed by a blocking `ureq` agent.
///
/// The agent is configured once: a global timeout covering the whole
/// round-trip, a fixed user-agent, status codes returned as data, and an
/// optional TLS-verification bypass for backends with self-signed
/// certificates. There are no retries; a timed-out call surfaces as
/// `Unreachable`.
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration, allow_insecure_tls: bool, user_agent: &str) -> Self {
        let mut config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .user_agent(user_agent);
        if allow_insecure_tls {
            config = config.tls_config(
                ureq::tls::TlsConfig::builder()
                    .disable_verification(true)
                    .build(),
            );
        }
        Self {
            agent: config.build().new_agent(),
        }
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportFailure> {
        let result = match (request.method, request.body.as_deref()) {
            (HttpMethod::Get, _) => {
                let mut req = self.agent.get(&request.url);
                for (name, value) in &request.headers {
                    req = req.header(name.as_str(), value.as_str());
                }
                req.call()
            }
            (HttpMethod::Post, body) => {
                let mut req = self.agent.post(&request.url);
                for (name, value) in &request.headers {
                    req = req.header(name.as_str(), value.as_str());
                }
                match body {
                    Some(body) => req.send(body.as_bytes()),
                    None => req.send_empty(),
                }
            }
            (HttpMethod::Put, body) => {
                let mut req = self.agent.put(&request.url);
                for (name, value) in &request.headers {
                    req = req.header(name.as_str(), value.as_str());
                }
                match body {
                    Some(body) => req.send(body.as_bytes()),
                    None => req.send_empty(),
                }
            }
        };

        let mut response = result.map_err(classify)?;
        let status = response.status().as_u16();
        let body = response.body_mut().read_to_string().map_err(classify)?;
        Ok(HttpResponse { status, body })
    }
}

/// rustls reports verification failures as custom io errors, so the io arm
/// sniffs for them before falling back to plain unreachability.
fn classify(err: ureq::Error) -> TransportFailure {
    match err {
        ureq::Error::Tls(_) => TransportFailure::Tls,
        ureq::Error::Io(ref io) if io.to_string().to_lowercase().contains("certificate") => {
            TransportFailure::Tls
        }
        _ => TransportFailure::Unreachable,
    }
}
