//! In-memory transport double for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::http::{HttpRequest, HttpResponse, Transport, TransportFailure};

/// Records every request and replays queued responses. With an empty queue it
/// answers `200 {}` so tests only script the calls they care about.
pub(crate) struct RecordingTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, TransportFailure>>>,
    seen: Mutex<Vec<HttpRequest>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Transport that always answers with the given status and body.
    pub fn replying(status: u16, body: &str) -> Self {
        let transport = Self::new();
        transport.push(status, body);
        transport
    }

    /// Transport whose next call fails below the HTTP layer.
    pub fn failing(failure: TransportFailure) -> Self {
        let transport = Self::new();
        transport.push_failure(failure);
        transport
    }

    pub fn push(&self, status: u16, body: &str) {
        self.responses.lock().unwrap().push_back(Ok(HttpResponse {
            status,
            body: body.to_string(),
        }));
    }

    pub fn push_failure(&self, failure: TransportFailure) {
        self.responses.lock().unwrap().push_back(Err(failure));
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<HttpRequest> {
        self.seen.lock().unwrap().last().cloned()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.seen.lock().unwrap().clone()
    }
}

impl Transport for RecordingTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportFailure> {
        self.seen.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(HttpResponse {
                    status: 200,
                    body: "{}".to_string(),
                })
            })
    }
}
