//! Scripted in-memory backend.
//!
//! Records every dispatched request and answers from a queue of scripted
//! outcomes, falling back to a default response once the queue is empty.

use super::{CallHandle, Calling, HttpTransport, RawResponse, TransportRequest};
use crate::base::neterror::NetError;
use crate::http::responsebody::ResponseBody;
use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// A response the mock backend will return.
#[derive(Debug, Clone)]
pub struct MockResponse {
    protocol: String,
    status: u16,
    message: String,
    headers: Vec<(String, String)>,
    body: Bytes,
    delay: Option<Duration>,
}

impl Default for MockResponse {
    fn default() -> Self {
        Self::new(200)
    }
}

impl MockResponse {
    pub fn new(status: u16) -> Self {
        let message = http::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("")
            .to_string();
        Self {
            protocol: "http/1.1".to_string(),
            status,
            message,
            headers: Vec::new(),
            body: Bytes::new(),
            delay: None,
        }
    }

    /// A 200 response carrying `body`.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(200).body(body)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Protocol token reported to the adapter, `http/1.1` by default.
    pub fn protocol(mut self, token: impl Into<String>) -> Self {
        self.protocol = token.into();
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Wait before answering, to exercise timeouts and cancellation.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn into_raw(self) -> RawResponse {
        RawResponse {
            protocol: self.protocol,
            status: self.status,
            message: self.message,
            headers: self.headers,
            body: ResponseBody::from_bytes(self.body),
        }
    }
}

#[derive(Debug)]
enum Scripted {
    Respond(MockResponse),
    Fail(NetError),
}

/// In-memory [`HttpTransport`] for tests.
#[derive(Debug, Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<Scripted>>,
    default_response: MockResponse,
    requests: Mutex<Vec<TransportRequest>>,
    calls_created: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer with `response` whenever nothing is queued.
    pub fn with_default(response: MockResponse) -> Self {
        Self {
            default_response: response,
            ..Self::default()
        }
    }

    /// Queue a response for the next unanswered call.
    pub fn push_response(&self, response: MockResponse) {
        lock(&self.script).push_back(Scripted::Respond(response));
    }

    /// Queue a failure for the next unanswered call.
    pub fn push_failure(&self, error: NetError) {
        lock(&self.script).push_back(Scripted::Fail(error));
    }

    /// Requests executed so far, in dispatch order.
    pub fn requests(&self) -> Vec<TransportRequest> {
        lock(&self.requests).clone()
    }

    /// Number of calls created with `new_call`.
    pub fn calls_created(&self) -> usize {
        self.calls_created.load(Ordering::SeqCst)
    }
}

impl HttpTransport for MockTransport {
    fn new_call(&self, request: TransportRequest) -> Result<CallHandle, NetError> {
        self.calls_created.fetch_add(1, Ordering::SeqCst);
        Ok(CallHandle::new(request))
    }

    fn execute_call(&self, call: CallHandle) -> Calling {
        let next = lock(&self.script)
            .pop_front()
            .unwrap_or_else(|| Scripted::Respond(self.default_response.clone()));
        tracing::debug!(call_id = call.id(), url = %call.request().url, "mock call");
        lock(&self.requests).push(call.into_request());

        Box::pin(async move {
            match next {
                Scripted::Respond(response) => {
                    if let Some(delay) = response.delay {
                        tokio::time::sleep(delay).await;
                    }
                    Ok(response.into_raw())
                }
                Scripted::Fail(error) => Err(error),
            }
        })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
