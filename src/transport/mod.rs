//! Pluggable HTTP backends.
//!
//! A backend implements [`HttpTransport`]: it turns a fully assembled
//! [`TransportRequest`] into a call, executes the call and reports what came
//! back as a [`RawResponse`]. The [`TransportAdapter`] does everything else
//! (header merging, body policy, response normalization), so backends stay
//! thin.
//!
//! - [`HyperTransport`]: plain HTTP over the hyper-util client
//! - [`MockTransport`]: scripted responses for tests

pub mod adapter;
pub mod hyperclient;
pub mod mock;

pub use adapter::TransportAdapter;
pub use hyperclient::HyperTransport;
pub use mock::{MockResponse, MockTransport};

use crate::base::neterror::NetError;
use crate::config::{Timeouts, TransportConfig};
use crate::http::method::Verb;
use crate::http::orderedheaders::OrderedHeaderMap;
use crate::http::responsebody::ResponseBody;
use bytes::Bytes;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use url::Url;

static NEXT_CALL_ID: AtomicU64 = AtomicU64::new(1);

/// A request ready for a backend: method mapped, headers merged, body bytes
/// produced.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub verb: Verb,
    pub url: Url,
    pub headers: OrderedHeaderMap,
    /// `None` when the method carries no body. An empty POST body is
    /// `Some` with no bytes.
    pub body: Option<Bytes>,
    pub timeouts: Timeouts,
}

/// A call created by [`HttpTransport::new_call`] and not yet executed.
#[derive(Debug)]
pub struct CallHandle {
    id: u64,
    request: TransportRequest,
}

impl CallHandle {
    pub fn new(request: TransportRequest) -> Self {
        Self {
            id: NEXT_CALL_ID.fetch_add(1, Ordering::Relaxed),
            request,
        }
    }

    /// Process-unique call id, for log correlation.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn request(&self) -> &TransportRequest {
        &self.request
    }

    pub fn into_request(self) -> TransportRequest {
        self.request
    }
}

/// What a backend received, before normalization.
pub struct RawResponse {
    /// Protocol token as the backend reports it, e.g. `http/1.1` or `h2`.
    pub protocol: String,
    pub status: u16,
    pub message: String,
    pub headers: Vec<(String, String)>,
    pub body: ResponseBody,
}

impl fmt::Debug for RawResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawResponse")
            .field("protocol", &self.protocol)
            .field("status", &self.status)
            .field("message", &self.message)
            .field("headers", &self.headers.len())
            .finish_non_exhaustive()
    }
}

/// Alias for the `Future` type returned by a backend call.
pub type Calling = Pin<Box<dyn Future<Output = Result<RawResponse, NetError>> + Send>>;

/// Trait for HTTP backends.
///
/// Implementations must be thread-safe: one backend instance is shared by
/// every request an adapter executes.
pub trait HttpTransport: Send + Sync {
    /// Prepare a call. Errors here mean the request can never be sent.
    fn new_call(&self, request: TransportRequest) -> Result<CallHandle, NetError>;

    /// Execute a prepared call.
    fn execute_call(&self, call: CallHandle) -> Calling;
}

impl<T: HttpTransport + ?Sized> HttpTransport for Arc<T> {
    fn new_call(&self, request: TransportRequest) -> Result<CallHandle, NetError> {
        (**self).new_call(request)
    }

    fn execute_call(&self, call: CallHandle) -> Calling {
        (**self).execute_call(call)
    }
}

/// Builds the backend an adapter dispatches through.
///
/// Called at most once per adapter, on first use.
pub trait MakeTransport: Send + Sync {
    fn make_transport(&self, config: &TransportConfig) -> Result<Arc<dyn HttpTransport>, NetError>;
}

impl<F> MakeTransport for F
where
    F: Fn(&TransportConfig) -> Result<Arc<dyn HttpTransport>, NetError> + Send + Sync,
{
    fn make_transport(&self, config: &TransportConfig) -> Result<Arc<dyn HttpTransport>, NetError> {
        self(config)
    }
}
