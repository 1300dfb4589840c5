//! Request body for methods that send data.

use crate::base::neterror::NetError;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;

/// Lazily produces body bytes at dispatch time.
pub type BodyProvider = Arc<dyn Fn() -> Result<Bytes, NetError> + Send + Sync>;

/// Where body bytes come from.
#[derive(Clone)]
pub enum BodySource {
    /// Bytes known up front.
    Bytes(Bytes),
    /// Bytes produced on demand; failures surface as errors, never as an empty body.
    Lazy(BodyProvider),
}

impl fmt::Debug for BodySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodySource::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            BodySource::Lazy(_) => f.write_str("Lazy(..)"),
        }
    }
}

/// A request body together with its media type.
///
/// The content type is only absent for the empty body the POST policy
/// synthesizes.
#[derive(Debug, Clone)]
pub struct RequestBody {
    source: BodySource,
    content_type: Option<String>,
}

impl RequestBody {
    /// A body from known bytes.
    pub fn new(content_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            source: BodySource::Bytes(data.into()),
            content_type: Some(content_type.into()),
        }
    }

    /// A body whose bytes are produced when the request is dispatched.
    pub fn lazy<F>(content_type: impl Into<String>, provider: F) -> Self
    where
        F: Fn() -> Result<Bytes, NetError> + Send + Sync + 'static,
    {
        Self {
            source: BodySource::Lazy(Arc::new(provider)),
            content_type: Some(content_type.into()),
        }
    }

    /// A zero-length body with no media type.
    pub fn empty() -> Self {
        Self {
            source: BodySource::Bytes(Bytes::new()),
            content_type: None,
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn source(&self) -> &BodySource {
        &self.source
    }

    /// Length in bytes, if known without running the provider.
    pub fn known_len(&self) -> Option<usize> {
        match &self.source {
            BodySource::Bytes(b) => Some(b.len()),
            BodySource::Lazy(_) => None,
        }
    }

    /// Produce the body bytes, running the provider if there is one.
    pub fn materialize(&self) -> Result<Bytes, NetError> {
        match &self.source {
            BodySource::Bytes(b) => Ok(b.clone()),
            BodySource::Lazy(provider) => provider(),
        }
    }
}

impl From<String> for RequestBody {
    fn from(s: String) -> Self {
        RequestBody::new("text/plain; charset=utf-8", s)
    }
}

impl From<&str> for RequestBody {
    fn from(s: &str) -> Self {
        RequestBody::new("text/plain; charset=utf-8", s.to_owned())
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(v: Vec<u8>) -> Self {
        RequestBody::new("application/octet-stream", v)
    }
}

impl From<Bytes> for RequestBody {
    fn from(b: Bytes) -> Self {
        RequestBody::new("application/octet-stream", b)
    }
}
