//! Response body streaming.

use crate::base::neterror::NetError;
use bytes::Bytes;
use http_body::Body;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full};

/// A backend-independent response body.
///
/// Chunks can be pulled one at a time with [`ResponseBody::chunk`] or the
/// whole body collected with [`ResponseBody::bytes`].
pub struct ResponseBody {
    inner: UnsyncBoxBody<Bytes, NetError>,
}

impl std::fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseBody")
            .field("size_hint", &self.inner.size_hint().exact())
            .finish()
    }
}

impl ResponseBody {
    /// Wrap any body whose errors are already `NetError`s.
    pub fn new<B>(body: B) -> Self
    where
        B: Body<Data = Bytes, Error = NetError> + Send + 'static,
    {
        Self {
            inner: body.boxed_unsync(),
        }
    }

    /// A body that yields `data` in one chunk.
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self::new(Full::new(data.into()).map_err(|never| match never {}))
    }

    /// A body with no content.
    pub fn empty() -> Self {
        Self::new(Empty::<Bytes>::new().map_err(|never| match never {}))
    }

    /// Wrap a hyper body, turning stream errors into transport errors.
    pub fn from_incoming(body: hyper::body::Incoming) -> Self {
        Self::new(body.map_err(|e| NetError::transport("reading response body failed", e)))
    }

    /// Exact length, when the backend knows it up front.
    pub fn exact_len(&self) -> Option<u64> {
        self.inner.size_hint().exact()
    }

    /// Read the next data chunk, or `None` at end of stream.
    pub async fn chunk(&mut self) -> Result<Option<Bytes>, NetError> {
        while let Some(frame) = self.inner.frame().await {
            if let Ok(data) = frame?.into_data() {
                return Ok(Some(data));
            }
        }
        Ok(None)
    }

    /// Read entire body as bytes.
    pub async fn bytes(self) -> Result<Bytes, NetError> {
        let collected = self.inner.collect().await?;
        Ok(collected.to_bytes())
    }

    /// Read body as UTF-8 string.
    pub async fn text(self) -> Result<String, NetError> {
        let bytes = self.bytes().await?;
        String::from_utf8(bytes.to_vec()).map_err(|_| NetError::InvalidUtf8)
    }

    /// Read body as JSON, deserializing to type T.
    pub async fn json<T: serde::de::DeserializeOwned>(self) -> Result<T, NetError> {
        let bytes = self.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|_| NetError::JsonParseError)
    }

    /// Get the boxed body for low-level access.
    pub fn into_inner(self) -> UnsyncBoxBody<Bytes, NetError> {
        self.inner
    }
}
