//! Normalized response returned by a `TransportAdapter`.

use crate::base::neterror::NetError;
use crate::http::headerparser::{self, CacheHeaders};
use crate::http::ResponseBody;
use http::header::{CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE};
use http::HeaderMap;
use std::fmt;
use time::OffsetDateTime;

/// Protocol and version a response was received over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolVersion {
    pub protocol: &'static str,
    pub major: u8,
    pub minor: u8,
}

impl ProtocolVersion {
    pub const HTTP_1_0: ProtocolVersion = ProtocolVersion::new("HTTP", 1, 0);
    pub const HTTP_1_1: ProtocolVersion = ProtocolVersion::new("HTTP", 1, 1);
    pub const HTTP_2: ProtocolVersion = ProtocolVersion::new("HTTP", 2, 0);
    pub const SPDY_3: ProtocolVersion = ProtocolVersion::new("SPDY", 3, 1);

    const fn new(protocol: &'static str, major: u8, minor: u8) -> Self {
        Self {
            protocol,
            major,
            minor,
        }
    }

    /// Map a backend protocol token (ALPN style) to a version.
    pub fn from_token(token: &str) -> Result<Self, NetError> {
        match token.to_ascii_lowercase().as_str() {
            "http/1.0" => Ok(Self::HTTP_1_0),
            "http/1.1" => Ok(Self::HTTP_1_1),
            "spdy/3.1" => Ok(Self::SPDY_3),
            "h2" | "h2_prior_knowledge" => Ok(Self::HTTP_2),
            _ => Err(NetError::ProtocolParse {
                token: token.to_string(),
            }),
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}.{}", self.protocol, self.major, self.minor)
    }
}

/// A response with backend specifics removed.
#[derive(Debug)]
pub struct TransportResponse {
    status_code: u16,
    status_message: String,
    protocol_version: ProtocolVersion,
    headers: HeaderMap,
    body: Option<ResponseBody>,
    default_charset: String,
}

impl TransportResponse {
    pub(crate) fn new(
        status_code: u16,
        status_message: String,
        protocol_version: ProtocolVersion,
        headers: HeaderMap,
        body: ResponseBody,
        default_charset: String,
    ) -> Self {
        Self {
            status_code,
            status_message,
            protocol_version,
            headers,
            body: Some(body),
            default_charset,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn protocol_version(&self) -> ProtocolVersion {
        self.protocol_version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn content_encoding(&self) -> Option<&str> {
        self.header(CONTENT_ENCODING)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header(CONTENT_TYPE)
    }

    /// Declared Content-Length, falling back to what the body reports.
    pub fn content_length(&self) -> Option<u64> {
        self.header(CONTENT_LENGTH)
            .and_then(|v| v.trim().parse().ok())
            .or_else(|| self.body.as_ref().and_then(ResponseBody::exact_len))
    }

    /// Charset the body is declared in, or the configured default.
    pub fn charset(&self) -> String {
        headerparser::parse_charset(&self.headers, &self.default_charset)
    }

    /// Cache metadata as of `now`, or `None` if the response is uncacheable.
    pub fn cache_headers(&self, now: OffsetDateTime) -> Option<CacheHeaders> {
        headerparser::parse_cache_headers(&self.headers, now)
    }

    /// Take the response body for consumption.
    /// Can only be called once - subsequent calls return None.
    pub fn take_body(&mut self) -> Option<ResponseBody> {
        self.body.take()
    }

    /// Convenience method to consume body as bytes.
    pub async fn bytes(mut self) -> Result<bytes::Bytes, NetError> {
        self.body.take().ok_or(NetError::HttpBodyError)?.bytes().await
    }

    /// Consume the body as text in the declared charset.
    pub async fn text(mut self) -> Result<String, NetError> {
        let charset = self.charset();
        let bytes = self.body.take().ok_or(NetError::HttpBodyError)?.bytes().await?;
        headerparser::decode_text(&bytes, &charset)
    }

    /// Convenience method to consume body as JSON.
    pub async fn json<T: serde::de::DeserializeOwned>(mut self) -> Result<T, NetError> {
        self.body.take().ok_or(NetError::HttpBodyError)?.json().await
    }

    fn header(&self, name: http::header::HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn response(headers: HeaderMap, body: &'static str) -> TransportResponse {
        TransportResponse::new(
            200,
            "OK".to_string(),
            ProtocolVersion::HTTP_1_1,
            headers,
            ResponseBody::from_bytes(body),
            headerparser::DEFAULT_CHARSET.to_string(),
        )
    }

    #[test]
    fn test_protocol_tokens() {
        assert_eq!(ProtocolVersion::from_token("http/1.0").unwrap(), ProtocolVersion::HTTP_1_0);
        assert_eq!(ProtocolVersion::from_token("HTTP/1.1").unwrap(), ProtocolVersion::HTTP_1_1);
        assert_eq!(ProtocolVersion::from_token("spdy/3.1").unwrap(), ProtocolVersion::SPDY_3);
        assert_eq!(ProtocolVersion::from_token("h2").unwrap(), ProtocolVersion::HTTP_2);
        assert_eq!(
            ProtocolVersion::from_token("h2_prior_knowledge").unwrap(),
            ProtocolVersion::HTTP_2
        );
        assert!(ProtocolVersion::from_token("spdy/3").is_err());
        assert_eq!(ProtocolVersion::SPDY_3.to_string(), "SPDY/3.1");
    }

    #[test]
    fn test_unknown_protocol_token() {
        let err = ProtocolVersion::from_token("quic").unwrap_err();
        assert!(matches!(err, NetError::ProtocolParse { ref token } if token == "quic"));
    }

    #[test]
    fn test_content_metadata() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));

        let resp = response(headers, "abc");
        assert_eq!(resp.content_encoding(), Some("gzip"));
        assert_eq!(resp.content_type(), Some("text/plain; charset=utf-8"));
        assert_eq!(resp.content_length(), Some(3));
        assert_eq!(resp.charset(), "utf-8");
    }

    #[tokio::test]
    async fn test_text_uses_default_charset() {
        let resp = response(HeaderMap::new(), "plain");
        assert_eq!(resp.charset(), "ISO-8859-1");
        assert_eq!(resp.text().await.unwrap(), "plain");
    }

    #[tokio::test]
    async fn test_text_unsupported_charset() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=koi8-r"));
        let resp = response(headers, "x");
        assert!(matches!(resp.text().await, Err(NetError::UnsupportedCharset { .. })));
    }

    #[tokio::test]
    async fn test_body_taken_once() {
        let mut resp = response(HeaderMap::new(), "x");
        assert!(resp.take_body().is_some());
        assert!(resp.take_body().is_none());
        assert!(matches!(resp.bytes().await, Err(NetError::HttpBodyError)));
    }
}
