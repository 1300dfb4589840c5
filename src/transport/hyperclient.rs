//! Backend over the hyper-util legacy client.
//!
//! Plain HTTP only. The connect timeout is enforced by the connector; the
//! write and read timeouts together bound the wait for response headers.

use super::{CallHandle, Calling, HttpTransport, RawResponse, TransportRequest};
use crate::base::neterror::NetError;
use crate::config::{Timeouts, TransportConfig};
use crate::http::responsebody::ResponseBody;
use bytes::Bytes;
use http::Version;
use http_body_util::Full;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::io;
use std::time::Duration;

/// Real network backend.
#[derive(Clone)]
pub struct HyperTransport {
    client: Client<HttpConnector, Full<Bytes>>,
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport").finish_non_exhaustive()
    }
}

impl HyperTransport {
    pub fn new(config: &TransportConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(config.connect_timeout));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new()).build(connector);
        tracing::debug!(
            connect_timeout_ms = config.connect_timeout.as_millis() as u64,
            "hyper transport created"
        );
        Self { client }
    }
}

impl HttpTransport for HyperTransport {
    fn new_call(&self, request: TransportRequest) -> Result<CallHandle, NetError> {
        if request.url.scheme() != "http" {
            tracing::warn!(url = %request.url, "only plain http is supported");
            return Err(NetError::InvalidUrl);
        }
        if request.url.host_str().is_none() {
            return Err(NetError::InvalidUrl);
        }
        Ok(CallHandle::new(request))
    }

    fn execute_call(&self, call: CallHandle) -> Calling {
        let client = self.client.clone();
        let call_id = call.id();
        let request = call.into_request();

        Box::pin(async move {
            let deadline = response_deadline(&request.timeouts);
            let http_request = build_request(request)?;

            let response = tokio::time::timeout(deadline, client.request(http_request))
                .await
                .map_err(|_| NetError::ConnectionTimedOut)?
                .map_err(map_client_error)?;

            let (parts, body) = response.into_parts();
            tracing::debug!(call_id, status = parts.status.as_u16(), "response headers received");

            let headers = parts
                .headers
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_string(),
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    )
                })
                .collect();

            Ok(RawResponse {
                protocol: protocol_token(parts.version),
                status: parts.status.as_u16(),
                message: parts.status.canonical_reason().unwrap_or("").to_string(),
                headers,
                body: ResponseBody::from_incoming(body),
            })
        })
    }
}

/// Time allowed for sending the request and receiving the response head.
fn response_deadline(timeouts: &Timeouts) -> Duration {
    timeouts.write.saturating_add(timeouts.read)
}

fn build_request(request: TransportRequest) -> Result<http::Request<Full<Bytes>>, NetError> {
    let uri: http::Uri = request.url.as_str().parse().map_err(|_| NetError::InvalidUrl)?;

    let mut builder = http::Request::builder()
        .method(request.verb.to_method())
        .uri(uri);
    for (name, value) in request.headers.iter() {
        builder = builder.header(name, value);
    }

    builder
        .body(Full::new(request.body.unwrap_or_default()))
        .map_err(|_| NetError::InvalidHeader)
}

/// The ALPN-style token for a negotiated version.
fn protocol_token(version: Version) -> String {
    match version {
        Version::HTTP_10 => "http/1.0".to_string(),
        Version::HTTP_11 => "http/1.1".to_string(),
        Version::HTTP_2 => "h2".to_string(),
        other => format!("{:?}", other),
    }
}

fn map_client_error(err: hyper_util::client::legacy::Error) -> NetError {
    let mut cause = std::error::Error::source(&err);
    while let Some(e) = cause {
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            if io_err.kind() == io::ErrorKind::TimedOut {
                return NetError::ConnectionTimedOut;
            }
        }
        cause = e.source();
    }

    if err.is_connect() {
        NetError::transport("connection failed", err)
    } else {
        NetError::transport("request failed", err)
    }
}
