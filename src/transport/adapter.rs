//! Maps logical requests onto a backend and normalizes what comes back.

use super::{HttpTransport, MakeTransport, RawResponse, TransportRequest};
use crate::base::loadstate::LoadState;
use crate::base::neterror::NetError;
use crate::config::TransportConfig;
use crate::cookies::jar::CookieJar;
use crate::http::bodypolicy::resolve_body;
use crate::http::method::Verb;
use crate::http::request::LogicalRequest;
use crate::http::response::{ProtocolVersion, TransportResponse};
use crate::transport::hyperclient::HyperTransport;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE, COOKIE, SET_COOKIE, USER_AGENT};
use http::HeaderMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Executes [`LogicalRequest`]s through a lazily built backend.
///
/// The backend factory runs at most once, on the first request, even when
/// many tasks issue their first request concurrently. The adapter never
/// retries; see [`crate::http::retry::send_with_retry`].
pub struct TransportAdapter {
    config: TransportConfig,
    factory: Box<dyn MakeTransport>,
    backend: OnceCell<Arc<dyn HttpTransport>>,
    cookie_jar: Option<Arc<CookieJar>>,
}

impl std::fmt::Debug for TransportAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportAdapter")
            .field("config", &self.config)
            .field("backend_ready", &self.backend.initialized())
            .field("cookie_jar", &self.cookie_jar.is_some())
            .finish()
    }
}

impl TransportAdapter {
    pub fn new(config: TransportConfig, factory: impl MakeTransport + 'static) -> Self {
        Self {
            config,
            factory: Box::new(factory),
            backend: OnceCell::new(),
            cookie_jar: None,
        }
    }

    /// Adapter over the hyper-util client.
    pub fn with_hyper(config: TransportConfig) -> Self {
        Self::new(config, |config: &TransportConfig| -> Result<Arc<dyn HttpTransport>, NetError> {
            Ok(Arc::new(HyperTransport::new(config)))
        })
    }

    /// Adapter over an already constructed backend.
    pub fn with_backend(config: TransportConfig, backend: Arc<dyn HttpTransport>) -> Self {
        Self::new(config, move |_: &TransportConfig| -> Result<Arc<dyn HttpTransport>, NetError> {
            Ok(backend.clone())
        })
    }

    /// Send and receive cookies through `jar`.
    pub fn cookie_jar(mut self, jar: Arc<CookieJar>) -> Self {
        self.cookie_jar = Some(jar);
        self
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Whether the backend has been constructed.
    pub fn is_backend_ready(&self) -> bool {
        self.backend.initialized()
    }

    /// The shared backend, built on first use.
    pub async fn backend(&self) -> Result<Arc<dyn HttpTransport>, NetError> {
        self.backend
            .get_or_try_init(|| async {
                let backend = self.factory.make_transport(&self.config)?;
                tracing::debug!("transport backend constructed");
                Ok(backend)
            })
            .await
            .cloned()
    }

    /// Assemble the backend request without dispatching it.
    ///
    /// Every error this can produce is raised before a backend sees the
    /// request: unsupported methods, body policy violations, invalid headers
    /// and body serialization failures.
    pub fn prepare(&self, request: LogicalRequest) -> Result<TransportRequest, NetError> {
        let mut state = LoadState::Idle;
        let result = self.prepare_tracked(request, &mut state);
        if result.is_err() {
            advance(&mut state, LoadState::Failed);
        }
        result
    }

    /// Execute `request` and normalize the response.
    pub async fn execute(&self, request: LogicalRequest) -> Result<TransportResponse, NetError> {
        let url = request.url().clone();
        let method = request.method().clone();
        let mut state = LoadState::Idle;

        match self.execute_tracked(request, &mut state).await {
            Ok(response) => {
                advance(&mut state, LoadState::Done);
                tracing::debug!(
                    method = %method,
                    url = %url,
                    status = response.status_code(),
                    protocol = %response.protocol_version(),
                    "request complete"
                );
                Ok(response)
            }
            Err(e) => {
                tracing::warn!(
                    method = %method,
                    url = %url,
                    state = ?state,
                    code = e.as_i32(),
                    error = %e,
                    "request failed"
                );
                advance(&mut state, LoadState::Failed);
                Err(e)
            }
        }
    }

    /// Like [`execute`](Self::execute), abandoning the request if `token`
    /// is cancelled first.
    pub async fn execute_with_cancel(
        &self,
        request: LogicalRequest,
        token: &CancellationToken,
    ) -> Result<TransportResponse, NetError> {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::debug!("request cancelled");
                Err(NetError::Cancelled)
            }
            result = self.execute(request) => result,
        }
    }

    async fn execute_tracked(
        &self,
        request: LogicalRequest,
        state: &mut LoadState,
    ) -> Result<TransportResponse, NetError> {
        let transport_request = self.prepare_tracked(request, state)?;
        let url = transport_request.url.clone();

        let backend = self.backend().await?;
        let call = backend.new_call(transport_request)?;
        tracing::debug!(call_id = call.id(), verb = %call.request().verb, url = %url, "dispatching");
        advance(state, LoadState::Dispatched);

        let raw = backend.execute_call(call).await?;
        let response = self.normalize(&url, raw)?;
        advance(state, LoadState::ResponseNormalized);
        Ok(response)
    }

    fn prepare_tracked(
        &self,
        request: LogicalRequest,
        state: &mut LoadState,
    ) -> Result<TransportRequest, NetError> {
        let parts = request.into_parts();
        let verb = Verb::try_from(&parts.method)?;

        let mut headers = parts.headers;
        headers.merge(&parts.additional_headers);
        if !headers.contains(USER_AGENT.as_str()) {
            if let Some(user_agent) = &self.config.user_agent {
                headers.insert(USER_AGENT.as_str(), user_agent)?;
            }
        }
        if let Some(jar) = &self.cookie_jar {
            if !headers.contains(COOKIE.as_str()) {
                if let Some(cookies) = jar.cookie_header(&parts.url) {
                    headers.insert(COOKIE.as_str(), &cookies)?;
                }
            }
        }
        advance(state, LoadState::HeadersAssembled);

        let body = match resolve_body(verb, parts.body)? {
            Some(body) => {
                let bytes = body.materialize()?;
                if let Some(content_type) = body.content_type() {
                    headers.insert(CONTENT_TYPE.as_str(), content_type)?;
                }
                Some(bytes)
            }
            None => None,
        };
        advance(state, LoadState::BodyResolved);

        Ok(TransportRequest {
            verb,
            url: parts.url,
            headers,
            body,
            timeouts: self.config.timeouts().with_request_timeout(parts.timeout),
        })
    }

    fn normalize(&self, url: &Url, raw: RawResponse) -> Result<TransportResponse, NetError> {
        let protocol_version = ProtocolVersion::from_token(&raw.protocol)?;

        let mut headers = HeaderMap::with_capacity(raw.headers.len());
        for (name, value) in &raw.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| NetError::InvalidHeader)?;
            let value = HeaderValue::from_str(value).map_err(|_| NetError::InvalidHeader)?;
            headers.append(name, value);
        }

        if let Some(jar) = &self.cookie_jar {
            jar.store_response_cookies(
                url,
                headers.get_all(SET_COOKIE).iter().filter_map(|v| v.to_str().ok()),
            );
        }

        Ok(TransportResponse::new(
            raw.status,
            raw.message,
            protocol_version,
            headers,
            raw.body,
            self.config.default_charset.clone(),
        ))
    }
}

fn advance(state: &mut LoadState, next: LoadState) {
    tracing::trace!(from = ?state, to = ?next, "load state");
    *state = next;
}
