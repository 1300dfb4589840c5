//! Method-agnostic request handed to a `TransportAdapter`.

use crate::base::neterror::NetError;
use crate::http::multipart::MultipartBody;
use crate::http::orderedheaders::OrderedHeaderMap;
use crate::http::requestbody::RequestBody;
use http::Method;
use std::time::Duration;
use url::Url;

/// A request described independently of any backend.
///
/// `headers` are the caller's own headers. `additional_headers` are merged
/// on top at dispatch and replace same-named caller headers.
#[derive(Debug, Clone)]
pub struct LogicalRequest {
    method: Method,
    url: Url,
    headers: OrderedHeaderMap,
    additional_headers: OrderedHeaderMap,
    body: Option<RequestBody>,
    timeout: Option<Duration>,
}

impl LogicalRequest {
    pub fn new<U: AsRef<str>>(method: Method, url: U) -> Result<Self, NetError> {
        let url = Url::parse(url.as_ref()).map_err(|_| NetError::InvalidUrl)?;
        Ok(Self {
            method,
            url,
            headers: OrderedHeaderMap::new(),
            additional_headers: OrderedHeaderMap::new(),
            body: None,
            timeout: None,
        })
    }

    pub fn get<U: AsRef<str>>(url: U) -> Result<Self, NetError> {
        Self::new(Method::GET, url)
    }

    pub fn post<U: AsRef<str>>(url: U) -> Result<Self, NetError> {
        Self::new(Method::POST, url)
    }

    pub fn put<U: AsRef<str>>(url: U) -> Result<Self, NetError> {
        Self::new(Method::PUT, url)
    }

    pub fn delete<U: AsRef<str>>(url: U) -> Result<Self, NetError> {
        Self::new(Method::DELETE, url)
    }

    /// Set a caller header (last writer wins).
    pub fn header(mut self, name: &str, value: &str) -> Result<Self, NetError> {
        self.headers.insert(name, value)?;
        Ok(self)
    }

    /// Set an override header, applied after caller headers at dispatch.
    pub fn additional_header(mut self, name: &str, value: &str) -> Result<Self, NetError> {
        self.additional_headers.insert(name, value)?;
        Ok(self)
    }

    /// Set the request body.
    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Use a built multipart form as the body.
    pub fn multipart(self, form: MultipartBody) -> Self {
        self.body(form.into_request_body())
    }

    /// Set JSON body.
    #[cfg(feature = "json")]
    pub fn json<T: serde::Serialize>(self, value: &T) -> Result<Self, NetError> {
        let bytes = serde_json::to_vec(value).map_err(|_| NetError::JsonParseError)?;
        Ok(self.body(RequestBody::new("application/json", bytes)))
    }

    /// Override the configured timeout for this request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &OrderedHeaderMap {
        &self.headers
    }

    pub fn additional_headers(&self) -> &OrderedHeaderMap {
        &self.additional_headers
    }

    pub fn request_body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    pub fn timeout_override(&self) -> Option<Duration> {
        self.timeout
    }

    /// Split into the parts the adapter consumes.
    pub(crate) fn into_parts(self) -> RequestParts {
        RequestParts {
            method: self.method,
            url: self.url,
            headers: self.headers,
            additional_headers: self.additional_headers,
            body: self.body,
            timeout: self.timeout,
        }
    }
}

pub(crate) struct RequestParts {
    pub method: Method,
    pub url: Url,
    pub headers: OrderedHeaderMap,
    pub additional_headers: OrderedHeaderMap,
    pub body: Option<RequestBody>,
    pub timeout: Option<Duration>,
}
