use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, PrimitiveDateTime};
use url::Url;

/// A single cookie as held by the jar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub creation_time: OffsetDateTime,
    /// `None` for session cookies.
    pub expiration_time: Option<OffsetDateTime>,
    pub secure: bool,
    pub http_only: bool,
    pub host_only: bool,
}

impl CanonicalCookie {
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        domain: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: path.into(),
            creation_time: OffsetDateTime::now_utc(),
            expiration_time: None,
            secure: false,
            http_only: false,
            host_only: true,
        }
    }

    /// Parse a `Set-Cookie` value received from `url`.
    ///
    /// Returns `None` for unparseable lines and for a Domain attribute that
    /// does not domain-match the request host.
    pub fn from_set_cookie(url: &Url, line: &str, now: OffsetDateTime) -> Option<Self> {
        let parsed = cookie::Cookie::parse(line).ok()?;
        let host = url.host_str()?.to_ascii_lowercase();

        let (domain, host_only) = match parsed.domain() {
            Some(d) => {
                let d = d.trim_start_matches('.').to_ascii_lowercase();
                if d.is_empty() || !domain_matches(&d, &host, false) {
                    return None;
                }
                (d, false)
            }
            None => (host, true),
        };

        let path = match parsed.path() {
            Some(p) if p.starts_with('/') => p.to_string(),
            _ => default_path(url),
        };

        // Max-Age wins over Expires (RFC 6265 5.3 step 3).
        let expiration_time = match parsed.max_age() {
            Some(age) => Some(
                now.checked_add(age)
                    .unwrap_or_else(|| PrimitiveDateTime::MAX.assume_utc()),
            ),
            None => parsed.expires_datetime(),
        };

        Some(Self {
            name: parsed.name().to_string(),
            value: parsed.value().to_string(),
            domain,
            path,
            creation_time: now,
            expiration_time,
            secure: parsed.secure().unwrap_or(false),
            http_only: parsed.http_only().unwrap_or(false),
            host_only,
        })
    }

    pub fn is_expired(&self, current_time: OffsetDateTime) -> bool {
        self.expiration_time
            .is_some_and(|expiry| expiry <= current_time)
    }

    /// Session cookies die with the jar and are never persisted.
    pub fn is_persistent(&self) -> bool {
        self.expiration_time.is_some()
    }

    /// Whether this cookie should be sent with a request to `url`.
    pub fn matches_url(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        domain_matches(&self.domain, host, self.host_only)
            && path_matches(&self.path, url.path())
            && (!self.secure || url.scheme() == "https")
    }
}

/// Serializable form used by cookie stores.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    pub host_only: bool,
    pub expires_unix_secs: Option<i64>,
}

impl From<&CanonicalCookie> for StoredCookie {
    fn from(cookie: &CanonicalCookie) -> Self {
        Self {
            name: cookie.name.clone(),
            value: cookie.value.clone(),
            domain: cookie.domain.clone(),
            path: cookie.path.clone(),
            secure: cookie.secure,
            http_only: cookie.http_only,
            host_only: cookie.host_only,
            expires_unix_secs: cookie.expiration_time.map(|t| t.unix_timestamp()),
        }
    }
}

impl StoredCookie {
    /// Restore into a jar cookie created at `now`.
    pub fn into_canonical(self, now: OffsetDateTime) -> CanonicalCookie {
        CanonicalCookie {
            name: self.name,
            value: self.value,
            domain: self.domain,
            path: self.path,
            creation_time: now,
            expiration_time: self
                .expires_unix_secs
                .and_then(|s| OffsetDateTime::from_unix_timestamp(s).ok()),
            secure: self.secure,
            http_only: self.http_only,
            host_only: self.host_only,
        }
    }
}

/// RFC 6265 domain matching.
pub(crate) fn domain_matches(cookie_domain: &str, request_host: &str, host_only: bool) -> bool {
    if host_only {
        return cookie_domain.eq_ignore_ascii_case(request_host);
    }

    let cookie_domain = cookie_domain.trim_start_matches('.');
    if request_host.eq_ignore_ascii_case(cookie_domain) {
        return true;
    }

    request_host.len() > cookie_domain.len()
        && request_host.as_bytes()[request_host.len() - cookie_domain.len() - 1] == b'.'
        && request_host[request_host.len() - cookie_domain.len()..]
            .eq_ignore_ascii_case(cookie_domain)
}

/// RFC 6265 path matching.
pub(crate) fn path_matches(cookie_path: &str, request_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/') || request_path.as_bytes().get(cookie_path.len()) == Some(&b'/'))
}

/// Directory of the request path (RFC 6265 5.1.4).
fn default_path(url: &Url) -> String {
    let path = url.path();
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
    }
}
