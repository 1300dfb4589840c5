use crate::base::neterror::NetError;
use crate::cookies::canonicalcookie::{CanonicalCookie, StoredCookie};
use crate::cookies::persistence::CookieStore;
use dashmap::DashMap;
use std::sync::Arc;
use time::OffsetDateTime;
use url::Url;

/// Maximum cookies per domain.
const MAX_COOKIES_PER_DOMAIN: usize = 50;

/// In-memory cookie jar consulted by the adapter on every request.
///
/// Cookies are keyed by domain. An attached [`CookieStore`] is loaded on
/// construction and receives the persistent cookies on [`CookieJar::flush`].
pub struct CookieJar {
    store: DashMap<String, Vec<CanonicalCookie>>,
    backing: Option<Arc<dyn CookieStore>>,
}

impl Default for CookieJar {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CookieJar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieJar")
            .field("cookies", &self.len())
            .field("persistent", &self.backing.is_some())
            .finish()
    }
}

impl CookieJar {
    pub fn new() -> Self {
        Self {
            store: DashMap::new(),
            backing: None,
        }
    }

    /// Create a jar seeded from `backing`. Expired cookies are skipped.
    pub fn with_store(backing: Arc<dyn CookieStore>) -> Result<Self, NetError> {
        let jar = Self {
            store: DashMap::new(),
            backing: Some(backing.clone()),
        };
        let now = OffsetDateTime::now_utc();
        let mut loaded = 0;
        for stored in backing.load()? {
            let cookie = stored.into_canonical(now);
            if !cookie.is_expired(now) {
                jar.insert(cookie);
                loaded += 1;
            }
        }
        tracing::debug!(loaded, "cookie jar loaded");
        Ok(jar)
    }

    /// Add or replace a cookie (same name, domain and path).
    pub fn insert(&self, cookie: CanonicalCookie) {
        let mut entry = self.store.entry(cookie.domain.clone()).or_default();
        entry.retain(|c| c.name != cookie.name || c.path != cookie.path);

        while entry.len() >= MAX_COOKIES_PER_DOMAIN {
            let Some(oldest) = entry
                .iter()
                .enumerate()
                .min_by_key(|(_, c)| c.creation_time)
                .map(|(i, _)| i)
            else {
                break;
            };
            entry.remove(oldest);
        }

        entry.push(cookie);
    }

    /// Store every `Set-Cookie` value received from `url`.
    ///
    /// A cookie that arrives already expired deletes any stored cookie of
    /// the same name, domain and path.
    pub fn store_response_cookies<'a, I>(&self, url: &Url, lines: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let now = OffsetDateTime::now_utc();
        for line in lines {
            match CanonicalCookie::from_set_cookie(url, line, now) {
                Some(cookie) if cookie.is_expired(now) => self.remove(&cookie),
                Some(cookie) => self.insert(cookie),
                None => tracing::debug!(url = %url, "ignoring unusable Set-Cookie"),
            }
        }
    }

    /// Cookies to send to `url`, longest path first.
    pub fn cookies_for_url(&self, url: &Url) -> Vec<CanonicalCookie> {
        let Some(host) = url.host_str() else {
            return Vec::new();
        };
        let now = OffsetDateTime::now_utc();

        let mut result: Vec<CanonicalCookie> = candidate_domains(host)
            .iter()
            .filter_map(|domain| self.store.get(domain))
            .flat_map(|entry| {
                entry
                    .iter()
                    .filter(|c| !c.is_expired(now) && c.matches_url(url))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();

        result.sort_by(|a, b| {
            b.path
                .len()
                .cmp(&a.path.len())
                .then_with(|| a.creation_time.cmp(&b.creation_time))
        });
        result
    }

    /// `Cookie` header value for `url`, or `None` if nothing matches.
    pub fn cookie_header(&self, url: &Url) -> Option<String> {
        let cookies = self.cookies_for_url(url);
        if cookies.is_empty() {
            return None;
        }
        Some(
            cookies
                .iter()
                .map(|c| format!("{}={}", c.name, c.value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    pub fn remove(&self, cookie: &CanonicalCookie) {
        if let Some(mut entry) = self.store.get_mut(&cookie.domain) {
            entry.retain(|c| c.name != cookie.name || c.path != cookie.path);
        }
    }

    pub fn len(&self) -> usize {
        self.store.iter().map(|e| e.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.store.clear();
    }

    /// Persistent, unexpired cookies in their stored form.
    pub fn persistent_cookies(&self) -> Vec<StoredCookie> {
        let now = OffsetDateTime::now_utc();
        self.store
            .iter()
            .flat_map(|entry| {
                entry
                    .value()
                    .iter()
                    .filter(|c| c.is_persistent() && !c.is_expired(now))
                    .map(StoredCookie::from)
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Write persistent cookies to the attached store, if any.
    pub fn flush(&self) -> Result<(), NetError> {
        let Some(backing) = &self.backing else {
            return Ok(());
        };
        let cookies = self.persistent_cookies();
        tracing::debug!(count = cookies.len(), "flushing cookies");
        backing.save(&cookies)
    }
}

/// The host and each parent domain, e.g. `a.b.example.com`, `b.example.com`,
/// `example.com`.
fn candidate_domains(host: &str) -> Vec<String> {
    let host = host.to_ascii_lowercase();
    let mut domains = vec![host.clone()];
    let parts: Vec<&str> = host.split('.').collect();
    for i in 1..parts.len().saturating_sub(1) {
        domains.push(parts[i..].join("."));
    }
    domains
}
