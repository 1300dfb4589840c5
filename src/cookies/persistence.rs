//! Cookie persistence - save and load cookies to/from disk.
//!
//! A [`CookieStore`] only ever sees persistent cookies; session cookies stay
//! in the [`CookieJar`](crate::cookies::jar::CookieJar).

use crate::base::neterror::NetError;
use crate::cookies::canonicalcookie::StoredCookie;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use time::OffsetDateTime;

/// Backing storage for persistent cookies.
pub trait CookieStore: Send + Sync {
    /// Load every stored cookie.
    fn load(&self) -> Result<Vec<StoredCookie>, NetError>;

    /// Replace the stored cookies with `cookies`.
    fn save(&self, cookies: &[StoredCookie]) -> Result<(), NetError>;
}

/// Cookies kept as a JSON array in a single file.
///
/// # Example
/// ```ignore
/// let store = Arc::new(JsonFileCookieStore::new("/path/to/cookies.json"));
/// let jar = CookieJar::with_store(store)?;
/// ```
#[derive(Debug, Clone)]
pub struct JsonFileCookieStore {
    path: PathBuf,
}

impl JsonFileCookieStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CookieStore for JsonFileCookieStore {
    /// A missing file is an empty store. Expired cookies are dropped.
    fn load(&self) -> Result<Vec<StoredCookie>, NetError> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(NetError::cookie_store(format!(
                    "reading {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        let cookies: Vec<StoredCookie> = serde_json::from_str(&json).map_err(|e| {
            NetError::cookie_store(format!("parsing {}: {}", self.path.display(), e))
        })?;

        let now = OffsetDateTime::now_utc().unix_timestamp();
        Ok(cookies
            .into_iter()
            .filter(|c| c.expires_unix_secs.map_or(true, |exp| exp > now))
            .collect())
    }

    fn save(&self, cookies: &[StoredCookie]) -> Result<(), NetError> {
        let json = serde_json::to_string_pretty(cookies)
            .map_err(|e| NetError::cookie_store(e.to_string()))?;
        fs::write(&self.path, json).map_err(|e| {
            NetError::cookie_store(format!("writing {}: {}", self.path.display(), e))
        })
    }
}

/// Store that keeps cookies in memory, for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryCookieStore {
    cookies: Mutex<Vec<StoredCookie>>,
}

impl MemoryCookieStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CookieStore for MemoryCookieStore {
    fn load(&self) -> Result<Vec<StoredCookie>, NetError> {
        Ok(self
            .cookies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, cookies: &[StoredCookie]) -> Result<(), NetError> {
        *self.cookies.lock().unwrap_or_else(PoisonError::into_inner) = cookies.to_vec();
        Ok(())
    }
}
