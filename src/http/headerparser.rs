//! Response header interpretation: charset and cacheability.
//!
//! Both are pure functions of the response headers (and, for caching, the
//! current time) so callers can decide how to decode and whether to cache
//! without touching the body.

use crate::base::neterror::NetError;
use http::header::{CACHE_CONTROL, CONTENT_TYPE, DATE, ETAG, EXPIRES, LAST_MODIFIED};
use http::HeaderMap;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Duration, OffsetDateTime, PrimitiveDateTime};

/// Charset assumed when a response does not declare one.
pub const DEFAULT_CHARSET: &str = "ISO-8859-1";

/// Freshness lifetimes are clamped to a century.
const MAX_LIFETIME_SECS: u64 = 100 * 365 * 24 * 60 * 60;

const IMF_FIXDATE: &[BorrowedFormatItem<'static>] = format_description!(
    "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
);

/// Cache metadata extracted from a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheHeaders {
    pub etag: Option<String>,
    pub server_date: Option<OffsetDateTime>,
    pub last_modified: Option<OffsetDateTime>,
    /// Until this instant the entry can be served without revalidation.
    pub soft_expires: OffsetDateTime,
    /// After this instant the entry must not be served at all.
    pub hard_expires: OffsetDateTime,
}

impl CacheHeaders {
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.hard_expires < now
    }

    pub fn needs_refresh(&self, now: OffsetDateTime) -> bool {
        self.soft_expires < now
    }
}

/// Parsed Cache-Control directives.
#[derive(Debug, Default, PartialEq, Eq)]
struct CacheControl {
    no_store: bool,
    no_cache: bool,
    must_revalidate: bool,
    max_age: Option<u64>,
    stale_while_revalidate: Option<u64>,
}

/// The charset declared in Content-Type, or `default`.
pub fn parse_charset(headers: &HeaderMap, default: &str) -> String {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| {
            ct.split(';').skip(1).find_map(|param| {
                let (key, value) = param.split_once('=')?;
                key.trim()
                    .eq_ignore_ascii_case("charset")
                    .then(|| value.trim().trim_matches('"').to_string())
            })
        })
        .filter(|charset| !charset.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Decode `bytes` in `charset`.
///
/// Supports UTF-8, US-ASCII and ISO-8859-1. Any other charset is an error
/// rather than a silent fallback.
pub fn decode_text(bytes: &[u8], charset: &str) -> Result<String, NetError> {
    match charset.to_ascii_lowercase().as_str() {
        "utf-8" | "utf8" => String::from_utf8(bytes.to_vec()).map_err(|_| NetError::InvalidUtf8),
        "iso-8859-1" | "iso8859-1" | "latin1" | "l1" => Ok(bytes.iter().map(|&b| b as char).collect()),
        "us-ascii" | "ascii" => Ok(bytes
            .iter()
            .map(|&b| if b.is_ascii() { b as char } else { char::REPLACEMENT_CHARACTER })
            .collect()),
        _ => Err(NetError::UnsupportedCharset {
            charset: charset.to_string(),
        }),
    }
}

/// Compute cache metadata, or `None` when the response must not be cached.
pub fn parse_cache_headers(headers: &HeaderMap, now: OffsetDateTime) -> Option<CacheHeaders> {
    let server_date = header_str(headers, DATE).and_then(parse_http_date);
    let last_modified = header_str(headers, LAST_MODIFIED).and_then(parse_http_date);
    let expires = header_str(headers, EXPIRES).and_then(parse_http_date);
    let etag = header_str(headers, ETAG).map(str::to_string);

    let (soft_expires, hard_expires) = if headers.contains_key(CACHE_CONTROL) {
        let cc = parse_cache_control(headers);
        if cc.no_cache || cc.no_store {
            return None;
        }
        let soft = after(now, cc.max_age.unwrap_or(0));
        let hard = if cc.must_revalidate {
            soft
        } else {
            after(soft, cc.stale_while_revalidate.unwrap_or(0))
        };
        (soft, hard)
    } else {
        match (server_date, expires) {
            (Some(date), Some(expires)) if expires >= date => {
                let lifetime = (expires - date).whole_seconds().max(0) as u64;
                let soft = after(now, lifetime);
                (soft, soft)
            }
            _ => (now, now),
        }
    };

    Some(CacheHeaders {
        etag,
        server_date,
        last_modified,
        soft_expires,
        hard_expires,
    })
}

/// Parse an RFC 7231 IMF-fixdate such as `Sun, 06 Nov 1994 08:49:37 GMT`.
pub fn parse_http_date(value: &str) -> Option<OffsetDateTime> {
    PrimitiveDateTime::parse(value.trim(), IMF_FIXDATE)
        .ok()
        .map(PrimitiveDateTime::assume_utc)
}

fn parse_cache_control(headers: &HeaderMap) -> CacheControl {
    let mut cc = CacheControl::default();

    for value in headers.get_all(CACHE_CONTROL) {
        let Ok(value) = value.to_str() else {
            continue;
        };
        for directive in value.split(',') {
            let directive = directive.trim().to_ascii_lowercase();

            if directive == "no-store" {
                cc.no_store = true;
            } else if directive == "no-cache" {
                cc.no_cache = true;
            } else if directive == "must-revalidate" || directive == "proxy-revalidate" {
                cc.must_revalidate = true;
            } else if let Some(age) = directive.strip_prefix("max-age=") {
                cc.max_age = age.parse().ok();
            } else if let Some(age) = directive.strip_prefix("stale-while-revalidate=") {
                cc.stale_while_revalidate = age.parse().ok();
            }
        }
    }

    cc
}

fn header_str(headers: &HeaderMap, name: http::header::HeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn seconds(secs: u64) -> Duration {
    Duration::seconds(secs.min(MAX_LIFETIME_SECS) as i64)
}

/// `base` plus a clamped lifetime, saturating at the latest representable time.
fn after(base: OffsetDateTime, secs: u64) -> OffsetDateTime {
    base.checked_add(seconds(secs))
        .unwrap_or_else(|| PrimitiveDateTime::MAX.assume_utc())
}
