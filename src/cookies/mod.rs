//! Cookie jar and persistence.
//!
//! - [`CookieJar`](jar::CookieJar): domain-keyed in-memory jar, consulted by
//!   the adapter for the `Cookie` header and fed from `Set-Cookie`
//! - [`CookieStore`](persistence::CookieStore): load/save of persistent
//!   cookies, with JSON file and in-memory implementations

pub mod canonicalcookie;
pub mod jar;
pub mod persistence;

pub use canonicalcookie::{CanonicalCookie, StoredCookie};
pub use jar::CookieJar;
pub use persistence::{CookieStore, JsonFileCookieStore, MemoryCookieStore};
