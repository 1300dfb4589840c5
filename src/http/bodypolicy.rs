//! Which verbs carry a body.
//!
//! | verb | body given | no body |
//! |---|---|---|
//! | GET, HEAD, DELETE, OPTIONS, TRACE | passed through | none |
//! | POST | passed through | empty body |
//! | PUT, PATCH | passed through | [`NetError::MissingBody`] |
//!
//! POST gets an empty body rather than none because backends commonly refuse
//! a POST call without one. PUT and PATCH are refused here, before dispatch,
//! for the same reason.

use crate::base::neterror::NetError;
use crate::http::method::Verb;
use crate::http::requestbody::RequestBody;

/// Decide the body actually sent for `verb`.
pub fn resolve_body(verb: Verb, provided: Option<RequestBody>) -> Result<Option<RequestBody>, NetError> {
    match (verb, provided) {
        (_, Some(body)) => Ok(Some(body)),
        (Verb::Post, None) => Ok(Some(RequestBody::empty())),
        (Verb::Put | Verb::Patch, None) => Err(NetError::MissingBody {
            method: verb.as_str().to_string(),
        }),
        (Verb::Get | Verb::Head | Verb::Delete | Verb::Options | Verb::Trace, None) => Ok(None),
    }
}

/// Whether `verb` must carry a body after policy resolution.
pub fn requires_body(verb: Verb) -> bool {
    matches!(verb, Verb::Post | Verb::Put | Verb::Patch)
}
