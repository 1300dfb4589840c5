use crate::base::neterror::NetError;
use http::header::{HeaderName, HeaderValue};
use http::HeaderMap;
use std::str::FromStr;

/// Request headers in insertion order.
///
/// Names compare case-insensitively; setting a name that is already present
/// replaces its value in place, so a name never appears twice.
#[derive(Debug, Clone, Default)]
pub struct OrderedHeaderMap {
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl OrderedHeaderMap {
    pub fn new() -> Self {
        Self {
            headers: Vec::new(),
        }
    }

    /// Set a header, replacing any existing value under the same name.
    pub fn insert(&mut self, name: &str, value: &str) -> Result<(), NetError> {
        let name = HeaderName::from_str(name).map_err(|_| NetError::InvalidHeader)?;
        let value = HeaderValue::from_str(value).map_err(|_| NetError::InvalidHeader)?;
        self.insert_typed(name, value);
        Ok(())
    }

    /// Set an already-validated header.
    pub fn insert_typed(&mut self, name: HeaderName, value: HeaderValue) {
        // HeaderName is lowercase, so equality is a case-insensitive match.
        match self.headers.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = value,
            None => self.headers.push((name, value)),
        }
    }

    /// Overlay `other` onto `self`; same-named headers take `other`'s value.
    pub fn merge(&mut self, other: &OrderedHeaderMap) {
        for (name, value) in &other.headers {
            self.insert_typed(name.clone(), value.clone());
        }
    }

    pub fn remove(&mut self, name: &str) {
        if let Ok(target) = HeaderName::from_str(name) {
            self.headers.retain(|(n, _)| *n != target);
        }
    }

    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        let target = HeaderName::from_str(name).ok()?;
        self.headers
            .iter()
            .find(|(n, _)| *n == target)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &HeaderValue)> {
        self.headers.iter().map(|(n, v)| (n, v))
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Consumes the map and returns a standard http::HeaderMap.
    pub fn to_header_map(self) -> HeaderMap {
        let mut map = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in self.headers {
            map.append(name, value);
        }
        map
    }
}

impl<'a> TryFrom<&[(&'a str, &'a str)]> for OrderedHeaderMap {
    type Error = NetError;

    fn try_from(pairs: &[(&'a str, &'a str)]) -> Result<Self, Self::Error> {
        let mut headers = OrderedHeaderMap::new();
        for (name, value) in pairs {
            headers.insert(name, value)?;
        }
        Ok(headers)
    }
}
