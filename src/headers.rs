//! Insertion-ordered response header collection.

use http::header::{self, HeaderName, HeaderValue};

/// Response headers.
///
/// Lookup is case-insensitive (names are normalized [`HeaderName`]s) and
/// iteration yields entries in first-insertion order, which is also the order
/// they reach the wire. Each name maps to a single value; inserting an
/// existing name replaces the value without moving the entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderMap {
    inner: Vec<(HeaderName, HeaderValue)>,
}

impl HeaderMap {
    pub fn new() -> HeaderMap {
        HeaderMap { inner: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> HeaderMap {
        HeaderMap {
            inner: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn contains_key(&self, name: impl AsRef<str>) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: impl AsRef<str>) -> Option<&HeaderValue> {
        let name = name.as_ref();
        self.inner
            .iter()
            .find(|(n, _)| n.as_str().eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// Insert a header, replacing an existing value in place.
    pub fn insert(&mut self, name: HeaderName, value: HeaderValue) {
        match self.inner.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.inner.push((name, value)),
        }
    }

    pub fn remove(&mut self, name: impl AsRef<str>) -> Option<HeaderValue> {
        let name = name.as_ref();
        let idx = self
            .inner
            .iter()
            .position(|(n, _)| n.as_str().eq_ignore_ascii_case(name))?;
        Some(self.inner.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &HeaderValue)> {
        self.inner.iter().map(|(n, v)| (n, v))
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }
}

/// Names owned by the engine or the entity layer; rejected on user inserts.
pub(crate) fn is_reserved(name: &HeaderName) -> bool {
    *name == header::SET_COOKIE
        || *name == header::CONTENT_LENGTH
        || *name == header::TRANSFER_ENCODING
        || *name == header::CONTENT_TYPE
        || *name == header::CONTENT_ENCODING
        || *name == header::ETAG
        || *name == header::LAST_MODIFIED
        || *name == header::EXPIRES
}
