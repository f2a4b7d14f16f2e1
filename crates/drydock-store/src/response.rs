//! Cached response representation

use bytes::Bytes;

/// A stored response: status line, headers, and body.
///
/// This is the unit of exchange between the network transport and the cache
/// store. The body is held as [`Bytes`] so clones between the serving path
/// and a background store write are cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl CachedResponse {
    /// Build a response with a body and no headers
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Whether this response may be written into the cache store.
    ///
    /// Only success-class statuses are stored; error and redirect responses
    /// are returned to the caller but never cached.
    pub fn is_cacheable(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Look up a header value, case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The Content-Type header, if present
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}
