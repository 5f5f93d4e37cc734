//! Buffered HTTP response handed back by a transport.

use bytes::Bytes;
use http::{HeaderMap, StatusCode};

/// HTTP response with its body already read.
///
/// Answers from the DNS service are tiny, so the body is always
/// collected before the transport returns.
#[derive(Debug, Clone)]
pub struct HttpAnswer {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    from_cache: bool,
}

impl HttpAnswer {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
            from_cache: false,
        }
    }

    /// Mark this answer as served from the local cache.
    pub fn cached(mut self) -> Self {
        self.from_cache = true;
        self
    }

    /// Get the status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Get a reference to the headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get the raw body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// True if no network round trip was made for this answer.
    pub fn from_cache(&self) -> bool {
        self.from_cache
    }
}
