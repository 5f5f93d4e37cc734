//! Freshness override for network responses.
//!
//! The DNS service sends no useful caching headers, so every response that
//! comes off the wire is restamped with a fixed `max-age` before it reaches
//! the cache. Repeat lookups inside that window never leave the process.

use http::header::CACHE_CONTROL;
use http::{HeaderMap, HeaderValue};
use std::time::Duration;

/// Replaces `Cache-Control` on network responses with a fixed `max-age`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessOverride {
    max_age: Duration,
}

impl Default for FreshnessOverride {
    fn default() -> Self {
        Self::new(Duration::from_secs(7200))
    }
}

impl FreshnessOverride {
    pub fn new(max_age: Duration) -> Self {
        Self { max_age }
    }

    /// Rewrite `headers` in place; whatever the server sent is discarded.
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.remove(CACHE_CONTROL);
        let directive = format!("max-age={}", self.max_age.as_secs());
        if let Ok(value) = HeaderValue::try_from(directive) {
            headers.insert(CACHE_CONTROL, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replaces_upstream_directives() {
        let mut headers = HeaderMap::new();
        headers.append(CACHE_CONTROL, HeaderValue::from_static("no-store"));
        headers.append(CACHE_CONTROL, HeaderValue::from_static("private"));

        FreshnessOverride::default().apply(&mut headers);

        let values: Vec<_> = headers.get_all(CACHE_CONTROL).iter().collect();
        assert_eq!(values, vec![HeaderValue::from_static("max-age=7200")]);
    }

    #[test]
    fn test_adds_header_when_missing() {
        let mut headers = HeaderMap::new();
        FreshnessOverride::new(Duration::from_secs(60)).apply(&mut headers);
        assert_eq!(headers.get(CACHE_CONTROL).unwrap(), "max-age=60");
    }
}
