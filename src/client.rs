//! HTTP client used for DNS-over-HTTP lookups.
//!
//! # Example
//!
//! ```rust,ignore
//! use httpdns::client::HttpDnsClient;
//!
//! let client = HttpDnsClient::builder()
//!     .cache_dir("/data/app/cache/httpdns")
//!     .build();
//!
//! let answer = client.get(&url).await?;
//! ```

use crate::base::context::with_deadline;
use crate::base::neterror::NetError;
use crate::config::HttpDnsConfig;
use crate::http::responsebody::ResponseBody;
use crate::http::streamfactory::HttpStreamFactory;
use crate::http::{DnsTransport, Fetching, FreshnessOverride, HttpAnswer, HttpCache};
use bytes::Bytes;
use http::{header, Method, Request};
use http_body_util::Empty;
use std::path::PathBuf;
use std::time::Duration;
use url::{Position, Url};

/// HTTP client with an on-disk response cache.
///
/// Use [`HttpDnsClient::builder()`] to configure and create a client.
pub struct HttpDnsClient {
    factory: HttpStreamFactory,
    cache: Option<HttpCache>,
    rewrite: FreshnessOverride,
    read_timeout: Duration,
    max_body_bytes: usize,
}

impl HttpDnsClient {
    /// Create a new client builder.
    pub fn builder() -> HttpDnsClientBuilder {
        HttpDnsClientBuilder::default()
    }

    /// Build a client from resolver configuration.
    pub fn from_config(config: &HttpDnsConfig) -> Self {
        let mut builder = Self::builder()
            .cache_max_bytes(config.cache_max_bytes)
            .forced_max_age(config.forced_max_age_duration())
            .connect_timeout(config.connect_timeout_duration())
            .read_timeout(config.read_timeout_duration())
            .max_body_bytes(config.max_body_bytes);
        if let Some(path) = config.cache_path() {
            builder = builder.cache_dir(path);
        }
        builder.build()
    }

    /// The response cache, if one could be opened.
    pub fn cache(&self) -> Option<&HttpCache> {
        self.cache.as_ref()
    }

    /// GET `url`, answering from cache while the stored response is fresh.
    pub async fn get(&self, url: &Url) -> Result<HttpAnswer, NetError> {
        if let Some(entry) = self.cache.as_ref().and_then(|c| c.get(url, "GET")) {
            tracing::trace!(url = %url, "answered from cache");
            return Ok(HttpAnswer::new(entry.status, entry.headers, entry.body).cached());
        }

        let answer = self.fetch_network(url).await?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.store(
                url,
                "GET",
                answer.status(),
                answer.headers(),
                answer.body().clone(),
            ) {
                tracing::warn!(url = %url, error = %e, "failed to cache response");
            }
        }
        Ok(answer)
    }

    async fn fetch_network(&self, url: &Url) -> Result<HttpAnswer, NetError> {
        let mut stream = self.factory.request_stream(url).await?;

        let host = url.host_str().ok_or(NetError::InvalidUrl)?;
        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let req = Request::builder()
            .method(Method::GET)
            .uri(&url[Position::BeforePath..])
            .header(header::HOST, authority)
            .body(Empty::<Bytes>::new())
            .map_err(|_| NetError::InvalidUrl)?;

        with_deadline(self.read_timeout, NetError::TimedOut, async {
            let resp = stream.send_request(req).await?;
            let (mut parts, body) = resp.into_parts();
            let body = ResponseBody::new(body)
                .bytes_limited(self.max_body_bytes)
                .await?;

            self.rewrite.apply(&mut parts.headers);
            tracing::debug!(url = %url, status = %parts.status, len = body.len(), "fetched");
            Ok(HttpAnswer::new(parts.status, parts.headers, body))
        })
        .await
    }
}

impl DnsTransport for HttpDnsClient {
    fn fetch<'a>(&'a self, url: &'a Url) -> Fetching<'a> {
        Box::pin(self.get(url))
    }
}

/// Builder for creating an [`HttpDnsClient`].
pub struct HttpDnsClientBuilder {
    cache_dir: Option<PathBuf>,
    cache_max_bytes: usize,
    forced_max_age: Duration,
    connect_timeout: Duration,
    read_timeout: Duration,
    max_body_bytes: usize,
}

impl Default for HttpDnsClientBuilder {
    fn default() -> Self {
        let defaults = HttpDnsConfig::default();
        Self {
            cache_dir: None,
            cache_max_bytes: defaults.cache_max_bytes,
            forced_max_age: defaults.forced_max_age_duration(),
            connect_timeout: defaults.connect_timeout_duration(),
            read_timeout: defaults.read_timeout_duration(),
            max_body_bytes: defaults.max_body_bytes,
        }
    }
}

impl HttpDnsClientBuilder {
    /// Directory the cache files are written to. Without one, nothing is cached.
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Set cache byte budget.
    pub fn cache_max_bytes(mut self, bytes: usize) -> Self {
        self.cache_max_bytes = bytes;
        self
    }

    /// Set the freshness stamped on every network response.
    pub fn forced_max_age(mut self, max_age: Duration) -> Self {
        self.forced_max_age = max_age;
        self
    }

    /// Set connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set timeout for the request/response exchange.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the largest accepted response body.
    pub fn max_body_bytes(mut self, bytes: usize) -> Self {
        self.max_body_bytes = bytes;
        self
    }

    /// Build the client.
    ///
    /// A cache directory that cannot be opened is logged and the client
    /// runs uncached.
    pub fn build(self) -> HttpDnsClient {
        let cache = self.cache_dir.and_then(|dir| {
            HttpCache::open(&dir, self.cache_max_bytes)
                .map_err(|e| {
                    tracing::warn!(
                        dir = %dir.display(),
                        error = %e,
                        "response cache unavailable, continuing without it"
                    );
                })
                .ok()
        });

        HttpDnsClient {
            factory: HttpStreamFactory::new(self.connect_timeout),
            cache,
            rewrite: FreshnessOverride::new(self.forced_max_age),
            read_timeout: self.read_timeout,
            max_body_bytes: self.max_body_bytes,
        }
    }
}
