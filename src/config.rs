//! Resolver configuration.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Name of the cache subdirectory created under `cache_dir`.
pub const CACHE_SUBDIR: &str = "httpdns";

/// HTTP DNS resolver configuration.
///
/// Every field has a default, so a config file only needs to name what it
/// changes:
///
/// ```rust,ignore
/// let config = HttpDnsConfig::from_json(r#"{ "cache_dir": "/var/cache/app" }"#)?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpDnsConfig {
    /// DNS service authority, optionally with a port
    pub server: String,
    /// Path segment of the lookup endpoint
    pub path: String,
    /// Query parameter carrying the hostname
    pub query_key: String,
    /// Client address forwarded as `ip=`, for services that pick answers by requester
    pub client_ip: Option<IpAddr>,
    /// Parent directory for the response cache. `None` disables caching.
    pub cache_dir: Option<PathBuf>,
    /// Byte budget for cached responses
    pub cache_max_bytes: usize,
    /// Freshness stamped on every network response
    pub forced_max_age_secs: u64,
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
    /// Largest answer body accepted
    pub max_body_bytes: usize,
}

impl Default for HttpDnsConfig {
    fn default() -> Self {
        Self {
            server: "119.29.29.29".to_string(),
            path: "d".to_string(),
            query_key: "dn".to_string(),
            client_ip: None,
            cache_dir: None,
            cache_max_bytes: 10 * 1024 * 1024, // 10 MB
            forced_max_age_secs: 7200,
            connect_timeout_ms: 10_000,
            read_timeout_ms: 10_000,
            max_body_bytes: 4096,
        }
    }
}

impl HttpDnsConfig {
    /// Create a new config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON document; missing fields keep their defaults.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Set the DNS service authority.
    pub fn server(mut self, server: impl Into<String>) -> Self {
        self.server = server.into();
        self
    }

    /// Set the cache parent directory.
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Set the cache byte budget.
    pub fn cache_max_bytes(mut self, bytes: usize) -> Self {
        self.cache_max_bytes = bytes;
        self
    }

    /// Forward the caller's public address to the service.
    pub fn client_ip(mut self, ip: IpAddr) -> Self {
        self.client_ip = Some(ip);
        self
    }

    /// Set the forced freshness window.
    pub fn forced_max_age(mut self, max_age: Duration) -> Self {
        self.forced_max_age_secs = max_age.as_secs();
        self
    }

    /// Set connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = millis(timeout);
        self
    }

    /// Set read timeout.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout_ms = millis(timeout);
        self
    }

    /// Directory the cache files live in, if caching is enabled.
    pub fn cache_path(&self) -> Option<PathBuf> {
        self.cache_dir.as_ref().map(|dir| dir.join(CACHE_SUBDIR))
    }

    pub fn connect_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn forced_max_age_duration(&self) -> Duration {
        Duration::from_secs(self.forced_max_age_secs)
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
