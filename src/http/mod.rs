//! HTTP plumbing for the DNS-over-HTTP primary path.
//!
//! - [`streamfactory`]: one-shot HTTP/1.1 connections over hyper
//! - [`httpcache`]: on-disk response cache bounded by a byte budget
//! - [`rewrite`]: freshness override applied to every network response
//! - [`DnsTransport`]: the seam the resolver issues its GET through

pub mod httpcache;
pub mod response;
pub mod responsebody;
pub mod rewrite;
pub mod streamfactory;

use crate::base::neterror::NetError;
use std::future::Future;
use std::pin::Pin;
use url::Url;

// Re-exports for convenience
pub use httpcache::HttpCache;
pub use response::HttpAnswer;
pub use responsebody::ResponseBody;
pub use rewrite::FreshnessOverride;

/// Alias for the `Future` returned by a transport fetch.
pub type Fetching<'a> = Pin<Box<dyn Future<Output = Result<HttpAnswer, NetError>> + Send + 'a>>;

/// Issues the DNS-over-HTTP GET.
///
/// Implementations must tolerate concurrent fetches from many tasks; the
/// resolver shares a single transport across all of its lookups.
pub trait DnsTransport: Send + Sync {
    /// Fetches `url` and returns the full response, whatever its status.
    fn fetch<'a>(&'a self, url: &'a Url) -> Fetching<'a>;
}
