//! Ergonomic error context helpers.
//!
//! Extension traits that turn IO and timeout failures into context-rich
//! `NetError` variants.

use crate::base::neterror::NetError;
use std::future::Future;
use std::io;
use std::time::Duration;

/// Extension trait for adding context to IO Results.
pub trait IoResultExt<T> {
    /// Add connection context to an IO error.
    ///
    /// # Example
    /// ```ignore
    /// use httpdns::base::context::IoResultExt;
    ///
    /// let stream = TcpStream::connect(addr).await
    ///     .connection_context("119.29.29.29", 80)?;
    /// // Error: "Connection to 119.29.29.29:80 failed: connection refused"
    /// ```
    fn connection_context(self, host: &str, port: u16) -> Result<T, NetError>;

    /// Add DNS resolution context to an IO error.
    fn dns_context(self, domain: &str) -> Result<T, NetError>;
}

impl<T> IoResultExt<T> for Result<T, io::Error> {
    fn connection_context(self, host: &str, port: u16) -> Result<T, NetError> {
        self.map_err(|e| NetError::connection_failed_to(host, port, e))
    }

    fn dns_context(self, domain: &str) -> Result<T, NetError> {
        self.map_err(|e| NetError::dns_failed(domain, e))
    }
}

/// Run `fut` under a deadline, mapping expiry to `on_elapsed`.
pub async fn with_deadline<F, T>(
    limit: Duration,
    on_elapsed: NetError,
    fut: F,
) -> Result<T, NetError>
where
    F: Future<Output = Result<T, NetError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(on_elapsed),
    }
}
