//! Response body reading.
//! Mirrors Chromium's HttpStream::ReadResponseBody.

use crate::base::neterror::NetError;
use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Incoming;

/// Response body wrapper.
pub struct ResponseBody {
    inner: Incoming,
}

impl ResponseBody {
    /// Create a new response body wrapper.
    pub fn new(inner: Incoming) -> Self {
        Self { inner }
    }

    /// Read the entire body, failing once more than `limit` bytes arrive.
    pub async fn bytes_limited(self, limit: usize) -> Result<Bytes, NetError> {
        let collected = Limited::new(self.inner, limit).collect().await.map_err(|e| {
            if e.downcast_ref::<LengthLimitError>().is_some() {
                NetError::ResponseBodyTooBig
            } else {
                tracing::debug!(error = %e, "failed reading response body");
                NetError::ConnectionClosed
            }
        })?;
        Ok(collected.to_bytes())
    }
}
