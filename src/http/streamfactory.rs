use crate::base::context::{with_deadline, IoResultExt};
use crate::base::neterror::NetError;
use bytes::Bytes;
use http::{Request, Response};
use http_body_util::Empty;
use hyper::body::Incoming;
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::spawn;
use url::Url;

/// Wraps an HTTP/1.1 connection.
/// Equivalent to net::HttpStream.
pub struct HttpStream {
    sender: http1::SendRequest<Empty<Bytes>>,
}

impl HttpStream {
    pub async fn send_request(
        &mut self,
        req: Request<Empty<Bytes>>,
    ) -> Result<Response<Incoming>, NetError> {
        self.sender.send_request(req).await.map_err(|e| {
            tracing::debug!(error = %e, "request failed");
            map_hyper_error(&e)
        })
    }
}

fn map_hyper_error(e: &hyper::Error) -> NetError {
    if e.is_parse() || e.is_parse_status() {
        NetError::InvalidResponse
    } else if e.is_incomplete_message() {
        NetError::EmptyResponse
    } else if e.is_closed() || e.is_canceled() {
        NetError::ConnectionClosed
    } else if e.is_timeout() {
        NetError::TimedOut
    } else {
        NetError::ConnectionFailed
    }
}

/// Opens a fresh connection per request. Lookups are rare and answers are
/// cached, so no pooling is done.
pub struct HttpStreamFactory {
    connect_timeout: Duration,
}

impl HttpStreamFactory {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    pub async fn request_stream(&self, url: &Url) -> Result<HttpStream, NetError> {
        let host = url.host_str().ok_or(NetError::InvalidUrl)?;
        let port = url.port_or_known_default().ok_or(NetError::InvalidUrl)?;

        // 1. TCP connect
        let socket = with_deadline(self.connect_timeout, NetError::ConnectionTimedOut, async {
            TcpStream::connect((host, port))
                .await
                .connection_context(host, port)
        })
        .await?;
        let _ = socket.set_nodelay(true);

        // 2. Handshake
        let io = TokioIo::new(socket);
        let (sender, conn) = http1::handshake(io).await.map_err(|e| {
            tracing::debug!(host = %host, error = %e, "handshake failed");
            NetError::ConnectionFailed
        })?;

        // 3. Spawn the connection driver
        spawn(async move {
            if let Err(e) = conn.await {
                tracing::debug!(error = %e, "connection driver exited");
            }
        });

        Ok(HttpStream { sender })
    }
}
