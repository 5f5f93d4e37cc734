use std::io;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum NetError {
    // Generic Errors
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("Operation timed out")]
    TimedOut,

    // Connection Errors
    #[error("Connection closed (TCP FIN)")]
    ConnectionClosed,
    #[error("Connection refused")]
    ConnectionRefused,
    #[error("Connection failed")]
    ConnectionFailed,
    #[error("Name not resolved")]
    NameNotResolved,
    #[error("Connection timed out")]
    ConnectionTimedOut,
    #[error("Connection to {host}:{port} failed: {source}")]
    ConnectionFailedTo {
        host: String,
        port: u16,
        #[source]
        source: Arc<io::Error>,
    },

    // Resolution Errors
    #[error("Name {domain} not resolved: {source}")]
    NameNotResolvedFor {
        domain: String,
        #[source]
        source: Arc<io::Error>,
    },
    #[error("Unable to resolve host {host}")]
    HostResolutionFailed { host: String },

    // HTTP Errors
    #[error("Invalid URL")]
    InvalidUrl,
    #[error("Invalid response")]
    InvalidResponse,
    #[error("Empty response")]
    EmptyResponse,
    #[error("Response body too big")]
    ResponseBodyTooBig,

    // Cache Errors
    #[error("Cache read failure")]
    CacheReadFailure,
    #[error("Cache write failure")]
    CacheWriteFailure,

    #[error("Unknown error: {0}")]
    Unknown(i32),
}

impl NetError {
    pub fn connection_failed_to(host: &str, port: u16, source: io::Error) -> Self {
        NetError::ConnectionFailedTo {
            host: host.to_string(),
            port,
            source: Arc::new(source),
        }
    }

    pub fn dns_failed(domain: &str, source: io::Error) -> Self {
        NetError::NameNotResolvedFor {
            domain: domain.to_string(),
            source: Arc::new(source),
        }
    }

    pub fn host_resolution_failed(host: &str) -> Self {
        NetError::HostResolutionFailed {
            host: host.to_string(),
        }
    }

    pub fn as_i32(&self) -> i32 {
        match self {
            NetError::InvalidArgument(_) => -4,
            NetError::TimedOut => -7,

            NetError::ConnectionClosed => -100,
            NetError::ConnectionRefused => -102,
            NetError::ConnectionFailed => -104,
            NetError::ConnectionFailedTo { .. } => -104,
            NetError::NameNotResolved => -105,
            NetError::NameNotResolvedFor { .. } => -105,
            NetError::ConnectionTimedOut => -118,
            NetError::HostResolutionFailed { .. } => -137,

            NetError::InvalidUrl => -300,
            NetError::InvalidResponse => -320,
            NetError::EmptyResponse => -324,
            NetError::ResponseBodyTooBig => -345,

            NetError::CacheReadFailure => -401,
            NetError::CacheWriteFailure => -402,
            NetError::Unknown(code) => *code,
        }
    }
}

impl From<i32> for NetError {
    fn from(code: i32) -> Self {
        match code {
            -4 => NetError::InvalidArgument("unspecified"),
            -7 => NetError::TimedOut,

            -100 => NetError::ConnectionClosed,
            -102 => NetError::ConnectionRefused,
            -104 => NetError::ConnectionFailed,
            -105 => NetError::NameNotResolved,
            -118 => NetError::ConnectionTimedOut,

            -300 => NetError::InvalidUrl,
            -320 => NetError::InvalidResponse,
            -324 => NetError::EmptyResponse,
            -345 => NetError::ResponseBodyTooBig,

            -401 => NetError::CacheReadFailure,
            -402 => NetError::CacheWriteFailure,
            _ => NetError::Unknown(code),
        }
    }
}
