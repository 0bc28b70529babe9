//! Network error taxonomy
//!
//! Every transport failure surfaces as a single [`NetworkError`] whose
//! message is fixed and safe to show to users. The specific reason is kept
//! as an internal [`NetworkErrorCause`] for logs and diagnostics; callers
//! only ever need one error branch.

use thiserror::Error;

/// Message carried by every [`NetworkError`]
pub const GENERAL_NETWORK_MESSAGE: &str =
    "A network error occurred. Please check your connection and try again.";

/// Internal reason behind a [`NetworkError`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkErrorCause {
    /// The request did not complete within the configured timeout
    #[error("request timed out")]
    Timeout,

    /// Connection, DNS or protocol failure
    #[error("transport failure: {0}")]
    Transport(String),

    /// Server answered with a non-success status
    #[error("unexpected HTTP status {0}")]
    Status(u16),

    /// Response body could not be read or parsed
    #[error("invalid response body: {0}")]
    Decode(String),

    /// Request body could not be serialized
    #[error("invalid request body: {0}")]
    Encode(String),

    /// A local file could not be read or written
    #[error("local file error: {0}")]
    LocalFile(String),

    /// The URL could not be resolved
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The client configuration was rejected
    #[error("invalid client configuration: {0}")]
    Config(String),

    /// The client was disposed
    #[error("client disposed")]
    Disposed,
}

/// The single error kind raised by [`HttpClient`](crate::HttpClient)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", GENERAL_NETWORK_MESSAGE)]
pub struct NetworkError {
    #[source]
    cause: NetworkErrorCause,
}

impl NetworkError {
    /// Create an error from its internal cause
    pub fn new(cause: NetworkErrorCause) -> Self {
        Self { cause }
    }

    /// The user-facing message
    pub fn message(&self) -> &'static str {
        GENERAL_NETWORK_MESSAGE
    }

    /// The internal cause, for diagnostics only
    pub fn cause(&self) -> &NetworkErrorCause {
        &self.cause
    }

    /// Check if the request timed out
    pub fn is_timeout(&self) -> bool {
        self.cause == NetworkErrorCause::Timeout
    }

    /// Check if the client had been disposed
    pub fn is_disposed(&self) -> bool {
        self.cause == NetworkErrorCause::Disposed
    }
}

impl From<NetworkErrorCause> for NetworkError {
    fn from(cause: NetworkErrorCause) -> Self {
        Self::new(cause)
    }
}

impl From<reqwest::Error> for NetworkError {
    fn from(e: reqwest::Error) -> Self {
        let cause = if e.is_timeout() {
            NetworkErrorCause::Timeout
        } else if let Some(status) = e.status() {
            NetworkErrorCause::Status(status.as_u16())
        } else if e.is_decode() || e.is_body() {
            NetworkErrorCause::Decode(e.to_string())
        } else if e.is_builder() {
            NetworkErrorCause::InvalidUrl(e.to_string())
        } else {
            NetworkErrorCause::Transport(e.to_string())
        };
        Self::new(cause)
    }
}

/// Result type for network operations
pub type Result<T> = std::result::Result<T, NetworkError>;
