//! Common error types for Lensgate.

use thiserror::Error;

/// Result type alias using Lensgate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type shared by the proxy and the capture client.
#[derive(Debug, Error)]
pub enum Error {
    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Payload did not match the expected contract
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Remote HTTP endpoint failed or answered with an error body
    #[error("{message}")]
    Http { status: Option<u16>, message: String },

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a config error from any displayable type.
    pub fn config(msg: impl std::fmt::Display) -> Self {
        Self::Config(msg.to_string())
    }

    /// Create a protocol error from any displayable type.
    pub fn protocol(msg: impl std::fmt::Display) -> Self {
        Self::Protocol(msg.to_string())
    }

    /// Create an HTTP error with an optional status code.
    pub fn http(status: Option<u16>, msg: impl std::fmt::Display) -> Self {
        Self::Http {
            status,
            message: msg.to_string(),
        }
    }

    /// Create an internal error from any displayable type.
    pub fn internal(msg: impl std::fmt::Display) -> Self {
        Self::Internal(msg.to_string())
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
