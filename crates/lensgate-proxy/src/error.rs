use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use lensgate_common::ErrorResponse;
use thiserror::Error;

use crate::inference::UpstreamError;

/// Returned when the vendor failure carries no usable message.
pub const UPSTREAM_FALLBACK_MESSAGE: &str = "Failed to initialize WebRTC worker";

/// Returned for transport failures. The reqwest error itself is only logged.
pub const UPSTREAM_UNREACHABLE_MESSAGE: &str = "Inference server unreachable";

/// Returned when the request body exceeds the configured limit.
pub const PAYLOAD_TOO_LARGE_MESSAGE: &str = "Request body too large";

/// Terminal outcome of a proxy request. None of these are retried.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Client payload failed shape validation.
    #[error("{0}")]
    BadRequest(String),

    /// The server has no credential configured. The message is fixed so it never
    /// reveals anything about a partially configured value.
    #[error("Server configuration error: API key is not configured")]
    MissingCredential,

    /// The vendor call failed.
    #[error("{0}")]
    Upstream(#[from] UpstreamError),

    #[error("Too many requests")]
    RateLimited,

    #[error("Request body too large")]
    PayloadTooLarge,
}

impl ProxyError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::MissingCredential | Self::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    /// Message placed in the `{error}` body.
    pub fn public_message(&self) -> String {
        match self {
            Self::Upstream(UpstreamError::Transport(_)) => UPSTREAM_UNREACHABLE_MESSAGE.to_string(),
            Self::Upstream(err) => {
                let message = err.to_string();
                if message.trim().is_empty() {
                    UPSTREAM_FALLBACK_MESSAGE.to_string()
                } else {
                    message
                }
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(ErrorResponse {
                error: self.public_message(),
            }),
        )
            .into_response()
    }
}
