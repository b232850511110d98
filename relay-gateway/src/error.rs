//! Error types for the gateway crate.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use relay_core::{CoreError, Envelope};
use relay_upstream::UpstreamError;

/// Errors that can occur during gateway request handling.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum GatewayError {
    /// A request parameter failed validation.
    #[error(transparent)]
    Invalid(#[from] CoreError),

    /// An error propagated from the outbound engine.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// The requested resource does not exist.
    #[error("{0}")]
    NotFound(String),

    /// An uploaded payload exceeds the configured cap.
    #[error("payload too large: maximum is {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// The multipart body is malformed or missing a required part.
    #[error("invalid upload: {0}")]
    BadUpload(String),
}

impl GatewayError {
    fn status(&self) -> StatusCode {
        match self {
            GatewayError::Invalid(_) | GatewayError::BadUpload(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::Upstream(upstream) => match upstream {
                UpstreamError::BreakerOpen { .. } => StatusCode::SERVICE_UNAVAILABLE,
                UpstreamError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                UpstreamError::MissingElement { .. }
                | UpstreamError::Status { status: 404, .. } => StatusCode::NOT_FOUND,
                _ => StatusCode::BAD_GATEWAY,
            },
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(Envelope::fail(self.to_string()))).into_response()
    }
}
