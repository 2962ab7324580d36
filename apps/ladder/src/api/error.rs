//! # API Errors
//!
//! Maps [`LadderError`] onto HTTP status codes and a JSON error body:
//!
//! ```json
//! { "error": { "kind": "not_found", "message": "claim 4 not found" } }
//! ```

use super::types::{ErrorBody, ErrorResponse};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ladder_core::LadderError;

/// Error returned by every fallible handler.
#[derive(Debug)]
pub enum ApiError {
    Core(LadderError),
    /// Missing or malformed caller identity.
    Unauthenticated(String),
    /// Request body over the configured limit.
    PayloadTooLarge(String),
}

impl From<LadderError> for ApiError {
    fn from(e: LadderError) -> Self {
        ApiError::Core(e)
    }
}

impl ApiError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Core(e) => match e {
                LadderError::Validation(_) => StatusCode::BAD_REQUEST,
                LadderError::NotFound { .. } => StatusCode::NOT_FOUND,
                LadderError::Forbidden(_) => StatusCode::FORBIDDEN,
                LadderError::Consistency(_)
                | LadderError::Storage(_)
                | LadderError::Serialization(_)
                | LadderError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            ApiError::Unauthenticated(message) => ErrorBody {
                kind: "unauthenticated".to_string(),
                message: message.clone(),
            },
            ApiError::PayloadTooLarge(message) => ErrorBody {
                kind: "payload_too_large".to_string(),
                message: message.clone(),
            },
            ApiError::Core(e) => ErrorBody {
                kind: e.kind().to_string(),
                message: e.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Core(e @ LadderError::Consistency(_)) => {
                tracing::error!(event = "consistency_violation", "{}", e);
            }
            ApiError::Core(e @ (LadderError::Storage(_) | LadderError::Serialization(_))) => {
                tracing::error!(event = "storage_failure", kind = e.kind(), "{}", e);
            }
            ApiError::Core(LadderError::Forbidden(reason)) => {
                tracing::warn!(event = "forbidden", reason = %reason, "Request forbidden");
            }
            _ => {}
        }

        let status = self.status();
        let body = ErrorResponse { error: self.body() };
        (status, Json(body)).into_response()
    }
}
