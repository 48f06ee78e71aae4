//! Structured errors for the fadebin server.
//!
//! Every failure leaves the server as the `{"error": {"code", "message"}}`
//! envelope from [`fadebin_core::wire`].

use std::time::Duration;

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use fadebin_core::Error as CoreError;
use fadebin_core::wire::{ErrorBody, codes};

const NOT_FOUND_MESSAGE: &str = "entry not found or expired";
const INTERNAL_MESSAGE: &str = "an internal error occurred";

/// Structured errors for the fadebin server.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request could not be read (bad query string, unreadable body).
    #[error("BAD_REQUEST: {0}")]
    BadRequest(String),

    /// Request was read but its content or expiry is unacceptable.
    #[error("{code}: {message}")]
    Invalid { code: &'static str, message: String },

    /// Body exceeds the configured size limit.
    #[error("PAYLOAD_TOO_LARGE: {0}")]
    PayloadTooLarge(String),

    /// Entry is malformed, unknown or expired. Deliberately carries nothing.
    #[error("NOT_FOUND")]
    NotFound,

    /// Admission denied for the current window.
    #[error("RATE_LIMITED: retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    /// Store failure or allocation exhaustion. Detail is logged, not returned.
    #[error("INTERNAL_ERROR: {0}")]
    Internal(String),
}

/// Whole seconds to wait, rounded up, never below 1.
pub fn retry_after_secs(retry_after: Duration) -> u64 {
    u64::try_from(retry_after.as_millis().div_ceil(1000))
        .unwrap_or(u64::MAX)
        .max(1)
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::EmptyContent => {
                ApiError::Invalid { code: codes::EMPTY_CONTENT, message: "content cannot be empty".into() }
            }
            CoreError::InvalidExpiry(ref e) => ApiError::Invalid { code: codes::INVALID_EXPIRY, message: e.to_string() },
            CoreError::ExpiryOutOfRange(ref e) => {
                ApiError::Invalid { code: codes::EXPIRY_OUT_OF_RANGE, message: e.to_string() }
            }
            CoreError::ContentTooLarge { size, max } => {
                ApiError::PayloadTooLarge(format!("{size} bytes exceeds the limit of {max} bytes"))
            }
            CoreError::AllocationExhausted(_) | CoreError::Storage(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorBody::new(codes::BAD_REQUEST, msg.clone())),
            ApiError::Invalid { code, message } => (StatusCode::BAD_REQUEST, ErrorBody::new(*code, message.clone())),
            ApiError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, ErrorBody::new(codes::PAYLOAD_TOO_LARGE, msg.clone()))
            }
            ApiError::NotFound => (StatusCode::NOT_FOUND, ErrorBody::new(codes::NOT_FOUND, NOT_FOUND_MESSAGE)),
            ApiError::RateLimited { retry_after } => {
                let secs = retry_after_secs(*retry_after);
                let body = ErrorBody::new(codes::RATE_LIMITED, "too many requests").with_retry_after(secs);
                let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
                response.headers_mut().insert(header::RETRY_AFTER, HeaderValue::from(secs));
                return response;
            }
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorBody::new(codes::INTERNAL_ERROR, INTERNAL_MESSAGE))
            }
        };

        (status, Json(body)).into_response()
    }
}
