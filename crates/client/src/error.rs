//! fadebin client error types.

use std::sync::Arc;
use std::time::Duration;

use fadebin_core::ExpiryError;

/// Errors from the fadebin HTTP client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Refused locally: nothing to publish.
    #[error("content is empty")]
    EmptyContent,

    /// Refused locally: expiry text does not parse.
    #[error("invalid expiry: {0}")]
    InvalidExpiry(ExpiryError),

    /// Server base URL cannot be parsed or joined.
    #[error("invalid server URL: {0}")]
    InvalidBaseUrl(String),

    /// Entry is unknown or has expired.
    #[error("entry not found or expired")]
    NotFound,

    /// Server refused the request under its rate limit.
    #[error("rate limited: retry after {}s", .retry_after.map_or(0, |d| d.as_secs()))]
    RateLimited { retry_after: Option<Duration> },

    /// Server answered with a structured error envelope.
    #[error("{code}: {message} (HTTP {status})")]
    Api { status: u16, code: String, message: String },

    /// Error status without a readable envelope.
    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Response parse error.
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { ClientError::Timeout } else { ClientError::Network(Arc::new(err)) }
    }
}
