//! JSON bodies shared by the HTTP server and client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishResponse {
    pub id: String,
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// Error envelope: `{"error": {"code": ..., "message": ...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    /// Seconds until the rate-limit window resets. Only set on 429.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl ErrorBody {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { error: ErrorDetail { code: code.into(), message: message.into(), retry_after_secs: None } }
    }

    pub fn with_retry_after(mut self, secs: u64) -> Self {
        self.error.retry_after_secs = Some(secs);
        self
    }
}

/// Body of `/healthz` and `/readyz`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HealthStatus {
    pub fn ok() -> Self {
        Self { status: "ok".into(), message: None }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { status: "error".into(), message: Some(message.into()) }
    }
}

/// Wire error codes.
pub mod codes {
    pub const BAD_REQUEST: &str = "BAD_REQUEST";
    pub const EMPTY_CONTENT: &str = "EMPTY_CONTENT";
    pub const INVALID_EXPIRY: &str = "INVALID_EXPIRY";
    pub const EXPIRY_OUT_OF_RANGE: &str = "EXPIRY_OUT_OF_RANGE";
    pub const PAYLOAD_TOO_LARGE: &str = "PAYLOAD_TOO_LARGE";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const RATE_LIMITED: &str = "RATE_LIMITED";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}
