//! HTTP client for a fadebin server.
//!
//! ### Protocol
//!
//! - **Publish**: `POST /?expiry=<text>` with the raw body, `Content-Type: text/plain`.
//!   Answers 201 with `{id, url, expires_at}`.
//! - **Fetch**: `GET /<id>`. Answers 200 with the raw body, or 404.
//! - **Errors**: `{"error": {"code", "message", "retry_after_secs"?}}`; 429 also
//!   carries `Retry-After`.

use std::sync::Arc;
use std::time::Duration;

use fadebin_core::expiry;
use fadebin_core::wire::{ErrorBody, PublishResponse};
use reqwest::{StatusCode, header};
use url::Url;

use crate::error::ClientError;

/// Default server URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default user agent.
const DEFAULT_USER_AGENT: &str = concat!("fadebin/", env!("CARGO_PKG_VERSION"));

/// fadebin client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server origin (default: http://localhost:8080).
    pub base_url: String,
    /// Request timeout (default: 30s).
    pub timeout: Duration,
    /// User-agent string (default: fadebin/0.x).
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// fadebin HTTP client.
#[derive(Debug, Clone)]
pub struct FadebinClient {
    http: reqwest::Client,
    base: Url,
}

impl FadebinClient {
    /// Create a new client with the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let base = parse_base_url(&config.base_url)?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| ClientError::Network(Arc::new(e)))?;

        Ok(Self { http, base })
    }

    /// Publish `content`, optionally with an expiry such as `1h` or `7d`.
    ///
    /// Empty content and unparseable expiry text are refused before any
    /// request is sent; range checks are left to the server.
    pub async fn publish(&self, content: Vec<u8>, expiry_text: Option<&str>) -> Result<PublishResponse, ClientError> {
        if content.is_empty() {
            return Err(ClientError::EmptyContent);
        }
        let expiry_text = expiry_text.filter(|text| !text.is_empty());
        if let Some(text) = expiry_text {
            expiry::parse(text).map_err(ClientError::InvalidExpiry)?;
        }

        let mut url = self.base.clone();
        if let Some(text) = expiry_text {
            url.query_pairs_mut().append_pair("expiry", text);
        }

        tracing::debug!(%url, size_bytes = content.len(), "publishing");
        let response = self
            .http
            .post(url)
            .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(content)
            .send()
            .await?;

        let status = response.status();
        let retry_after = retry_after_header(response.headers());
        let bytes = response.bytes().await?;

        if status != StatusCode::CREATED {
            return Err(error_for_status(status, retry_after, &bytes));
        }

        serde_json::from_slice(&bytes).map_err(|e| ClientError::Parse(e.to_string()))
    }

    /// Fetch the raw content stored under `id`.
    ///
    /// An id the server could never have issued is reported as
    /// [`ClientError::NotFound`] without a request, so it can't be joined
    /// onto the base as a path or absolute URL.
    pub async fn fetch(&self, id: &str) -> Result<Vec<u8>, ClientError> {
        if !fadebin_core::id::is_well_formed(id) {
            return Err(ClientError::NotFound);
        }
        let url = self.base.join(id).map_err(|e| ClientError::InvalidBaseUrl(e.to_string()))?;

        tracing::debug!(%url, "fetching");
        let response = self.http.get(url).send().await?;

        let status = response.status();
        let retry_after = retry_after_header(response.headers());
        let bytes = response.bytes().await?;

        if status != StatusCode::OK {
            return Err(error_for_status(status, retry_after, &bytes));
        }
        Ok(bytes.to_vec())
    }
}

/// Parse a server origin, normalising it to end with `/` so ids join as
/// children rather than replacing the last path segment.
pub fn parse_base_url(raw: &str) -> Result<Url, ClientError> {
    let mut base = Url::parse(raw.trim()).map_err(|e| ClientError::InvalidBaseUrl(format!("{raw:?}: {e}")))?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(ClientError::InvalidBaseUrl(format!("{raw:?}: scheme must be http or https")));
    }
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base)
}

fn retry_after_header(headers: &header::HeaderMap) -> Option<Duration> {
    headers
        .get(header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Map a non-success response to a [`ClientError`].
pub(crate) fn error_for_status(status: StatusCode, retry_after: Option<Duration>, body: &[u8]) -> ClientError {
    let envelope = serde_json::from_slice::<ErrorBody>(body).ok();

    if status == StatusCode::NOT_FOUND {
        return ClientError::NotFound;
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = retry_after.or_else(|| {
            envelope
                .as_ref()
                .and_then(|e| e.error.retry_after_secs)
                .map(Duration::from_secs)
        });
        return ClientError::RateLimited { retry_after };
    }

    match envelope {
        Some(ErrorBody { error }) => {
            ClientError::Api { status: status.as_u16(), code: error.code, message: error.message }
        }
        None => ClientError::HttpError { status: status.as_u16() },
    }
}
