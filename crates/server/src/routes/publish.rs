//! `POST /` - publish a new entry.

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use fadebin_core::wire::PublishResponse;
use serde::Deserialize;

use crate::error::ApiError;
use crate::handler::AppState;

/// Query string of a publish request.
#[derive(Debug, Default, Deserialize)]
pub struct PublishParams {
    /// Requested lifetime, e.g. `1h` or `7d`. Absent or empty means the default.
    #[serde(default)]
    pub expiry: Option<String>,
}

pub async fn publish(
    State(state): State<AppState>, params: Result<Query<PublishParams>, QueryRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Result<(StatusCode, Json<PublishResponse>), ApiError> {
    let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let body = body.map_err(|e| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(format!(
                "body exceeds the limit of {} bytes",
                state.config.max_content_bytes
            ))
        } else {
            ApiError::BadRequest(e.body_text())
        }
    })?;

    let published = state.publisher.publish(&body, params.expiry.as_deref()).await?;
    let url = state.config.entry_url(&published.id);

    Ok((
        StatusCode::CREATED,
        Json(PublishResponse { id: published.id, url, expires_at: published.expires_at }),
    ))
}
