//! `GET /{id}` - serve an entry's raw content.

use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};

use crate::error::ApiError;
use crate::handler::AppState;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Malformed, unknown and expired ids all produce the same 404, including
/// segments that don't decode as UTF-8.
pub async fn retrieve(
    State(state): State<AppState>, path: Result<Path<String>, PathRejection>,
) -> Result<Response, ApiError> {
    let Ok(Path(id)) = path else {
        return Err(ApiError::NotFound);
    };
    match state.publisher.retrieve(&id).await? {
        Some(content) => {
            let headers = [
                (header::CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN)),
                (header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
            ];
            Ok((headers, content).into_response())
        }
        None => Err(ApiError::NotFound),
    }
}

/// Anything the router doesn't match, e.g. `/a/b`.
pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
