//! Liveness and readiness probes.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use fadebin_core::wire::HealthStatus;

use crate::handler::AppState;

/// The process is up.
pub async fn healthz() -> Json<HealthStatus> {
    Json(HealthStatus::ok())
}

/// The store answers.
pub async fn readyz(State(state): State<AppState>) -> (StatusCode, Json<HealthStatus>) {
    match state.publisher.store().ping().await {
        Ok(()) => (StatusCode::OK, Json(HealthStatus::ok())),
        Err(e) => {
            tracing::error!(error = %e, "readiness check failed");
            (StatusCode::SERVICE_UNAVAILABLE, Json(HealthStatus::error("database unavailable")))
        }
    }
}
