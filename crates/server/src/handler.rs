//! HTTP router and shared state.
//!
//! Publish and retrieve each sit behind their own admission layer; the
//! probes are never rate limited. Every request gets an `x-request-id`,
//! recorded on its trace span and echoed on the response.

use std::any::Any;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::Request;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use fadebin_core::{AppConfig, EntryStore, Publisher, RateLimiter};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::admission;
use crate::error::ApiError;
use crate::routes::{health, publish, retrieve};

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub publisher: Publisher,
    pub limiter: Arc<RateLimiter>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn EntryStore>, config: AppConfig) -> Self {
        Self {
            publisher: Publisher::new(store, config.publish_policy()),
            limiter: Arc::new(RateLimiter::new(config.rate_limits())),
            config: Arc::new(config),
        }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let writes = Router::new()
        .route("/", post(publish::publish))
        .route_layer(middleware::from_fn_with_state(state.clone(), admission::admit_write));

    let reads = Router::new()
        .route("/{id}", get(retrieve::retrieve))
        .route_layer(middleware::from_fn_with_state(state.clone(), admission::admit_read));

    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .merge(writes)
        .merge(reads)
        .fallback(retrieve::not_found)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(DefaultBodyLimit::max(state.config.max_content_bytes))
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

fn request_span(req: &Request<Body>) -> Span {
    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    tracing::info_span!("request", method = %req.method(), uri = %req.uri(), request_id)
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    ApiError::Internal(format!("handler panicked: {detail}")).into_response()
}
