//! Admission control middleware.
//!
//! Runs before the publish and retrieve handlers. Clients are keyed by peer
//! IP, or by the first hop of `X-Forwarded-For` / `X-Real-IP` when the
//! server is configured to trust a fronting proxy.

use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use fadebin_core::{Admission, OperationClass};

use crate::error::ApiError;
use crate::handler::AppState;

/// Key used when neither the peer address nor a trusted header is known.
const UNKNOWN_CLIENT: &str = "unknown";

pub async fn admit_write(State(state): State<AppState>, req: Request, next: Next) -> Response {
    admit(&state, OperationClass::Write, req, next).await
}

pub async fn admit_read(State(state): State<AppState>, req: Request, next: Next) -> Response {
    admit(&state, OperationClass::Read, req, next).await
}

async fn admit(state: &AppState, class: OperationClass, req: Request, next: Next) -> Response {
    let peer = req.extensions().get::<ConnectInfo<SocketAddr>>().map(|info| info.0);
    let key = client_key(req.headers(), peer, state.config.trust_proxy_headers);

    match state.limiter.allow(&key, class) {
        Admission::Allowed { .. } => next.run(req).await,
        Admission::Denied { retry_after } => {
            tracing::warn!(client = %key, class = class.as_str(), "rate limit exceeded");
            ApiError::RateLimited { retry_after }.into_response()
        }
    }
}

/// Identify the caller for rate limiting.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy: bool) -> String {
    if trust_proxy {
        let forwarded = ["x-forwarded-for", "x-real-ip"].into_iter().find_map(|name| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.split(',').next())
                .and_then(|first| first.trim().parse::<IpAddr>().ok())
        });
        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }

    peer.map_or_else(|| UNKNOWN_CLIENT.to_string(), |addr| addr.ip().to_string())
}
