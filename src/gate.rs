//! Request gate: rate limiting applied in front of the route handlers.
//!
//! Only the sensitive paths in [`RATE_LIMITED_PATHS`] are checked; everything
//! else bypasses the limiter entirely. Client identity prefers the
//! `X-Forwarded-For` header over the peer address, which is only safe behind
//! a trusted reverse proxy that strips or overwrites client-supplied headers.
//! Deploying the gateway with its port exposed directly lets callers pick
//! their own rate-limit identity.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use tracing::debug;

use crate::api::{ApiError, AppState};
use crate::ratelimit::RateDecision;
use crate::types::ClientId;

/// Paths subject to rate limiting.
pub const RATE_LIMITED_PATHS: &[&str] = &[
    "/register",
    "/login",
    "/logout",
    "/deregister",
    "/me",
    "/secret/nuclear_codes",
];

/// Fallback identity when neither a forwarded header nor a peer address is
/// available.
const UNKNOWN_CLIENT: &str = "unknown";

/// Middleware: consult the rate limiter for allowlisted paths and
/// short-circuit with 429 before the handler runs.
pub async fn rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if RATE_LIMITED_PATHS.contains(&request.uri().path()) {
        let peer = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0);
        let client = client_id(request.headers(), peer);

        if state.limiter.check(&client, Utc::now()).await == RateDecision::Reject {
            return ApiError::RateLimited.into_response();
        }
        debug!(client = %client, path = request.uri().path(), "Request admitted");
    }

    next.run(request).await
}

/// Resolve the identity a request is limited under.
///
/// First comma-separated `X-Forwarded-For` value (trimmed) when present,
/// otherwise the peer IP, otherwise the `"unknown"` sentinel.
pub fn client_id(headers: &HeaderMap, peer: Option<SocketAddr>) -> ClientId {
    if let Some(forwarded) = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return ClientId::new(first);
            }
        }
    }

    match peer {
        Some(addr) => ClientId::new(addr.ip().to_string()),
        None => ClientId::new(UNKNOWN_CLIENT),
    }
}
