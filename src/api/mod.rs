//! HTTP surface of the gateway: router, state, and route handlers.

mod error;

pub use error::ApiError;

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::middleware;
use axum::response::Json;
use axum::routing::{delete, get, post};
use serde::Deserialize;
use serde_json::{Value, json};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::auth::{
    AuthError, CredentialStore, Session, TokenAuthority, hash_password, verify_password,
};
use crate::gate;
use crate::ratelimit::RateLimiter;
use crate::upstream::UpstreamClient;

/// Shared gateway state handed to every handler.
pub struct Gateway {
    pub store: CredentialStore,
    pub tokens: TokenAuthority,
    pub limiter: RateLimiter,
    pub upstream: UpstreamClient,
    /// Process start, for the health endpoint's uptime report.
    pub started: Instant,
}

pub type AppState = Arc<Gateway>;

/// Build the gateway router.
///
/// The rate-limit gate wraps every route; it is the gate itself that only
/// acts on the sensitive-path allowlist.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/deregister", delete(deregister))
        .route("/me", get(me))
        .route("/secret/nuclear_codes", get(nuclear_codes))
        .layer(middleware::from_fn_with_state(state.clone(), gate::rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Body for register and login.
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

/// Validate a credentials body, returning the trimmed username.
fn validate_credentials(body: &CredentialsRequest) -> Result<String, ApiError> {
    let username = body.username.trim();
    let length = username.chars().count();
    if !(3..=32).contains(&length) {
        return Err(ApiError::Validation(
            "Username must be 3-32 characters".to_string(),
        ));
    }
    if body.password.chars().count() < 8 {
        return Err(ApiError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    Ok(username.to_string())
}

/// Session precondition for protected routes.
///
/// Every authentication failure maps to the same 401 response; the specific
/// reason (missing header, bad scheme, unknown or expired token) is only
/// logged.
async fn require_session(state: &Gateway, headers: &HeaderMap) -> Result<Session, ApiError> {
    let authorization = headers
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match state.tokens.authenticate(authorization).await {
        Ok(session) => Ok(session),
        Err(err @ AuthError::Database(_)) => Err(ApiError::Internal(anyhow::Error::new(err))),
        Err(err) => {
            warn!(reason = %err, "Rejected session credential");
            Err(ApiError::Unauthorized)
        }
    }
}

fn internal(err: AuthError) -> ApiError {
    ApiError::Internal(anyhow::Error::new(err))
}

async fn root() -> Json<Value> {
    Json(json!({ "status": "ok", "message": "Server is up." }))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "uptime_seconds": state.started.elapsed().as_secs(),
    }))
}

/// Create an account. Idempotent: registering a taken username is a
/// success-shaped no-op, including when two first registrations race on the
/// unique index.
async fn register(
    State(state): State<AppState>,
    Json(body): Json<CredentialsRequest>,
) -> Result<Json<Value>, ApiError> {
    let username = validate_credentials(&body)?;

    if state.store.is_registered(&username).await? {
        return Ok(Json(json!({ "status": "already registered" })));
    }

    let password_hash = hash_password(body.password).await?;
    match state.store.create_user(&username, &password_hash).await {
        Ok(_) => {
            info!(username, "Registered new account");
            Ok(Json(json!({ "status": "registered" })))
        }
        Err(err) => {
            warn!(username, "Registration raced an existing account: {err:#}");
            Ok(Json(json!({ "status": "already registered" })))
        }
    }
}

/// Verify credentials and issue a fresh bearer token.
async fn login(
    State(state): State<AppState>,
    Json(body): Json<CredentialsRequest>,
) -> Result<Json<Value>, ApiError> {
    let username = validate_credentials(&body)?;

    let Some(password_hash) = state.store.fetch_hash(&username).await? else {
        warn!(username, "Login attempt for unknown username");
        return Err(ApiError::InvalidCredentials);
    };

    if !verify_password(body.password, password_hash).await? {
        warn!(username, "Login attempt with wrong password");
        return Err(ApiError::InvalidCredentials);
    }

    let token = state.tokens.issue(&username).await.map_err(internal)?;
    info!(username, "Login succeeded");

    Ok(Json(json!({ "status": "ok", "token": token })))
}

async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let session = require_session(&state, &headers).await?;

    state
        .tokens
        .revoke(session.token.as_str())
        .await
        .map_err(internal)?;
    info!(username = %session.username, "Logged out");

    Ok(Json(json!({ "status": "logged out" })))
}

/// Delete the calling account and cascade-delete its sessions.
async fn deregister(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let session = require_session(&state, &headers).await?;

    state.store.delete_user(session.username.as_str()).await?;
    info!(username = %session.username, "Account deleted");

    Ok(Json(json!({ "status": "account deleted" })))
}

async fn me(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<Value>, ApiError> {
    let session = require_session(&state, &headers).await?;
    Ok(Json(json!({ "user": session.username })))
}

/// Authenticated proxy to the internal intel upstream. The upstream's raw
/// envelope never reaches the caller; only the intel payload is re-wrapped.
async fn nuclear_codes(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let session = require_session(&state, &headers).await?;

    let intel = state.upstream.fetch_intel().await?;
    info!(username = %session.username, "Served restricted intel");

    Ok(Json(json!({ "intel": intel, "classification": "restricted" })))
}
