//! Authentication gateway: account registry, bearer-token sessions,
//! sliding-window rate limiting, and an authenticated proxy to an
//! internal upstream.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod gate;
pub mod ratelimit;
pub mod types;
pub mod upstream;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;

use api::{AppState, Gateway};
use auth::{CredentialStore, TokenAuthority};
use config::GatewayConfig;
use db::DatabaseConfig;
use ratelimit::RateLimiter;
use upstream::UpstreamClient;

/// Connect to the database, apply the schema, and assemble the shared
/// gateway state.
pub async fn create_gateway(
    db_config: DatabaseConfig,
    config: GatewayConfig,
) -> Result<AppState> {
    let db = db::create_connection(db_config).await?;
    db::ensure_schema(&db).await?;

    let store = CredentialStore::new(db);
    let tokens = TokenAuthority::new(store.clone());
    let upstream = UpstreamClient::new(&config.upstream_base_url, &config.proxy_secret)?;

    Ok(Arc::new(Gateway {
        store,
        tokens,
        limiter: RateLimiter::new(),
        upstream,
        started: Instant::now(),
    }))
}
