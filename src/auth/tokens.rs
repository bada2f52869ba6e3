//! Session token issuance and validation.

use std::fmt;

use base64::Engine;
use chrono::Utc;
use rand::RngCore;
use tokio::sync::Mutex;
use tracing::debug;

use crate::auth::credentials::CredentialStore;
use crate::types::{SessionToken, Username};

/// How long an issued token stays valid, in seconds.
pub const TOKEN_TTL_SECS: i64 = 30 * 60;

/// Raw entropy per token before encoding.
const TOKEN_ENTROPY_BYTES: usize = 64;

/// A validated session: who the caller is and the token that proved it.
#[derive(Debug, Clone)]
pub struct Session {
    pub username: Username,
    pub token: SessionToken,
}

/// Authentication failures.
///
/// Variants stay distinguishable for logging; the HTTP layer collapses all
/// of them into a single generic unauthorized response so probing callers
/// cannot tell an expired token from an unknown one.
#[derive(Debug, Clone)]
pub enum AuthError {
    /// No Authorization header on the request
    MissingHeader,
    /// Authorization header present but not `Bearer <token>`
    InvalidScheme,
    /// Token not found in the session store
    UnknownToken,
    /// Token found but past its expiry window
    TokenExpired,
    /// Session store failure
    Database(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingHeader => write!(f, "Missing Authorization header"),
            Self::InvalidScheme => write!(f, "Invalid Authorization header"),
            Self::UnknownToken => write!(f, "Invalid or expired token"),
            Self::TokenExpired => write!(f, "Token expired"),
            Self::Database(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

/// Issues, validates, and revokes bearer tokens.
pub struct TokenAuthority {
    store: CredentialStore,
    /// Serializes issuance; together with the store's delete-then-insert
    /// transaction this keeps the one-live-token-per-username invariant
    /// under concurrent logins.
    issue_lock: Mutex<()>,
}

impl TokenAuthority {
    /// Create a new token authority over the given store.
    pub fn new(store: CredentialStore) -> Self {
        Self {
            store,
            issue_lock: Mutex::new(()),
        }
    }

    /// Issue a fresh token for a username, invalidating any prior token.
    pub async fn issue(&self, username: &str) -> Result<SessionToken, AuthError> {
        let token = generate_token();
        let created_at = Utc::now().timestamp();

        let _guard = self.issue_lock.lock().await;
        self.store
            .replace_session(username, token.as_str(), created_at)
            .await
            .map_err(|e| AuthError::Database(e.to_string()))?;

        debug!(username, "Issued session token");
        Ok(token)
    }

    /// Validate a presented token and return its owner.
    ///
    /// Expiry is lazy: nothing sweeps old sessions, a token simply stops
    /// validating once its age exceeds `TOKEN_TTL_SECS`.
    pub async fn validate(&self, token: &str) -> Result<Username, AuthError> {
        let session = self
            .store
            .find_session(token)
            .await
            .map_err(|e| AuthError::Database(e.to_string()))?
            .ok_or(AuthError::UnknownToken)?;

        let elapsed = Utc::now().timestamp() - session.created_at;
        if elapsed > TOKEN_TTL_SECS {
            return Err(AuthError::TokenExpired);
        }

        Ok(Username::new(session.username))
    }

    /// Revoke a token unconditionally. Idempotent.
    pub async fn revoke(&self, token: &str) -> Result<(), AuthError> {
        self.store
            .delete_session(token)
            .await
            .map_err(|e| AuthError::Database(e.to_string()))
    }

    /// Full precondition check for session-gated routes: extract the bearer
    /// token from an Authorization header value and validate it.
    pub async fn authenticate(&self, authorization: Option<&str>) -> Result<Session, AuthError> {
        let token = bearer_token(authorization)?;
        let username = self.validate(token).await?;
        Ok(Session {
            username,
            token: SessionToken::new(token),
        })
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(authorization: Option<&str>) -> Result<&str, AuthError> {
    let header = authorization.ok_or(AuthError::MissingHeader)?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidScheme)?
        .trim();
    if token.is_empty() {
        return Err(AuthError::InvalidScheme);
    }
    Ok(token)
}

/// Generate an unguessable URL-safe token from 64 bytes of CSPRNG entropy.
fn generate_token() -> SessionToken {
    let mut buf = [0u8; TOKEN_ENTROPY_BYTES];
    rand::rng().fill_bytes(&mut buf);
    SessionToken::new(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf))
}
