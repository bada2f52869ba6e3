use serde::{Deserialize, Serialize};
use surrealdb::{RecordId, sql::Datetime};

/// Persisted representation of a registered account (table: `user`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// Stable database identifier for this account.
    pub id: RecordId,
    /// Unique, case-sensitive account name.
    pub username: String,
    /// bcrypt hash of the account password. Raw passwords are never stored.
    pub password_hash: String,
    /// When this record was created.
    pub created_at: Option<Datetime>,
}

/// Persisted representation of a live bearer token (table: `session`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Stable database identifier for this session.
    pub id: RecordId,
    /// Opaque bearer token string; unique across all sessions.
    pub token: String,
    /// Username that owns this session.
    pub username: String,
    /// Issuance instant as UTC epoch seconds. Expiry is evaluated lazily
    /// against this value on every validation.
    pub created_at: i64,
}
