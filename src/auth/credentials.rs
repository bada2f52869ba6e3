//! Credential storage: accounts and their live sessions.

use anyhow::{Result, anyhow};

use crate::db::Db;
use crate::db::schema::{SessionRecord, UserRecord};

/// Store for user accounts and session tokens.
///
/// This is the only component that touches the `user` and `session` tables.
/// Everything else goes through its narrow create/read/delete surface.
#[derive(Clone)]
pub struct CredentialStore {
    db: Db,
}

impl CredentialStore {
    /// Create a new credential store.
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Check whether a username is already taken.
    pub async fn is_registered(&self, username: &str) -> Result<bool> {
        Ok(self.find_user(username).await?.is_some())
    }

    /// Look up an account by username.
    pub async fn find_user(&self, username: &str) -> Result<Option<UserRecord>> {
        let username = username.to_string();

        let mut res = self
            .db
            .query("SELECT * FROM user WHERE username = $username LIMIT 1")
            .bind(("username", username))
            .await?;

        let users: Vec<UserRecord> = res.take(0)?;
        Ok(users.into_iter().next())
    }

    /// Create a new account.
    ///
    /// Fails if the username is already taken; the unique index on
    /// `user.username` enforces this even under concurrent registration.
    pub async fn create_user(&self, username: &str, password_hash: &str) -> Result<UserRecord> {
        let username = username.to_string();
        let password_hash = password_hash.to_string();

        let mut res = self
            .db
            .query(
                r#"
                CREATE user SET
                    username = $username,
                    password_hash = $password_hash
                "#,
            )
            .bind(("username", username))
            .bind(("password_hash", password_hash))
            .await?;

        let users: Vec<UserRecord> = res.take(0)?;
        users
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("failed to create user record"))
    }

    /// Fetch the stored password hash for a username, if registered.
    pub async fn fetch_hash(&self, username: &str) -> Result<Option<String>> {
        Ok(self
            .find_user(username)
            .await?
            .map(|user| user.password_hash))
    }

    /// Delete an account and every session it owns, in one transaction.
    pub async fn delete_user(&self, username: &str) -> Result<()> {
        let username = username.to_string();

        let res = self
            .db
            .query(
                r#"
                BEGIN TRANSACTION;
                DELETE session WHERE username = $username;
                DELETE user WHERE username = $username;
                COMMIT TRANSACTION;
                "#,
            )
            .bind(("username", username))
            .await?;

        res.check()?;
        Ok(())
    }

    /// Replace the owner's live session with a new token.
    ///
    /// Delete-then-insert runs as a single transaction so a username can
    /// never hold two live tokens, even under concurrent logins.
    pub async fn replace_session(
        &self,
        username: &str,
        token: &str,
        created_at: i64,
    ) -> Result<()> {
        let username = username.to_string();
        let token = token.to_string();

        let res = self
            .db
            .query(
                r#"
                BEGIN TRANSACTION;
                DELETE session WHERE username = $username;
                CREATE session SET
                    token = $session_token,
                    username = $username,
                    created_at = $created_at;
                COMMIT TRANSACTION;
                "#,
            )
            .bind(("username", username))
            .bind(("session_token", token))
            .bind(("created_at", created_at))
            .await?;

        res.check()?;
        Ok(())
    }

    /// Look up a session by its token.
    pub async fn find_session(&self, token: &str) -> Result<Option<SessionRecord>> {
        let token = token.to_string();

        let mut res = self
            .db
            .query("SELECT * FROM session WHERE token = $session_token LIMIT 1")
            .bind(("session_token", token))
            .await?;

        let sessions: Vec<SessionRecord> = res.take(0)?;
        Ok(sessions.into_iter().next())
    }

    /// Delete a session by token. Idempotent: deleting an absent token is
    /// not an error.
    pub async fn delete_session(&self, token: &str) -> Result<()> {
        let token = token.to_string();

        self.db
            .query("DELETE session WHERE token = $session_token")
            .bind(("session_token", token))
            .await?;

        Ok(())
    }

    /// All live sessions owned by a username.
    pub async fn sessions_for(&self, username: &str) -> Result<Vec<SessionRecord>> {
        let username = username.to_string();

        let mut res = self
            .db
            .query("SELECT * FROM session WHERE username = $username")
            .bind(("username", username))
            .await?;

        let sessions: Vec<SessionRecord> = res.take(0)?;
        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DatabaseConfig, create_connection, ensure_schema};

    async fn setup_test_store() -> CredentialStore {
        let config = DatabaseConfig {
            url: "memory".to_string(),
            ..Default::default()
        };
        let db = create_connection(config).await.unwrap();
        ensure_schema(&db).await.unwrap();
        CredentialStore::new(db)
    }

    #[tokio::test]
    async fn test_create_and_find_user() {
        let store = setup_test_store().await;

        assert!(!store.is_registered("alice").await.unwrap());

        let user = store.create_user("alice", "$2b$12$fakehash").await.unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.password_hash, "$2b$12$fakehash");

        assert!(store.is_registered("alice").await.unwrap());
        assert_eq!(
            store.fetch_hash("alice").await.unwrap(),
            Some("$2b$12$fakehash".to_string())
        );
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let store = setup_test_store().await;

        store.create_user("alice", "hash1").await.unwrap();
        let dup = store.create_user("alice", "hash2").await;
        assert!(dup.is_err());

        // The original hash must be untouched
        assert_eq!(
            store.fetch_hash("alice").await.unwrap(),
            Some("hash1".to_string())
        );
    }

    #[tokio::test]
    async fn test_fetch_hash_unknown_user() {
        let store = setup_test_store().await;
        assert_eq!(store.fetch_hash("ghost").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_replace_session_keeps_single_token() {
        let store = setup_test_store().await;

        store.replace_session("alice", "token-one", 100).await.unwrap();
        store.replace_session("alice", "token-two", 200).await.unwrap();

        let sessions = store.sessions_for("alice").await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].token, "token-two");
        assert_eq!(sessions[0].created_at, 200);

        assert!(store.find_session("token-one").await.unwrap().is_none());
        assert!(store.find_session("token-two").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_sessions_are_per_user() {
        let store = setup_test_store().await;

        store.replace_session("alice", "token-a", 100).await.unwrap();
        store.replace_session("bob", "token-b", 100).await.unwrap();

        assert_eq!(store.sessions_for("alice").await.unwrap().len(), 1);
        assert_eq!(store.sessions_for("bob").await.unwrap().len(), 1);

        // Replacing alice's session must not touch bob's
        store.replace_session("alice", "token-a2", 200).await.unwrap();
        assert!(store.find_session("token-b").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_session_idempotent() {
        let store = setup_test_store().await;

        store.replace_session("alice", "token-a", 100).await.unwrap();
        store.delete_session("token-a").await.unwrap();
        assert!(store.find_session("token-a").await.unwrap().is_none());

        // Second delete is a no-op, not an error
        store.delete_session("token-a").await.unwrap();
        store.delete_session("never-existed").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_user_cascades_sessions() {
        let store = setup_test_store().await;

        store.create_user("alice", "hash").await.unwrap();
        store.replace_session("alice", "token-a", 100).await.unwrap();

        store.delete_user("alice").await.unwrap();

        assert!(!store.is_registered("alice").await.unwrap());
        assert!(store.find_session("token-a").await.unwrap().is_none());
        assert!(store.sessions_for("alice").await.unwrap().is_empty());
    }
}
