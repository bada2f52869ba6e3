use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use surrealdb::Surreal;
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::Root;

pub type Db = Surreal<Any>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: env::var("AUTHGATE_DB_URL").unwrap_or_else(|_| "memory".to_string()),
            namespace: env::var("AUTHGATE_DB_NAMESPACE").unwrap_or_else(|_| "authgate".to_string()),
            database: env::var("AUTHGATE_DB_NAME").unwrap_or_else(|_| "gateway".to_string()),
            username: env::var("AUTHGATE_DB_USERNAME").ok(),
            password: env::var("AUTHGATE_DB_PASSWORD").ok(),
        }
    }
}

pub async fn create_connection(config: DatabaseConfig) -> Result<Db> {
    let db = surrealdb::engine::any::connect(config.url).await?;

    // Sign in if credentials are provided
    if let (Some(username), Some(password)) = (config.username, config.password) {
        db.signin(Root {
            username: &username,
            password: &password,
        })
        .await?;
    }

    db.use_ns(config.namespace).use_db(config.database).await?;

    Ok(db)
}

pub async fn ensure_schema(db: &Db) -> Result<()> {
    let schema_queries = vec![
        // Registered accounts. Usernames are case-sensitive and unique.
        "DEFINE TABLE user SCHEMAFULL;
         DEFINE FIELD username ON TABLE user TYPE string;
         DEFINE FIELD password_hash ON TABLE user TYPE string;
         DEFINE FIELD created_at ON TABLE user VALUE time::now();",
        // Live bearer tokens. created_at is UTC epoch seconds so expiry
        // checks are plain integer arithmetic, no timestamp parsing.
        "DEFINE TABLE session SCHEMAFULL;
         DEFINE FIELD token ON TABLE session TYPE string;
         DEFINE FIELD username ON TABLE session TYPE string;
         DEFINE FIELD created_at ON TABLE session TYPE int;",
        // Unique indexes double as integrity guards: the username index
        // closes the check-then-create race on concurrent registration.
        "DEFINE INDEX user_username ON TABLE user COLUMNS username UNIQUE;
         DEFINE INDEX session_token ON TABLE session COLUMNS token UNIQUE;
         DEFINE INDEX session_username ON TABLE session COLUMNS username;",
    ];

    for query in schema_queries {
        db.query(query).await?;
    }

    Ok(())
}
