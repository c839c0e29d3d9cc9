use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::token::TokenRecord;
use crate::store::{StoreError, TokenStore};

/// Random bytes per token; rendered as twice as many hex characters.
const TOKEN_BYTES: usize = 32;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS tokens (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id    TEXT NOT NULL UNIQUE,
    user       TEXT NOT NULL CHECK (length(trim(user)) > 0),
    api_name   TEXT NOT NULL CHECK (length(trim(api_name)) > 0),
    token      TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL,
    expires_at TEXT,
    UNIQUE (user, api_name)
)
"#;

/// Credential store backed by a single SQLite file.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `path` and ensure the schema.
    pub async fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init().await?;
        Ok(store)
    }

    /// In-memory store on a single connection, for tests. The database lives
    /// only as long as that connection, so it is never idled out or recycled.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.init().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Idempotent; never drops existing rows.
    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl TokenStore for SqliteStore {
    async fn issue(
        &self,
        user: &str,
        api_name: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<String, StoreError> {
        if user.trim().is_empty() {
            return Err(StoreError::InvalidInput("user must not be empty".into()));
        }
        if api_name.trim().is_empty() {
            return Err(StoreError::InvalidInput("api_name must not be empty".into()));
        }

        let token = generate_token();
        let user_id = Uuid::new_v4().to_string();

        let result = sqlx::query(
            r#"INSERT INTO tokens (user_id, user, api_name, token, created_at, expires_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&user_id)
        .bind(user)
        .bind(api_name)
        .bind(&token)
        .bind(Utc::now())
        .bind(expires_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                tracing::info!(user, api_name, %user_id, "issued token");
                Ok(token)
            }
            Err(sqlx::Error::Database(db)) if is_pair_collision(db.as_ref()) => {
                Err(StoreError::DuplicateCredential {
                    user: user.to_string(),
                    api_name: api_name.to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn validate(&self, token: &str) -> Result<bool, StoreError> {
        let found = sqlx::query_scalar::<_, i64>("SELECT 1 FROM tokens WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    async fn resolve_owner(&self, token: &str) -> Result<Option<String>, StoreError> {
        let user = sqlx::query_scalar::<_, String>("SELECT user FROM tokens WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn list(&self) -> Result<Vec<TokenRecord>, StoreError> {
        let rows = sqlx::query_as::<_, TokenRecord>(
            "SELECT user_id, user, api_name, token, created_at, expires_at FROM tokens ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn revoke(&self, user: &str, api_name: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM tokens WHERE user = ? AND api_name = ?")
            .bind(user)
            .bind(api_name)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                user: user.to_string(),
                api_name: api_name.to_string(),
            });
        }

        tracing::info!(user, api_name, "revoked token");
        Ok(())
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// SQLite reports which columns collided, e.g.
/// `UNIQUE constraint failed: tokens.user, tokens.api_name`.
fn is_pair_collision(err: &dyn sqlx::error::DatabaseError) -> bool {
    err.is_unique_violation() && err.message().contains("tokens.api_name")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_connection_is_never_recycled() {
        let store = SqliteStore::in_memory().await.unwrap();
        let options = store.pool().options();
        assert_eq!(options.get_max_connections(), 1);
        assert_eq!(options.get_min_connections(), 1);
        assert!(options.get_idle_timeout().is_none());
        assert!(options.get_max_lifetime().is_none());
    }
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_issued_token_validates() {
        let store = SqliteStore::in_memory().await.unwrap();
        let token = store.issue("alice", "notebook", None).await.unwrap();

        assert_eq!(token.len(), TOKEN_BYTES * 2);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert!(store.validate(&token).await.unwrap());
        assert_eq!(
            store.resolve_owner(&token).await.unwrap().as_deref(),
            Some("alice")
        );
    }

    #[tokio::test]
    async fn test_validate_is_exact_match() {
        let store = SqliteStore::in_memory().await.unwrap();
        let token = store.issue("alice", "notebook", None).await.unwrap();

        assert!(!store.validate(&token[..32]).await.unwrap());
        assert!(!store.validate(&token.to_uppercase()).await.unwrap());
        assert!(!store.validate("").await.unwrap());
        assert!(store.resolve_owner("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_pair_rejected_without_side_effects() {
        let store = SqliteStore::in_memory().await.unwrap();
        let first = store.issue("alice", "notebook", None).await.unwrap();

        let err = store.issue("alice", "notebook", None).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateCredential { .. }));

        let records = store.list().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].token, first);
    }

    #[tokio::test]
    async fn test_same_user_different_api_names() {
        let store = SqliteStore::in_memory().await.unwrap();
        let a = store.issue("alice", "notebook", None).await.unwrap();
        let b = store.issue("alice", "ci", None).await.unwrap();
        assert_ne!(a, b);

        let records = store.list().await.unwrap();
        assert_ne!(records[0].user_id, records[1].user_id);
    }

    #[tokio::test]
    async fn test_empty_names_rejected() {
        let store = SqliteStore::in_memory().await.unwrap();
        assert!(matches!(
            store.issue("", "notebook", None).await,
            Err(StoreError::InvalidInput(_))
        ));
        assert!(matches!(
            store.issue("alice", "   ", None).await,
            Err(StoreError::InvalidInput(_))
        ));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_in_issuance_order_with_expiry() {
        let store = SqliteStore::in_memory().await.unwrap();
        let expiry = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        store.issue("carol", "a", None).await.unwrap();
        store.issue("alice", "b", Some(expiry)).await.unwrap();
        store.issue("bob", "c", None).await.unwrap();

        let records = store.list().await.unwrap();
        let users: Vec<&str> = records.iter().map(|r| r.user.as_str()).collect();
        assert_eq!(users, vec!["carol", "alice", "bob"]);
        assert_eq!(records[1].expires_at, Some(expiry));
        assert!(records[0].expires_at.is_none());
    }

    #[tokio::test]
    async fn test_expired_token_still_validates() {
        let store = SqliteStore::in_memory().await.unwrap();
        let past = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        let token = store.issue("alice", "old", Some(past)).await.unwrap();
        assert!(store.validate(&token).await.unwrap());
    }

    #[tokio::test]
    async fn test_revoke_invalidates_token() {
        let store = SqliteStore::in_memory().await.unwrap();
        let token = store.issue("alice", "notebook", None).await.unwrap();

        store.revoke("alice", "notebook").await.unwrap();
        assert!(!store.validate(&token).await.unwrap());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_revoke_missing_pair_is_not_found() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.issue("alice", "notebook", None).await.unwrap();

        let err = store.revoke("alice", "other").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reissue_after_revoke_rotates_secret() {
        let store = SqliteStore::in_memory().await.unwrap();
        let old = store.issue("alice", "notebook", None).await.unwrap();
        store.revoke("alice", "notebook").await.unwrap();
        let new = store.issue("alice", "notebook", None).await.unwrap();

        assert_ne!(old, new);
        assert!(!store.validate(&old).await.unwrap());
        assert!(store.validate(&new).await.unwrap());
    }

    #[tokio::test]
    async fn test_init_is_idempotent() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.issue("alice", "notebook", None).await.unwrap();
        store.init().await.unwrap();
        assert_eq!(store.list().await.unwrap().len(), 1);
    }
}
