pub mod export;
pub mod sqlite;

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::token::TokenRecord;

pub use export::ExportOutcome;
pub use sqlite::SqliteStore;

/// Outcomes of credential-store operations. `DuplicateCredential` and
/// `NotFound` are ordinary results callers are expected to branch on;
/// `Database` and `Io` are genuine failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user {user} with API {api_name} already exists")]
    DuplicateCredential { user: String, api_name: String },

    #[error("no such pair: user {user} with API {api_name}")]
    NotFound { user: String, api_name: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("export failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Persistent set of issued API tokens.
///
/// Implementations must make `issue` and `revoke` atomic per
/// (`user`, `api_name`) key and persist before returning.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Create a credential and return its secret.
    async fn issue(
        &self,
        user: &str,
        api_name: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<String, StoreError>;

    /// Exact-match lookup. Expiry is informational and not checked here.
    async fn validate(&self, token: &str) -> Result<bool, StoreError>;

    async fn resolve_owner(&self, token: &str) -> Result<Option<String>, StoreError>;

    /// All records in issuance order.
    async fn list(&self) -> Result<Vec<TokenRecord>, StoreError>;

    async fn revoke(&self, user: &str, api_name: &str) -> Result<(), StoreError>;

    /// Write `list()` as CSV to `dest`.
    async fn export(&self, dest: &Path) -> Result<ExportOutcome, StoreError> {
        let records = self.list().await?;
        export::write_csv(dest, &records).await
    }
}
