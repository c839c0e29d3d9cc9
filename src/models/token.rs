use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One issued credential as persisted in the `tokens` table.
///
/// The secret is never serialized and is redacted from `Debug` output so a
/// record can be logged or rendered without leaking it.
#[derive(Clone, Serialize, sqlx::FromRow)]
pub struct TokenRecord {
    pub user_id: String,
    pub user: String,
    pub api_name: String,
    #[serde(skip_serializing)]
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for TokenRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRecord")
            .field("user_id", &self.user_id)
            .field("user", &self.user)
            .field("api_name", &self.api_name)
            .field("token", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
