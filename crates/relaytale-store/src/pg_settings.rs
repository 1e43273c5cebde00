//! `PostgreSQL` implementation of the `SettingsProvider` trait.

use async_trait::async_trait;
use sqlx::PgPool;

use relaytale_core::error::DomainError;
use relaytale_core::settings::SettingsProvider;

/// Settings stored as key/value rows in the `settings` table.
#[derive(Debug, Clone)]
pub struct PgSettingsProvider {
    pool: PgPool,
}

impl PgSettingsProvider {
    /// Creates a new `PgSettingsProvider`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsProvider for PgSettingsProvider {
    async fn get_setting(&self, key: &str) -> Result<Option<String>, DomainError> {
        sqlx::query_scalar("SELECT value FROM settings WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::Infrastructure(format!("failed to read setting {key}: {e}")))
    }
}
