//! Settings lookup abstraction.
//!
//! Tunables are stored as strings and parsed by the caller on every
//! evaluation, so an operator can change them while games are running.

use async_trait::async_trait;

use crate::error::DomainError;

/// Seconds without a heartbeat after which a member is considered gone.
pub const DISCONNECT_TIMEOUT_SEC: &str = "DISCONNECT_TIMEOUT_SEC";

/// Round duration used when a session is created without one.
pub const DEFAULT_TIME_LIMIT_MIN: &str = "DEFAULT_TIME_LIMIT_MIN";

/// Key/value settings collaborator.
#[async_trait]
pub trait SettingsProvider: Send + Sync {
    /// Returns the raw value stored under `key`, if any.
    async fn get_setting(&self, key: &str) -> Result<Option<String>, DomainError>;
}
