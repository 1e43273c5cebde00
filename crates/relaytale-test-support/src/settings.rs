//! Test settings — an in-memory `SettingsProvider`.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use relaytale_core::error::DomainError;
use relaytale_core::settings::SettingsProvider;

/// A settings provider backed by a map that tests can mutate between
/// evaluations.
#[derive(Debug, Default)]
pub struct StaticSettings(Mutex<HashMap<String, String>>);

impl StaticSettings {
    /// Creates a provider with no settings, so every lookup falls back to
    /// its default.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a provider seeded with `entries`.
    #[must_use]
    pub fn with(entries: &[(&str, &str)]) -> Self {
        let map = entries
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        Self(Mutex::new(map))
    }

    /// Overwrites a single setting.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn set(&self, key: &str, value: &str) {
        self.0
            .lock()
            .unwrap()
            .insert(key.to_owned(), value.to_owned());
    }
}

#[async_trait]
impl SettingsProvider for StaticSettings {
    async fn get_setting(&self, key: &str) -> Result<Option<String>, DomainError> {
        Ok(self.0.lock().unwrap().get(key).cloned())
    }
}
