//! Game tunables read from the settings collaborator on every evaluation.

use chrono::TimeDelta;
use relaytale_core::error::DomainError;
use relaytale_core::settings::{DEFAULT_TIME_LIMIT_MIN, DISCONNECT_TIMEOUT_SEC, SettingsProvider};
use tracing::warn;

/// Disconnect timeout used when the setting is missing or unusable.
pub const DEFAULT_DISCONNECT_TIMEOUT_SEC: i64 = 30;

/// Round duration used when the setting is missing or unusable.
pub const DEFAULT_TIME_LIMIT_MINUTES: u32 = 3;

async fn positive_setting<T>(
    settings: &dyn SettingsProvider,
    key: &str,
    default: T,
) -> Result<T, DomainError>
where
    T: std::str::FromStr + PartialOrd + Default + Copy + std::fmt::Display,
{
    let Some(raw) = settings.get_setting(key).await? else {
        return Ok(default);
    };
    match raw.trim().parse::<T>() {
        Ok(value) if value > T::default() => Ok(value),
        _ => {
            warn!(key, value = %raw, fallback = %default, "ignoring unusable setting");
            Ok(default)
        }
    }
}

/// How long a member may go without a heartbeat before the sweep marks
/// them inactive.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the settings lookup fails.
pub async fn disconnect_timeout(settings: &dyn SettingsProvider) -> Result<TimeDelta, DomainError> {
    let seconds =
        positive_setting(settings, DISCONNECT_TIMEOUT_SEC, DEFAULT_DISCONNECT_TIMEOUT_SEC).await?;
    Ok(TimeDelta::seconds(seconds))
}

/// Round duration applied when a session is created without one.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the settings lookup fails.
pub async fn default_time_limit_minutes(
    settings: &dyn SettingsProvider,
) -> Result<u32, DomainError> {
    positive_setting(settings, DEFAULT_TIME_LIMIT_MIN, DEFAULT_TIME_LIMIT_MINUTES).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaytale_test_support::StaticSettings;

    #[tokio::test]
    async fn test_missing_settings_use_defaults() {
        let settings = StaticSettings::empty();

        assert_eq!(
            disconnect_timeout(&settings).await.unwrap(),
            TimeDelta::seconds(30)
        );
        assert_eq!(default_time_limit_minutes(&settings).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_configured_values_are_parsed() {
        let settings =
            StaticSettings::with(&[(DISCONNECT_TIMEOUT_SEC, " 90 "), (DEFAULT_TIME_LIMIT_MIN, "5")]);

        assert_eq!(
            disconnect_timeout(&settings).await.unwrap(),
            TimeDelta::seconds(90)
        );
        assert_eq!(default_time_limit_minutes(&settings).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_unusable_values_fall_back_to_defaults() {
        let settings =
            StaticSettings::with(&[(DISCONNECT_TIMEOUT_SEC, "soon"), (DEFAULT_TIME_LIMIT_MIN, "0")]);

        assert_eq!(
            disconnect_timeout(&settings).await.unwrap(),
            TimeDelta::seconds(30)
        );
        assert_eq!(default_time_limit_minutes(&settings).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_values_are_read_on_every_call() {
        let settings = StaticSettings::empty();
        assert_eq!(
            disconnect_timeout(&settings).await.unwrap(),
            TimeDelta::seconds(30)
        );

        settings.set(DISCONNECT_TIMEOUT_SEC, "10");

        assert_eq!(
            disconnect_timeout(&settings).await.unwrap(),
            TimeDelta::seconds(10)
        );
    }
}
