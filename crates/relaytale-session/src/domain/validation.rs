//! Input validation at the edge of the state machine.
//!
//! Each function returns the normalized value or `DomainError::Validation`.

use relaytale_core::error::DomainError;

/// Smallest lobby.
pub const MIN_USER_LIMIT: u32 = 2;
/// Largest lobby.
pub const MAX_USER_LIMIT: u32 = 10;
/// Shortest round.
pub const MIN_TIME_LIMIT_MINUTES: u32 = 1;
/// Longest round.
pub const MAX_TIME_LIMIT_MINUTES: u32 = 24 * 60;
/// Longest game name, in characters.
pub const MAX_GAME_NAME_CHARS: usize = 64;
/// Longest in-game name, in characters.
pub const MAX_DISPLAY_NAME_CHARS: usize = 32;
/// Longest caller-supplied user id, in characters.
pub const MAX_USER_ID_CHARS: usize = 128;
/// Longest story line, in characters.
pub const MAX_LINE_CHARS: usize = 1000;

fn bounded_text(field: &str, raw: &str, max_chars: usize) -> Result<String, DomainError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::Validation(format!("{field} must not be empty")));
    }
    if trimmed.chars().count() > max_chars {
        return Err(DomainError::Validation(format!(
            "{field} must be at most {max_chars} characters"
        )));
    }
    Ok(trimmed.to_owned())
}

/// Validates a game name.
///
/// # Errors
///
/// Returns `DomainError::Validation` if empty or too long.
pub fn game_name(raw: &str) -> Result<String, DomainError> {
    bounded_text("game name", raw, MAX_GAME_NAME_CHARS)
}

/// Validates an in-game display name.
///
/// # Errors
///
/// Returns `DomainError::Validation` if empty or too long.
pub fn display_name(raw: &str) -> Result<String, DomainError> {
    bounded_text("player name", raw, MAX_DISPLAY_NAME_CHARS)
}

/// Validates an opaque user id. The id is not trimmed: it is compared
/// byte-for-byte.
///
/// # Errors
///
/// Returns `DomainError::Validation` if blank or too long.
pub fn user_id(raw: &str) -> Result<String, DomainError> {
    bounded_text("user id", raw, MAX_USER_ID_CHARS)?;
    Ok(raw.to_owned())
}

/// Validates the story line of a submission.
///
/// # Errors
///
/// Returns `DomainError::Validation` if empty or too long.
pub fn line_content(raw: &str) -> Result<String, DomainError> {
    bounded_text("content", raw, MAX_LINE_CHARS)
}

/// Validates the lobby capacity.
///
/// # Errors
///
/// Returns `DomainError::Validation` outside `2..=10`.
pub fn user_limit(value: u32) -> Result<u32, DomainError> {
    if (MIN_USER_LIMIT..=MAX_USER_LIMIT).contains(&value) {
        Ok(value)
    } else {
        Err(DomainError::Validation(format!(
            "user limit must be between {MIN_USER_LIMIT} and {MAX_USER_LIMIT}"
        )))
    }
}

/// Validates the round duration.
///
/// # Errors
///
/// Returns `DomainError::Validation` outside `1..=1440` minutes.
pub fn time_limit_minutes(value: u32) -> Result<u32, DomainError> {
    if (MIN_TIME_LIMIT_MINUTES..=MAX_TIME_LIMIT_MINUTES).contains(&value) {
        Ok(value)
    } else {
        Err(DomainError::Validation(format!(
            "time limit must be between {MIN_TIME_LIMIT_MINUTES} and {MAX_TIME_LIMIT_MINUTES} minutes"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_trimmed() {
        assert_eq!(display_name("  Mio ").unwrap(), "Mio");
        assert_eq!(game_name("\tFables\n").unwrap(), "Fables");
    }

    #[test]
    fn test_blank_values_are_rejected() {
        assert!(matches!(display_name("   "), Err(DomainError::Validation(_))));
        assert!(matches!(line_content(""), Err(DomainError::Validation(_))));
        assert!(matches!(user_id(" "), Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_length_is_counted_in_characters() {
        let name = "物".repeat(MAX_DISPLAY_NAME_CHARS);
        assert!(display_name(&name).is_ok());

        let too_long = "物".repeat(MAX_DISPLAY_NAME_CHARS + 1);
        assert!(display_name(&too_long).is_err());
    }

    #[test]
    fn test_user_limit_bounds() {
        assert!(user_limit(1).is_err());
        assert_eq!(user_limit(2).unwrap(), 2);
        assert_eq!(user_limit(10).unwrap(), 10);
        assert!(user_limit(11).is_err());
    }

    #[test]
    fn test_time_limit_bounds() {
        assert!(time_limit_minutes(0).is_err());
        assert_eq!(time_limit_minutes(1).unwrap(), 1);
        assert!(time_limit_minutes(MAX_TIME_LIMIT_MINUTES + 1).is_err());
    }

    #[test]
    fn test_user_id_is_kept_verbatim() {
        assert_eq!(user_id(" u-1").unwrap(), " u-1");
    }
}
