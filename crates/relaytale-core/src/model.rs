//! Persistent records of a relay-writing game.
//!
//! All records are scoped by `session_id`; the session is the unit of
//! lifecycle.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle phase of a game session. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    /// Lobby: players join, nothing is written yet.
    Waiting,
    /// Rounds are being played.
    InProgress,
    /// Terminal.
    Ended,
}

impl GamePhase {
    /// Numeric code used by the persistent store.
    #[must_use]
    pub fn code(self) -> i16 {
        match self {
            Self::Waiting => 0,
            Self::InProgress => 1,
            Self::Ended => 2,
        }
    }

    /// Inverse of [`GamePhase::code`].
    #[must_use]
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(Self::Waiting),
            1 => Some(Self::InProgress),
            2 => Some(Self::Ended),
            _ => None,
        }
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Waiting => "waiting",
            Self::InProgress => "in_progress",
            Self::Ended => "ended",
        })
    }
}

/// How a session decides that a round is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressMode {
    /// Advance once every active player has marked ready.
    AllReady,
    /// Advance when the round's time limit has elapsed.
    TimeLimit,
}

impl ProgressMode {
    /// Stable string form used by the store and the wire format.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AllReady => "all_ready",
            Self::TimeLimit => "time_limit",
        }
    }

    /// Inverse of [`ProgressMode::as_str`].
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "all_ready" => Some(Self::AllReady),
            "time_limit" => Some(Self::TimeLimit),
            _ => None,
        }
    }
}

/// One instance of the game.
///
/// `current_round > 0` iff `phase == InProgress`; `ended_at` is set iff
/// `phase == Ended`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameSession {
    /// Session identifier.
    pub session_id: Uuid,
    /// Display name of the game.
    pub game_name: String,
    /// Maximum number of lobby members (2–10).
    pub user_limit: u32,
    /// Round duration in minutes (≥ 1).
    pub time_limit_minutes: u32,
    /// Lifecycle phase.
    pub phase: GamePhase,
    /// Current round; 0 unless in progress.
    pub current_round: u32,
    /// Number of stories (seats) created at start; 0 while waiting.
    pub seat_count: u32,
    /// Round advance policy.
    pub progress_mode: ProgressMode,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// When the game started.
    pub started_at: Option<DateTime<Utc>>,
    /// When the game ended.
    pub ended_at: Option<DateTime<Utc>>,
}

impl GameSession {
    /// The duration of a single round in time-limit mode.
    #[must_use]
    pub fn round_duration(&self) -> TimeDelta {
        TimeDelta::minutes(i64::from(self.time_limit_minutes))
    }

    /// When the current round started, under the time-limit schedule
    /// `started_at + (current_round - 1) * round_duration`.
    #[must_use]
    pub fn round_started_at(&self) -> Option<DateTime<Utc>> {
        let started_at = self.started_at?;
        if self.current_round == 0 {
            return None;
        }
        let elapsed_rounds = i32::try_from(self.current_round - 1).unwrap_or(i32::MAX);
        Some(started_at + self.round_duration() * elapsed_rounds)
    }
}

/// Per (session, user) record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Membership {
    /// Owning session.
    pub session_id: Uuid,
    /// Caller-supplied opaque identity.
    pub user_id: String,
    /// Rotation position, dense `1..N` after start.
    pub join_order: u32,
    /// In-game display name.
    pub display_name: String,
    /// Last heartbeat.
    pub last_active_at: DateTime<Utc>,
    /// Presence flag derived from the heartbeat threshold.
    pub is_active: bool,
}

/// One of the parallel stories, created at game start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Story {
    /// Story identifier.
    pub story_id: Uuid,
    /// Owning session.
    pub session_id: Uuid,
    /// Index in `[0, seat_count)`.
    pub story_index: u32,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// A single line of a story. `text_order` is the round number; order 1 is
/// the title. At most one line exists per (story, order).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoryText {
    /// Line identifier.
    pub text_id: Uuid,
    /// The story this line belongs to.
    pub story_id: Uuid,
    /// Who wrote it; retained after the author's seat is taken over.
    pub author_user_id: String,
    /// Round in which it was written.
    pub text_order: u32,
    /// The line itself.
    pub content: String,
    /// Time of the latest write.
    pub created_at: DateTime<Utc>,
}

/// "This user has finished their line for this round."
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundReady {
    /// Owning session.
    pub session_id: Uuid,
    /// Round the marker applies to.
    pub round: u32,
    /// Who marked ready.
    pub user_id: String,
    /// When.
    pub ready_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn session_started_at(started_at: DateTime<Utc>, round: u32) -> GameSession {
        GameSession {
            session_id: Uuid::new_v4(),
            game_name: "fables".to_owned(),
            user_limit: 4,
            time_limit_minutes: 2,
            phase: GamePhase::InProgress,
            current_round: round,
            seat_count: 3,
            progress_mode: ProgressMode::TimeLimit,
            created_at: started_at,
            started_at: Some(started_at),
            ended_at: None,
        }
    }

    #[test]
    fn test_phase_codes_round_trip() {
        for phase in [GamePhase::Waiting, GamePhase::InProgress, GamePhase::Ended] {
            assert_eq!(GamePhase::from_code(phase.code()), Some(phase));
        }
        assert_eq!(GamePhase::from_code(7), None);
    }

    #[test]
    fn test_phases_are_ordered_by_lifecycle() {
        assert!(GamePhase::Waiting < GamePhase::InProgress);
        assert!(GamePhase::InProgress < GamePhase::Ended);
    }

    #[test]
    fn test_progress_mode_parses_store_form() {
        assert_eq!(ProgressMode::parse("all_ready"), Some(ProgressMode::AllReady));
        assert_eq!(ProgressMode::parse("time_limit"), Some(ProgressMode::TimeLimit));
        assert_eq!(ProgressMode::parse("AllReady"), None);
    }

    #[test]
    fn test_round_started_at_follows_time_limit_schedule() {
        let started_at = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        let session = session_started_at(started_at, 3);

        assert_eq!(
            session.round_started_at(),
            Some(Utc.with_ymd_and_hms(2026, 1, 15, 10, 4, 0).unwrap())
        );
    }

    #[test]
    fn test_round_started_at_is_none_before_start() {
        let started_at = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        let mut session = session_started_at(started_at, 0);
        session.started_at = None;

        assert_eq!(session.round_started_at(), None);
    }
}
