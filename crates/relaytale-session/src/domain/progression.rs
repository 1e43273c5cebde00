//! Round progression rules.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use relaytale_core::model::{GamePhase, GameSession, Membership, ProgressMode};

/// What happens when the current round is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundStep {
    /// Move to the given round.
    Advance {
        /// The round after the current one.
        to_round: u32,
    },
    /// Every story has been through every player; the game ends.
    End,
}

/// Decides the transition out of `current_round` when the game has
/// `total_rounds` rounds.
#[must_use]
pub fn next_step(current_round: u32, total_rounds: u32) -> RoundStep {
    let to_round = current_round.saturating_add(1);
    if to_round > total_rounds {
        RoundStep::End
    } else {
        RoundStep::Advance { to_round }
    }
}

/// `true` once the current round of a time-limited game has run for its
/// full duration.
#[must_use]
pub fn time_limit_elapsed(session: &GameSession, now: DateTime<Utc>) -> bool {
    if session.phase != GamePhase::InProgress || session.progress_mode != ProgressMode::TimeLimit {
        return false;
    }
    let Some(round_started_at) = session.round_started_at() else {
        return false;
    };
    now - round_started_at >= session.round_duration()
}

/// `true` when every active member has a ready marker. Markers from members
/// who are no longer active are ignored; an empty active set is never ready.
#[must_use]
pub fn everyone_ready<'a>(
    active: &[Membership],
    ready_user_ids: impl IntoIterator<Item = &'a str>,
) -> bool {
    let ready: HashSet<&str> = ready_user_ids.into_iter().collect();
    !active.is_empty() && active.iter().all(|m| ready.contains(m.user_id.as_str()))
}
