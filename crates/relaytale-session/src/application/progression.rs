//! Round progression: session creation, game start, readiness and round
//! advance.
//!
//! Every transition is a conditional write keyed on the round that was
//! evaluated, so two requests racing on the same round advance it once.

use std::sync::Mutex;

use relaytale_core::clock::Clock;
use relaytale_core::command::Command;
use relaytale_core::error::DomainError;
use relaytale_core::model::{GamePhase, GameSession, Membership, ProgressMode, RoundReady, Story};
use relaytale_core::repository::{GameRepository, SessionStart};
use relaytale_core::rng::DeterministicRng;
use relaytale_core::settings::SettingsProvider;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::entry_words::allocate_entry_word;
use crate::application::presence::{players_in_play, sweep_presence};
use crate::application::tunables::default_time_limit_minutes;
use crate::application::{load_member, load_session, require_phase};
use crate::domain::commands::{CreateSession, MarkReady, StartGame};
use crate::domain::progression::{RoundStep, everyone_ready, next_step, time_limit_elapsed};
use crate::domain::seating::{compact_join_order, holds_seat};
use crate::domain::validation;

/// Minimum number of active members needed to start.
pub const MIN_PLAYERS: usize = 2;

/// Result of `CreateSession`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedSession {
    /// The new session.
    pub session_id: Uuid,
    /// The word other players join with.
    pub entry_word: String,
}

/// Result of `StartGame`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StartedGame {
    /// Number of seats (and stories) in play.
    pub player_count: u32,
}

/// Result of `MarkReady`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ReadyOutcome {
    /// This call moved the session to the next round.
    pub advanced_to_next_round: bool,
    /// This call ended the game.
    pub game_ended: bool,
}

/// What an advance attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundAdvance {
    /// The session moved to `to_round`.
    Advanced {
        /// The new current round.
        to_round: u32,
    },
    /// The session ended.
    Ended,
    /// Another request already moved the session off the evaluated round.
    Lost,
}

impl From<RoundAdvance> for ReadyOutcome {
    fn from(advance: RoundAdvance) -> Self {
        match advance {
            RoundAdvance::Advanced { .. } => Self {
                advanced_to_next_round: true,
                game_ended: false,
            },
            RoundAdvance::Ended => Self {
                advanced_to_next_round: false,
                game_ended: true,
            },
            RoundAdvance::Lost => Self::default(),
        }
    }
}

/// Handles the `CreateSession` command: validates the settings, claims an
/// entry word, and seats the creator at join order 1.
///
/// # Errors
///
/// Returns `DomainError::Validation` for malformed input,
/// `DomainError::EntryWordExhausted` if no unique word could be found, or
/// `DomainError::Infrastructure` if a collaborator fails.
pub async fn handle_create_session(
    command: &CreateSession,
    clock: &dyn Clock,
    rng: &Mutex<dyn DeterministicRng + Send>,
    settings: &dyn SettingsProvider,
    repo: &dyn GameRepository,
) -> Result<CreatedSession, DomainError> {
    let game_name = validation::game_name(&command.game_name)?;
    let creator_name = validation::display_name(&command.creator_name)?;
    let creator_user_id = validation::user_id(&command.creator_user_id)?;
    let user_limit = validation::user_limit(command.user_limit)?;
    let time_limit_minutes = match command.time_limit_minutes {
        Some(minutes) => validation::time_limit_minutes(minutes)?,
        None => default_time_limit_minutes(settings).await?,
    };

    let session_id = Uuid::new_v4();
    let now = clock.now();
    let entry_word = allocate_entry_word(session_id, rng, repo).await?;

    let session = GameSession {
        session_id,
        game_name,
        user_limit,
        time_limit_minutes,
        phase: GamePhase::Waiting,
        current_round: 0,
        seat_count: 0,
        progress_mode: command.progress_mode,
        created_at: now,
        started_at: None,
        ended_at: None,
    };
    if let Err(e) = repo.insert_session(&session).await {
        if let Err(release) = repo.release_entry_word(session_id).await {
            warn!(%session_id, error = %release, "failed to release entry word");
        }
        return Err(e);
    }

    let creator = Membership {
        session_id,
        user_id: creator_user_id,
        join_order: 1,
        display_name: creator_name,
        last_active_at: now,
        is_active: true,
    };
    if !repo.insert_membership(&creator).await? {
        return Err(DomainError::ConcurrencyConflict { session_id });
    }

    info!(
        correlation_id = %command.correlation_id(),
        %session_id,
        entry_word = %entry_word,
        progress_mode = command.progress_mode.as_str(),
        "session created"
    );
    Ok(CreatedSession {
        session_id,
        entry_word,
    })
}

/// Handles the `StartGame` command: sweeps presence, compacts the join
/// order and creates one story per active member.
///
/// # Errors
///
/// Returns `DomainError::SessionNotFound`, `DomainError::InvalidPhase`,
/// `DomainError::NotCreator`, `DomainError::InsufficientPlayers`, or
/// `DomainError::Infrastructure` if a collaborator fails.
pub async fn handle_start_game(
    command: &StartGame,
    clock: &dyn Clock,
    settings: &dyn SettingsProvider,
    repo: &dyn GameRepository,
) -> Result<StartedGame, DomainError> {
    let session_id = command.session_id;
    let session = load_session(repo, session_id).await?;
    require_phase(&session, GamePhase::Waiting)?;

    let is_creator = repo
        .get_membership(session_id, &command.user_id)
        .await?
        .is_some_and(|m| m.join_order == 1);
    if !is_creator {
        return Err(DomainError::NotCreator {
            session_id,
            user_id: command.user_id.clone(),
        });
    }

    let now = clock.now();
    repo.touch_membership(session_id, &command.user_id, now)
        .await?;
    sweep_presence(session_id, clock, settings, repo).await?;

    let members = repo.list_memberships(session_id).await?;
    let plan = compact_join_order(&members);
    if plan.seated.len() < MIN_PLAYERS {
        return Err(DomainError::InsufficientPlayers {
            required: MIN_PLAYERS,
            active: plan.seated.len(),
        });
    }

    let stories: Vec<Story> = (0..)
        .zip(&plan.seated)
        .map(|(story_index, _)| Story {
            story_id: Uuid::new_v4(),
            session_id,
            story_index,
            created_at: now,
        })
        .collect();
    let player_count = u32::try_from(stories.len())
        .map_err(|e| DomainError::Infrastructure(format!("seat count overflow: {e}")))?;

    let start = SessionStart {
        session_id,
        started_at: now,
        seating: plan.join_orders,
        stories,
    };
    if !repo.start_session(&start).await? {
        let actual = load_session(repo, session_id).await?.phase;
        return Err(DomainError::InvalidPhase {
            expected: GamePhase::Waiting,
            actual,
        });
    }

    info!(
        correlation_id = %command.correlation_id(),
        %session_id,
        player_count,
        "game started"
    );
    Ok(StartedGame { player_count })
}

/// Handles the `MarkReady` command: records the marker idempotently and, in
/// all-ready mode, advances once every player in play is ready.
///
/// # Errors
///
/// Returns `DomainError::SessionNotFound`, `DomainError::InvalidPhase`,
/// `DomainError::NotAMember`, or `DomainError::Infrastructure` if a
/// collaborator fails.
pub async fn handle_mark_ready(
    command: &MarkReady,
    clock: &dyn Clock,
    settings: &dyn SettingsProvider,
    repo: &dyn GameRepository,
) -> Result<ReadyOutcome, DomainError> {
    let session_id = command.session_id;
    let session = load_session(repo, session_id).await?;
    require_phase(&session, GamePhase::InProgress)?;
    let member = load_member(repo, session_id, &command.user_id).await?;
    if !holds_seat(&member, session.seat_count) {
        return Err(DomainError::NotAMember {
            session_id,
            user_id: command.user_id.clone(),
        });
    }

    let round = session.current_round;
    if command.round.is_some_and(|r| r != round) {
        debug!(
            %session_id,
            user_id = %command.user_id,
            requested = ?command.round,
            round,
            "stale ready marker"
        );
        return Ok(ReadyOutcome::default());
    }

    let now = clock.now();
    let ready = RoundReady {
        session_id,
        round,
        user_id: command.user_id.clone(),
        ready_at: now,
    };
    if !repo.insert_round_ready(&ready).await? {
        debug!(%session_id, user_id = %command.user_id, round, "duplicate ready marker");
    }
    repo.touch_membership(session_id, &command.user_id, now)
        .await?;

    if session.progress_mode != ProgressMode::AllReady {
        return Ok(ReadyOutcome::default());
    }

    sweep_presence(session_id, clock, settings, repo).await?;
    let players = players_in_play(&session, repo).await?;
    let markers = repo.list_round_ready(session_id, round).await?;
    if !everyone_ready(&players, markers.iter().map(|r| r.user_id.as_str())) {
        return Ok(ReadyOutcome::default());
    }

    let total_rounds = u32::try_from(players.len()).unwrap_or(u32::MAX);
    let advance = advance_round(&session, total_rounds, clock, repo).await?;
    info!(
        correlation_id = %command.correlation_id(),
        %session_id,
        round,
        ?advance,
        "all players ready"
    );
    Ok(advance.into())
}

/// Moves `session` out of its current round: to the next round, or to
/// `Ended` once `total_rounds` have been played. The write only applies if
/// the session is still in the round that was evaluated.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the repository fails.
pub async fn advance_round(
    session: &GameSession,
    total_rounds: u32,
    clock: &dyn Clock,
    repo: &dyn GameRepository,
) -> Result<RoundAdvance, DomainError> {
    let session_id = session.session_id;
    let from_round = session.current_round;
    match next_step(from_round, total_rounds) {
        RoundStep::Advance { to_round } => {
            if repo.advance_round(session_id, from_round, to_round).await? {
                info!(%session_id, from_round, to_round, "round advanced");
                Ok(RoundAdvance::Advanced { to_round })
            } else {
                debug!(%session_id, from_round, "round already advanced");
                Ok(RoundAdvance::Lost)
            }
        }
        RoundStep::End => {
            if repo.end_session(session_id, from_round, clock.now()).await? {
                info!(%session_id, rounds = from_round, "game ended");
                Ok(RoundAdvance::Ended)
            } else {
                debug!(%session_id, from_round, "game already ended");
                Ok(RoundAdvance::Lost)
            }
        }
    }
}

/// Advances a time-limited session by at most one round when its current
/// round has run out. Returns `None` when nothing was due.
///
/// Presence must already have been swept; the players in play at this
/// moment decide the total number of rounds. A round that expires with
/// nobody in play ends the game.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the repository fails.
pub async fn evaluate_time_limit(
    session: &GameSession,
    clock: &dyn Clock,
    repo: &dyn GameRepository,
) -> Result<Option<RoundAdvance>, DomainError> {
    if !time_limit_elapsed(session, clock.now()) {
        return Ok(None);
    }
    let players = players_in_play(session, repo).await?;
    let total_rounds = u32::try_from(players.len()).unwrap_or(u32::MAX);
    advance_round(session, total_rounds, clock, repo)
        .await
        .map(Some)
}
