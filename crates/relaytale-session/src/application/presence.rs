//! Membership and presence: joining, rejoining, heartbeats and the lazy
//! disconnect sweep.
//!
//! There is no background scheduler. Every read or write that touches a
//! session sweeps it first, so presence is at most one poll interval stale.

use relaytale_core::clock::Clock;
use relaytale_core::command::Command;
use relaytale_core::error::DomainError;
use relaytale_core::model::{GamePhase, GameSession, Membership};
use relaytale_core::repository::GameRepository;
use relaytale_core::settings::SettingsProvider;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::tunables::disconnect_timeout;
use crate::application::{load_member, load_session};
use crate::domain::commands::{Heartbeat, JoinSession};
use crate::domain::entry_word::normalize;
use crate::domain::seating::{holds_seat, vacant_seat};
use crate::domain::validation;

/// Result of a successful join or rejoin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinOutcome {
    /// The session joined.
    pub session_id: Uuid,
    /// Its display name.
    pub game_name: String,
    /// `true` when the user already held a membership.
    pub is_rejoining: bool,
    /// The caller's rotation position.
    pub join_order: u32,
}

/// Marks every member whose last heartbeat is older than the disconnect
/// timeout as inactive. Returns the user ids that were deactivated.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the settings or repository fail.
pub async fn sweep_presence(
    session_id: Uuid,
    clock: &dyn Clock,
    settings: &dyn SettingsProvider,
    repo: &dyn GameRepository,
) -> Result<Vec<String>, DomainError> {
    let cutoff = clock.now() - disconnect_timeout(settings).await?;
    let deactivated = repo.deactivate_stale_memberships(session_id, cutoff).await?;
    if !deactivated.is_empty() {
        warn!(%session_id, users = ?deactivated, "members timed out");
    }
    Ok(deactivated)
}

/// Active members of a session, ordered by join order.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the repository fails.
pub async fn active_members(
    session_id: Uuid,
    repo: &dyn GameRepository,
) -> Result<Vec<Membership>, DomainError> {
    let mut members = repo.list_memberships(session_id).await?;
    members.retain(|m| m.is_active);
    Ok(members)
}

/// Active members taking part in the rounds: once a game is running, only
/// those holding a seat.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the repository fails.
pub async fn players_in_play(
    session: &GameSession,
    repo: &dyn GameRepository,
) -> Result<Vec<Membership>, DomainError> {
    let mut players = active_members(session.session_id, repo).await?;
    if session.phase != GamePhase::Waiting {
        players.retain(|m| holds_seat(m, session.seat_count));
    }
    Ok(players)
}

/// Records a heartbeat for `user_id` and sweeps the session.
///
/// # Errors
///
/// Returns `DomainError::NotAMember` if the user holds no membership, or
/// `DomainError::Infrastructure` if the settings or repository fail.
pub async fn heartbeat(
    session_id: Uuid,
    user_id: &str,
    clock: &dyn Clock,
    settings: &dyn SettingsProvider,
    repo: &dyn GameRepository,
) -> Result<(), DomainError> {
    if !repo.touch_membership(session_id, user_id, clock.now()).await? {
        return Err(DomainError::NotAMember {
            session_id,
            user_id: user_id.to_owned(),
        });
    }
    sweep_presence(session_id, clock, settings, repo).await?;
    Ok(())
}

/// Handles the `Heartbeat` command.
///
/// # Errors
///
/// Returns `DomainError::SessionNotFound` or `DomainError::NotAMember`, or
/// `DomainError::Infrastructure` if a collaborator fails.
pub async fn handle_heartbeat(
    command: &Heartbeat,
    clock: &dyn Clock,
    settings: &dyn SettingsProvider,
    repo: &dyn GameRepository,
) -> Result<(), DomainError> {
    load_session(repo, command.session_id).await?;
    heartbeat(command.session_id, &command.user_id, clock, settings, repo).await?;
    debug!(
        correlation_id = %command.correlation_id(),
        session_id = %command.session_id,
        user_id = %command.user_id,
        "heartbeat"
    );
    Ok(())
}

/// Reactivates an existing membership: refreshes the heartbeat and, when a
/// name is given, updates the display name. Never creates a membership.
///
/// # Errors
///
/// Returns `DomainError::NotAMember` if the user holds no membership, or
/// `DomainError::Infrastructure` if the repository fails.
pub async fn rejoin(
    session_id: Uuid,
    user_id: &str,
    display_name: Option<&str>,
    clock: &dyn Clock,
    repo: &dyn GameRepository,
) -> Result<Membership, DomainError> {
    if !repo.touch_membership(session_id, user_id, clock.now()).await? {
        return Err(DomainError::NotAMember {
            session_id,
            user_id: user_id.to_owned(),
        });
    }
    if let Some(name) = display_name {
        repo.rename_membership(session_id, user_id, name).await?;
    }
    load_member(repo, session_id, user_id).await
}

/// Handles the `JoinSession` command.
///
/// An existing member rejoins. Otherwise a lobby appends a new member and a
/// running game hands the caller the lowest disconnected seat.
///
/// # Errors
///
/// Returns `DomainError::Validation` for malformed input,
/// `DomainError::EntryWordNotFound`, `DomainError::SessionNotJoinable`,
/// `DomainError::SessionFull`, `DomainError::NoAvailableSlot`,
/// `DomainError::ConcurrencyConflict` when another joiner won the same
/// position, or `DomainError::Infrastructure` if a collaborator fails.
pub async fn handle_join_session(
    command: &JoinSession,
    clock: &dyn Clock,
    settings: &dyn SettingsProvider,
    repo: &dyn GameRepository,
) -> Result<JoinOutcome, DomainError> {
    let user_id = validation::user_id(&command.user_id)?;
    let display_name = validation::display_name(&command.player_name)?;
    let entry_word = normalize(&command.entry_word);
    if entry_word.is_empty() {
        return Err(DomainError::Validation("entry word must not be empty".into()));
    }

    let session_id = repo
        .find_session_by_entry_word(&entry_word)
        .await?
        .ok_or(DomainError::EntryWordNotFound(entry_word))?;
    let session = load_session(repo, session_id).await?;
    if session.phase == GamePhase::Ended {
        return Err(DomainError::SessionNotJoinable(session_id));
    }

    if let Some(existing) = repo.get_membership(session_id, &user_id).await? {
        if session.phase == GamePhase::Waiting && !existing.is_active {
            sweep_presence(session_id, clock, settings, repo).await?;
            ensure_lobby_capacity(&session, &repo.list_memberships(session_id).await?)?;
        }
        let member = rejoin(session_id, &user_id, Some(&display_name), clock, repo).await?;
        info!(
            correlation_id = %command.correlation_id(),
            %session_id,
            user_id = %user_id,
            join_order = member.join_order,
            "player rejoined"
        );
        return Ok(outcome(&session, true, member.join_order));
    }

    sweep_presence(session_id, clock, settings, repo).await?;
    let members = repo.list_memberships(session_id).await?;
    let newcomer = Membership {
        session_id,
        user_id,
        join_order: 0,
        display_name,
        last_active_at: clock.now(),
        is_active: true,
    };

    let join_order = if session.phase == GamePhase::Waiting {
        join_lobby(&session, &members, newcomer, repo).await?
    } else {
        take_over_seat(&session, &members, newcomer, repo).await?
    };
    info!(
        correlation_id = %command.correlation_id(),
        %session_id,
        user_id = %command.user_id,
        join_order,
        phase = %session.phase,
        "player joined"
    );
    Ok(outcome(&session, false, join_order))
}

fn outcome(session: &GameSession, is_rejoining: bool, join_order: u32) -> JoinOutcome {
    JoinOutcome {
        session_id: session.session_id,
        game_name: session.game_name.clone(),
        is_rejoining,
        join_order,
    }
}

fn ensure_lobby_capacity(session: &GameSession, members: &[Membership]) -> Result<(), DomainError> {
    let active = members.iter().filter(|m| m.is_active).count();
    if u32::try_from(active).unwrap_or(u32::MAX) >= session.user_limit {
        return Err(DomainError::SessionFull {
            session_id: session.session_id,
            limit: session.user_limit,
        });
    }
    Ok(())
}

async fn join_lobby(
    session: &GameSession,
    members: &[Membership],
    mut newcomer: Membership,
    repo: &dyn GameRepository,
) -> Result<u32, DomainError> {
    ensure_lobby_capacity(session, members)?;
    newcomer.join_order = members.iter().map(|m| m.join_order).max().unwrap_or(0) + 1;
    if !repo.insert_membership(&newcomer).await? {
        return Err(DomainError::ConcurrencyConflict {
            session_id: session.session_id,
        });
    }
    Ok(newcomer.join_order)
}

async fn take_over_seat(
    session: &GameSession,
    members: &[Membership],
    mut newcomer: Membership,
    repo: &dyn GameRepository,
) -> Result<u32, DomainError> {
    let vacated = vacant_seat(members, session.seat_count)
        .ok_or(DomainError::NoAvailableSlot(session.session_id))?;
    newcomer.join_order = vacated.join_order;
    if !repo
        .take_over_seat(session.session_id, &vacated.user_id, &newcomer)
        .await?
    {
        return Err(DomainError::ConcurrencyConflict {
            session_id: session.session_id,
        });
    }
    info!(
        session_id = %session.session_id,
        vacated = %vacated.user_id,
        replacement = %newcomer.user_id,
        join_order = newcomer.join_order,
        "seat taken over"
    );
    Ok(newcomer.join_order)
}
