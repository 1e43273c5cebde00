//! Status projection: the snapshot a client renders, built from repository
//! state for one viewer.
//!
//! Reading status is also the client's presence signal. The viewer's
//! heartbeat is refreshed, the session swept and an expired time-limited
//! round advanced before anything is read.

use chrono::{DateTime, Utc};
use relaytale_core::clock::Clock;
use relaytale_core::error::DomainError;
use relaytale_core::model::{GamePhase, GameSession, Membership, ProgressMode};
use relaytale_core::repository::GameRepository;
use relaytale_core::settings::SettingsProvider;
use serde::Serialize;
use tracing::error;
use uuid::Uuid;

use crate::application::presence::{players_in_play, sweep_presence};
use crate::application::progression::evaluate_time_limit;
use crate::application::{load_member, load_session};
use crate::domain::rotation::story_index_for;
use crate::domain::seating::holds_seat;

/// Session fields visible to players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    /// Session identifier.
    pub session_id: Uuid,
    /// Display name of the game.
    pub game_name: String,
    /// Lifecycle phase.
    pub phase: GamePhase,
    /// Round advance policy.
    pub progress_mode: ProgressMode,
    /// Lobby capacity.
    pub user_limit: u32,
    /// Round duration in minutes.
    pub time_limit_minutes: u32,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Start time.
    pub started_at: Option<DateTime<Utc>>,
    /// End time.
    pub ended_at: Option<DateTime<Utc>>,
}

impl From<&GameSession> for SessionSummary {
    fn from(session: &GameSession) -> Self {
        Self {
            session_id: session.session_id,
            game_name: session.game_name.clone(),
            phase: session.phase,
            progress_mode: session.progress_mode,
            user_limit: session.user_limit,
            time_limit_minutes: session.time_limit_minutes,
            created_at: session.created_at,
            started_at: session.started_at,
            ended_at: session.ended_at,
        }
    }
}

/// One member as other players see them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerView {
    /// Opaque identity.
    pub user_id: String,
    /// In-game name.
    pub display_name: String,
    /// Rotation position.
    pub join_order: u32,
    /// Presence flag.
    pub is_active: bool,
}

impl From<&Membership> for PlayerView {
    fn from(m: &Membership) -> Self {
        Self {
            user_id: m.user_id.clone(),
            display_name: m.display_name.clone(),
            join_order: m.join_order,
            is_active: m.is_active,
        }
    }
}

/// The full status snapshot for one viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameStatusView {
    /// The session.
    pub session: SessionSummary,
    /// Every member ordered by join order.
    pub players: Vec<PlayerView>,
    /// Current round; 0 in the lobby.
    pub current_round: u32,
    /// Rounds in the game: the players currently in play, or the rounds
    /// actually played once the game has ended.
    pub total_rounds: u32,
    /// Stories created at start.
    pub seat_count: u32,
    /// The viewer's rotation position.
    pub my_join_order: u32,
    /// The story the viewer writes into this round.
    pub my_story_index: Option<u32>,
    /// The viewer already has a line in this round.
    pub has_submitted_this_round: bool,
    /// The latest earlier line of the viewer's story.
    pub previous_text: Option<String>,
    /// The round-1 line of the viewer's story.
    pub story_title: Option<String>,
    /// Users with a ready marker for the current round.
    pub ready_players: Vec<String>,
    /// The word to join with, while the session holds one.
    pub entry_word: Option<String>,
    /// When the current round runs out, in time-limit mode.
    pub round_deadline: Option<DateTime<Utc>>,
}

/// The fields of a status snapshot a live stream compares between polls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusDigest {
    /// Lifecycle phase.
    pub phase: GamePhase,
    /// Current round.
    pub current_round: u32,
    /// Display names of the active members in join order.
    pub active_members: Vec<String>,
}

/// Builds the status snapshot for `viewer_user_id`.
///
/// # Errors
///
/// Returns `DomainError::SessionNotFound`, `DomainError::NotAMember`, or
/// `DomainError::Infrastructure` if a collaborator fails.
pub async fn get_game_status(
    session_id: Uuid,
    viewer_user_id: &str,
    clock: &dyn Clock,
    settings: &dyn SettingsProvider,
    repo: &dyn GameRepository,
) -> Result<GameStatusView, DomainError> {
    load_session(repo, session_id).await?;
    if !repo
        .touch_membership(session_id, viewer_user_id, clock.now())
        .await?
    {
        return Err(DomainError::NotAMember {
            session_id,
            user_id: viewer_user_id.to_owned(),
        });
    }
    let session = refresh(session_id, clock, settings, repo).await?;
    let viewer = load_member(repo, session_id, viewer_user_id).await?;
    project(&session, &viewer, repo).await
}

/// Computes the stream digest of a session. Sweeps presence and applies an
/// expired time limit like a status read, without touching any heartbeat.
///
/// # Errors
///
/// Returns `DomainError::SessionNotFound`, or `DomainError::Infrastructure`
/// if a collaborator fails.
pub async fn status_digest(
    session_id: Uuid,
    clock: &dyn Clock,
    settings: &dyn SettingsProvider,
    repo: &dyn GameRepository,
) -> Result<StatusDigest, DomainError> {
    let session = refresh(session_id, clock, settings, repo).await?;
    let active_members = repo
        .list_memberships(session_id)
        .await?
        .into_iter()
        .filter(|m| m.is_active)
        .map(|m| m.display_name)
        .collect();
    Ok(StatusDigest {
        phase: session.phase,
        current_round: session.current_round,
        active_members,
    })
}

async fn refresh(
    session_id: Uuid,
    clock: &dyn Clock,
    settings: &dyn SettingsProvider,
    repo: &dyn GameRepository,
) -> Result<GameSession, DomainError> {
    sweep_presence(session_id, clock, settings, repo).await?;
    let session = load_session(repo, session_id).await?;
    match evaluate_time_limit(&session, clock, repo).await? {
        Some(_) => load_session(repo, session_id).await,
        None => Ok(session),
    }
}

#[derive(Debug, Default)]
struct StoryProgress {
    story_index: Option<u32>,
    has_submitted: bool,
    previous_text: Option<String>,
    title: Option<String>,
}

async fn story_progress(
    session: &GameSession,
    viewer: &Membership,
    num_players: u32,
    repo: &dyn GameRepository,
) -> Result<StoryProgress, DomainError> {
    let round = session.current_round;
    if session.phase != GamePhase::InProgress
        || num_players == 0
        || !holds_seat(viewer, session.seat_count)
    {
        return Ok(StoryProgress::default());
    }

    let story_index = story_index_for(viewer.join_order, round, num_players)?;
    let Some(story) = repo.get_story(session.session_id, story_index).await? else {
        error!(
            session_id = %session.session_id,
            story_index,
            num_players,
            seat_count = session.seat_count,
            "status resolved to a missing story"
        );
        return Ok(StoryProgress::default());
    };

    let has_submitted = repo
        .get_story_text(story.story_id, round)
        .await?
        .is_some_and(|t| t.author_user_id == viewer.user_id);
    let title = repo
        .get_story_text(story.story_id, 1)
        .await?
        .map(|t| t.content);
    let previous_text = if round > 1 {
        repo.latest_story_text_before(story.story_id, round)
            .await?
            .map(|t| t.content)
    } else {
        None
    };

    Ok(StoryProgress {
        story_index: Some(story_index),
        has_submitted,
        previous_text,
        title,
    })
}

/// Assembles the snapshot from already refreshed state. Read-only.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the repository fails.
pub async fn project(
    session: &GameSession,
    viewer: &Membership,
    repo: &dyn GameRepository,
) -> Result<GameStatusView, DomainError> {
    let session_id = session.session_id;
    let members = repo.list_memberships(session_id).await?;
    let in_play = u32::try_from(players_in_play(session, repo).await?.len()).unwrap_or(u32::MAX);

    let total_rounds = match session.phase {
        GamePhase::Ended => session.current_round,
        GamePhase::Waiting | GamePhase::InProgress => in_play,
    };
    let progress = story_progress(session, viewer, in_play, repo).await?;

    let ready_players = if session.phase == GamePhase::InProgress {
        repo.list_round_ready(session_id, session.current_round)
            .await?
            .into_iter()
            .map(|r| r.user_id)
            .collect()
    } else {
        Vec::new()
    };

    let round_deadline = match (session.phase, session.progress_mode) {
        (GamePhase::InProgress, ProgressMode::TimeLimit) => session
            .round_started_at()
            .map(|started| started + session.round_duration()),
        _ => None,
    };

    let entry_word = match session.phase {
        GamePhase::Ended => None,
        _ => repo.entry_word_for(session_id).await?,
    };

    Ok(GameStatusView {
        session: SessionSummary::from(session),
        players: members.iter().map(PlayerView::from).collect(),
        current_round: session.current_round,
        total_rounds,
        seat_count: session.seat_count,
        my_join_order: viewer.join_order,
        my_story_index: progress.story_index,
        has_submitted_this_round: progress.has_submitted,
        previous_text: progress.previous_text,
        story_title: progress.title,
        ready_players,
        entry_word,
        round_deadline,
    })
}
