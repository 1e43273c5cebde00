//! Writing this round's line into the story the rotation hands the player.

use relaytale_core::clock::Clock;
use relaytale_core::command::Command;
use relaytale_core::error::DomainError;
use relaytale_core::model::{GamePhase, StoryText};
use relaytale_core::repository::{GameRepository, TextUpsert};
use relaytale_core::settings::SettingsProvider;
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::application::presence::{players_in_play, sweep_presence};
use crate::application::{load_member, load_session, require_phase};
use crate::domain::commands::SubmitText;
use crate::domain::rotation::story_index_for;
use crate::domain::seating::holds_seat;
use crate::domain::validation;

/// Result of `SubmitText`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubmitOutcome {
    /// The story the line went into.
    pub story_index: u32,
    /// The round (and text order) of the line.
    pub round: u32,
    /// `true` when an earlier line of the same round was overwritten.
    pub replaced: bool,
}

/// Handles the `SubmitText` command.
///
/// # Errors
///
/// Returns `DomainError::Validation` for an empty or oversized line,
/// `DomainError::SessionNotFound`, `DomainError::InvalidPhase`,
/// `DomainError::NotAMember`, `DomainError::LineAlreadyAuthored` when the
/// line belongs to another player, `DomainError::StoryNotFound` if the
/// rotation points past the created stories, or
/// `DomainError::Infrastructure` if a collaborator fails.
pub async fn handle_submit_text(
    command: &SubmitText,
    clock: &dyn Clock,
    settings: &dyn SettingsProvider,
    repo: &dyn GameRepository,
) -> Result<SubmitOutcome, DomainError> {
    let content = validation::line_content(&command.content)?;
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

    let now = clock.now();
    repo.touch_membership(session_id, &command.user_id, now)
        .await?;
    sweep_presence(session_id, clock, settings, repo).await?;
    let players = players_in_play(&session, repo).await?;
    let num_players = u32::try_from(players.len()).unwrap_or(u32::MAX);

    let round = session.current_round;
    let story_index = story_index_for(member.join_order, round, num_players)?;
    let Some(story) = repo.get_story(session_id, story_index).await? else {
        error!(
            %session_id,
            story_index,
            join_order = member.join_order,
            num_players,
            seat_count = session.seat_count,
            "rotation resolved to a missing story"
        );
        return Err(DomainError::StoryNotFound {
            session_id,
            story_index,
        });
    };

    let text = StoryText {
        text_id: Uuid::new_v4(),
        story_id: story.story_id,
        author_user_id: command.user_id.clone(),
        text_order: round,
        content,
        created_at: now,
    };
    let replaced = match repo.upsert_story_text(&text).await? {
        TextUpsert::Inserted => false,
        TextUpsert::Updated => true,
        TextUpsert::AuthoredByOther => {
            return Err(DomainError::LineAlreadyAuthored { story_index, round });
        }
    };

    info!(
        correlation_id = %command.correlation_id(),
        %session_id,
        user_id = %command.user_id,
        story_index,
        round,
        replaced,
        "line submitted"
    );
    Ok(SubmitOutcome {
        story_index,
        round,
        replaced,
    })
}
