//! Routes for the game session lifecycle.

use std::convert::Infallible;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::Stream;
use futures::stream;
use relaytale_core::command::Command;
use relaytale_core::error::DomainError;
use relaytale_core::model::ProgressMode;
use relaytale_session::application::presence::{self, JoinOutcome};
use relaytale_session::application::progression::{
    self, CreatedSession, ReadyOutcome, StartedGame,
};
use relaytale_session::application::query_handlers::{self, GameStatusView};
use relaytale_session::application::stream::{StreamEvent, run_status_stream};
use relaytale_session::application::submission::{self, SubmitOutcome};
use relaytale_session::domain::commands;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{Instrument, info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Undelivered digests a stream task may queue before it waits for the
/// client.
const STREAM_BUFFER: usize = 16;

/// Request body for POST /.
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    /// Display name of the game.
    pub game_name: String,
    /// The creator's in-game name.
    pub creator_name: String,
    /// The creator's opaque identity.
    pub creator_user_id: String,
    /// Lobby capacity (2–10).
    pub user_limit: u32,
    /// Round duration in minutes; the configured default when omitted.
    #[serde(default)]
    pub time_limit_minutes: Option<u32>,
    /// Round advance policy.
    pub progress_mode: ProgressMode,
}

/// Request body for POST /join.
#[derive(Debug, Deserialize)]
pub struct JoinSessionRequest {
    /// The shared entry word.
    pub entry_word: String,
    /// The in-game name to use.
    pub player_name: String,
    /// The joiner's opaque identity.
    pub user_id: String,
}

/// Request body for the member actions that carry nothing but the caller.
#[derive(Debug, Deserialize)]
pub struct MemberRequest {
    /// The caller's opaque identity.
    pub user_id: String,
}

/// Request body for POST /{session_id}/submit.
#[derive(Debug, Deserialize)]
pub struct SubmitTextRequest {
    /// The author.
    pub user_id: String,
    /// The line.
    pub content: String,
}

/// Request body for POST /{session_id}/ready.
#[derive(Debug, Deserialize)]
pub struct MarkReadyRequest {
    /// Who is ready.
    pub user_id: String,
    /// The round the client is looking at.
    #[serde(default)]
    pub round: Option<u32>,
}

/// Query string for GET /{session_id}/status.
#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    /// The viewer.
    pub user_id: String,
}

/// POST /
#[instrument(skip(state, request), fields(user_id = %request.creator_user_id))]
async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<CreatedSession>), ApiError> {
    let command = commands::CreateSession {
        correlation_id: Uuid::new_v4(),
        game_name: request.game_name,
        creator_user_id: request.creator_user_id,
        creator_name: request.creator_name,
        user_limit: request.user_limit,
        time_limit_minutes: request.time_limit_minutes,
        progress_mode: request.progress_mode,
    };

    info!(
        correlation_id = %command.correlation_id,
        command_type = command.command_type(),
        "handling create_session command"
    );

    let created = progression::handle_create_session(
        &command,
        state.clock.as_ref(),
        &*state.rng,
        &*state.settings,
        &*state.repository,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// POST /join
#[instrument(skip(state, request), fields(user_id = %request.user_id))]
async fn join_session(
    State(state): State<AppState>,
    Json(request): Json<JoinSessionRequest>,
) -> Result<Json<JoinOutcome>, ApiError> {
    let command = commands::JoinSession {
        correlation_id: Uuid::new_v4(),
        entry_word: request.entry_word,
        player_name: request.player_name,
        user_id: request.user_id,
    };

    info!(
        correlation_id = %command.correlation_id,
        command_type = command.command_type(),
        "handling join_session command"
    );

    let joined = presence::handle_join_session(
        &command,
        state.clock.as_ref(),
        &*state.settings,
        &*state.repository,
    )
    .await?;

    Ok(Json(joined))
}

/// POST /{session_id}/start
#[instrument(skip(state, request), fields(session_id = %session_id))]
async fn start_game(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<MemberRequest>,
) -> Result<Json<StartedGame>, ApiError> {
    let command = commands::StartGame {
        correlation_id: Uuid::new_v4(),
        session_id,
        user_id: request.user_id,
    };

    info!(
        correlation_id = %command.correlation_id,
        command_type = command.command_type(),
        "handling start_game command"
    );

    let started = progression::handle_start_game(
        &command,
        state.clock.as_ref(),
        &*state.settings,
        &*state.repository,
    )
    .await?;

    Ok(Json(started))
}

/// POST /{session_id}/submit
#[instrument(skip(state, request), fields(session_id = %session_id))]
async fn submit_text(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<SubmitTextRequest>,
) -> Result<Json<SubmitOutcome>, ApiError> {
    let command = commands::SubmitText {
        correlation_id: Uuid::new_v4(),
        session_id,
        user_id: request.user_id,
        content: request.content,
    };

    info!(
        correlation_id = %command.correlation_id,
        command_type = command.command_type(),
        "handling submit_text command"
    );

    let submitted = submission::handle_submit_text(
        &command,
        state.clock.as_ref(),
        &*state.settings,
        &*state.repository,
    )
    .await?;

    Ok(Json(submitted))
}

/// POST /{session_id}/ready
#[instrument(skip(state, request), fields(session_id = %session_id))]
async fn mark_ready(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<MarkReadyRequest>,
) -> Result<Json<ReadyOutcome>, ApiError> {
    let command = commands::MarkReady {
        correlation_id: Uuid::new_v4(),
        session_id,
        user_id: request.user_id,
        round: request.round,
    };

    info!(
        correlation_id = %command.correlation_id,
        command_type = command.command_type(),
        "handling mark_ready command"
    );

    let outcome = progression::handle_mark_ready(
        &command,
        state.clock.as_ref(),
        &*state.settings,
        &*state.repository,
    )
    .await?;

    Ok(Json(outcome))
}

/// POST /{session_id}/heartbeat
#[instrument(skip(state, request), fields(session_id = %session_id))]
async fn heartbeat(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<MemberRequest>,
) -> Result<StatusCode, ApiError> {
    let command = commands::Heartbeat {
        correlation_id: Uuid::new_v4(),
        session_id,
        user_id: request.user_id,
    };

    presence::handle_heartbeat(
        &command,
        state.clock.as_ref(),
        &*state.settings,
        &*state.repository,
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /{session_id}/status?user_id=
#[instrument(skip(state, query), fields(session_id = %session_id))]
async fn game_status(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<GameStatusView>, ApiError> {
    let view = query_handlers::get_game_status(
        session_id,
        &query.user_id,
        state.clock.as_ref(),
        &*state.settings,
        &*state.repository,
    )
    .await?;

    Ok(Json(view))
}

/// GET /{session_id}/stream
///
/// Server-sent events: a `status` event whenever the session digest
/// changes, and a final `error` event if the session can no longer be read.
#[instrument(skip(state), fields(session_id = %session_id))]
async fn status_stream(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    if state.repository.get_session(session_id).await?.is_none() {
        return Err(DomainError::SessionNotFound(session_id).into());
    }

    let (sender, receiver) = mpsc::channel(STREAM_BUFFER);
    tokio::spawn(run_status_stream(session_id, state.stream_context(), sender).in_current_span());
    info!("status stream opened");

    let events = stream::unfold(receiver, |mut receiver| async move {
        let event = receiver.recv().await?;
        Some((Ok::<_, Infallible>(sse_event(event)), receiver))
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

fn sse_event(event: StreamEvent) -> Event {
    match event {
        StreamEvent::Status(digest) => Event::default()
            .event("status")
            .json_data(&digest)
            .unwrap_or_else(|e| Event::default().event("error").data(e.to_string())),
        StreamEvent::Failed { message } => Event::default().event("error").data(message),
    }
}

/// Returns the session router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_session))
        .route("/join", post(join_session))
        .route("/{session_id}/start", post(start_game))
        .route("/{session_id}/submit", post(submit_text))
        .route("/{session_id}/ready", post(mark_ready))
        .route("/{session_id}/heartbeat", post(heartbeat))
        .route("/{session_id}/status", get(game_status))
        .route("/{session_id}/stream", get(status_stream))
}
