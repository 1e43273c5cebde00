//! Relaytale — API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use relaytale_core::error::DomainError;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Applying the embedded migrations failed.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The tracing pipeline could not be installed.
    #[error("telemetry error: {0}")]
    Telemetry(String),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP-layer wrapper around `DomainError` that implements `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            DomainError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            DomainError::SessionNotFound(_) | DomainError::EntryWordNotFound(_) => {
                (StatusCode::NOT_FOUND, "not_found")
            }
            DomainError::InvalidPhase { .. } => (StatusCode::CONFLICT, "invalid_phase"),
            DomainError::NotAMember { .. } => (StatusCode::FORBIDDEN, "not_a_member"),
            DomainError::NotCreator { .. } => (StatusCode::FORBIDDEN, "not_creator"),
            DomainError::SessionFull { .. } => (StatusCode::CONFLICT, "session_full"),
            DomainError::SessionNotJoinable(_) => (StatusCode::CONFLICT, "session_not_joinable"),
            DomainError::NoAvailableSlot(_) => (StatusCode::CONFLICT, "no_available_slot"),
            DomainError::InsufficientPlayers { .. } => {
                (StatusCode::CONFLICT, "insufficient_players")
            }
            DomainError::EntryWordExhausted { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, "entry_word_exhausted")
            }
            DomainError::ConcurrencyConflict { .. } => {
                (StatusCode::CONFLICT, "concurrency_conflict")
            }
            DomainError::LineAlreadyAuthored { .. } => {
                (StatusCode::CONFLICT, "line_already_authored")
            }
            DomainError::StoryNotFound { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "story_not_found")
            }
            DomainError::Infrastructure(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "infrastructure_error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();

        if self.0.is_defect() || matches!(self.0, DomainError::Infrastructure(_)) {
            error!(error = %self.0, code = error_code, "request failed");
        } else {
            debug!(error = %self.0, code = error_code, "request rejected");
        }

        let body = ErrorBody {
            error: error_code,
            message: self.0.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
