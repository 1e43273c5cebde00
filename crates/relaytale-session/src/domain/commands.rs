//! Commands for the game session context.

use relaytale_core::command::Command;
use relaytale_core::model::ProgressMode;
use uuid::Uuid;

/// Command to open a new lobby. The creator becomes join order 1.
#[derive(Debug, Clone)]
pub struct CreateSession {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Display name of the game.
    pub game_name: String,
    /// The creator's opaque identity.
    pub creator_user_id: String,
    /// The creator's in-game name.
    pub creator_name: String,
    /// Lobby capacity.
    pub user_limit: u32,
    /// Round duration in minutes; `None` uses the configured default.
    pub time_limit_minutes: Option<u32>,
    /// Round advance policy.
    pub progress_mode: ProgressMode,
}

impl Command for CreateSession {
    fn command_type(&self) -> &'static str {
        "session.create_session"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to join (or rejoin) a session through its entry word.
#[derive(Debug, Clone)]
pub struct JoinSession {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The shared entry word.
    pub entry_word: String,
    /// The in-game name to use.
    pub player_name: String,
    /// The joiner's opaque identity.
    pub user_id: String,
}

impl Command for JoinSession {
    fn command_type(&self) -> &'static str {
        "session.join_session"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to start the game.
#[derive(Debug, Clone)]
pub struct StartGame {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session to start.
    pub session_id: Uuid,
    /// Must be the creator.
    pub user_id: String,
}

impl Command for StartGame {
    fn command_type(&self) -> &'static str {
        "session.start_game"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to write (or rewrite) this round's line.
#[derive(Debug, Clone)]
pub struct SubmitText {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session being played.
    pub session_id: Uuid,
    /// The author.
    pub user_id: String,
    /// The line.
    pub content: String,
}

impl Command for SubmitText {
    fn command_type(&self) -> &'static str {
        "session.submit_text"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to declare this round's line finished.
#[derive(Debug, Clone)]
pub struct MarkReady {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session being played.
    pub session_id: Uuid,
    /// Who is ready.
    pub user_id: String,
    /// The round the client believes is current. A mismatch makes the
    /// marker a no-op.
    pub round: Option<u32>,
}

impl Command for MarkReady {
    fn command_type(&self) -> &'static str {
        "session.mark_ready"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to signal presence.
#[derive(Debug, Clone)]
pub struct Heartbeat {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session.
    pub session_id: Uuid,
    /// Who is still here.
    pub user_id: String,
}

impl Command for Heartbeat {
    fn command_type(&self) -> &'static str {
        "session.heartbeat"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
