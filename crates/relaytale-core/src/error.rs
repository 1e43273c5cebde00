//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

use crate::model::GamePhase;

/// Top-level domain error type.
///
/// Every variant except `Infrastructure` is a per-request outcome; none of
/// them is fatal to the process.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Malformed or out-of-range input.
    #[error("validation error: {0}")]
    Validation(String),

    /// The session does not exist.
    #[error("session not found: {0}")]
    SessionNotFound(Uuid),

    /// No joinable session is registered under the entry word.
    #[error("no session found for entry word {0:?}")]
    EntryWordNotFound(String),

    /// The operation is illegal in the session's current phase.
    #[error("operation requires phase {expected}, session is {actual}")]
    InvalidPhase {
        /// The phase the operation requires.
        expected: GamePhase,
        /// The phase the session is actually in.
        actual: GamePhase,
    },

    /// The user holds no membership in the session.
    #[error("user {user_id:?} is not a member of session {session_id}")]
    NotAMember {
        /// The session that was addressed.
        session_id: Uuid,
        /// The caller-supplied user id.
        user_id: String,
    },

    /// Only the creator (join order 1) may perform the operation.
    #[error("user {user_id:?} is not the creator of session {session_id}")]
    NotCreator {
        /// The session that was addressed.
        session_id: Uuid,
        /// The caller-supplied user id.
        user_id: String,
    },

    /// The lobby already holds `limit` active members.
    #[error("session {session_id} is full ({limit} players)")]
    SessionFull {
        /// The session that was addressed.
        session_id: Uuid,
        /// The configured user limit.
        limit: u32,
    },

    /// The session has ended and accepts no joins.
    #[error("session {0} is no longer joinable")]
    SessionNotJoinable(Uuid),

    /// The game is running and no disconnected seat can be taken over.
    #[error("session {0} has no disconnected seat to take over")]
    NoAvailableSlot(Uuid),

    /// Not enough active members to start.
    #[error("at least {required} active players are required, found {active}")]
    InsufficientPlayers {
        /// Minimum number of active players.
        required: usize,
        /// Active players after the presence sweep.
        active: usize,
    },

    /// The entry-word generator ran out of attempts.
    #[error("could not allocate a unique entry word after {attempts} attempts")]
    EntryWordExhausted {
        /// Number of candidates tried.
        attempts: u32,
    },

    /// A conditional write lost a race that cannot be resolved by re-reading.
    #[error("concurrent modification of session {session_id}")]
    ConcurrencyConflict {
        /// The session whose state changed underneath the request.
        session_id: Uuid,
    },

    /// The story line for this round belongs to another identity.
    #[error("line {round} of story {story_index} was written by another player")]
    LineAlreadyAuthored {
        /// The story the submission targeted.
        story_index: u32,
        /// The round (text order) of the line.
        round: u32,
    },

    /// The rotation resolved to a story that was never created.
    #[error("story {story_index} of session {session_id} does not exist")]
    StoryNotFound {
        /// The session that was addressed.
        session_id: Uuid,
        /// The story index the rotation produced.
        story_index: u32,
    },

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl DomainError {
    /// Returns `true` for errors that indicate a broken internal invariant
    /// rather than a caller mistake.
    #[must_use]
    pub fn is_defect(&self) -> bool {
        matches!(self, Self::StoryNotFound { .. })
    }
}
