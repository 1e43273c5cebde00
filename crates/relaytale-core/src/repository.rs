//! Game repository abstraction.
//!
//! Every method is a single atomic operation against the store. Methods
//! returning `bool` are conditional writes: `false` means the precondition no
//! longer held and nothing was written. The core never relies on in-process
//! locking across requests; all coordination goes through these primitives.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DomainError;
use crate::model::{GameSession, Membership, RoundReady, Story, StoryText};

/// Outcome of [`GameRepository::upsert_story_text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextUpsert {
    /// No line existed for the (story, order); one was inserted.
    Inserted,
    /// The same author's line was overwritten.
    Updated,
    /// A line by a different author exists; nothing was written.
    AuthoredByOther,
}

/// Everything the `Waiting → InProgress` transition writes, applied as one
/// unit.
#[derive(Debug, Clone)]
pub struct SessionStart {
    /// The session to start.
    pub session_id: Uuid,
    /// Start time, also the first round's start.
    pub started_at: DateTime<Utc>,
    /// New join order for every member: seats `1..=stories.len()` first.
    pub seating: Vec<(String, u32)>,
    /// One story per seat.
    pub stories: Vec<Story>,
}

/// Narrow persistence interface consumed by the game core.
#[async_trait]
pub trait GameRepository: Send + Sync {
    /// Insert a freshly created session.
    async fn insert_session(&self, session: &GameSession) -> Result<(), DomainError>;

    /// Load a session by id.
    async fn get_session(&self, session_id: Uuid) -> Result<Option<GameSession>, DomainError>;

    /// Apply `start` iff the session is still `Waiting`: reseat members,
    /// create the stories and move to round 1.
    async fn start_session(&self, start: &SessionStart) -> Result<bool, DomainError>;

    /// Set `current_round = to_round` iff the session is `InProgress` at
    /// `from_round`.
    async fn advance_round(
        &self,
        session_id: Uuid,
        from_round: u32,
        to_round: u32,
    ) -> Result<bool, DomainError>;

    /// Move to `Ended` iff the session is `InProgress` at `from_round`.
    async fn end_session(
        &self,
        session_id: Uuid,
        from_round: u32,
        ended_at: DateTime<Utc>,
    ) -> Result<bool, DomainError>;

    /// Register `word` for the session iff no session currently holds it.
    async fn claim_entry_word(&self, word: &str, session_id: Uuid) -> Result<bool, DomainError>;

    /// Drop the session's entry word, making it available again.
    async fn release_entry_word(&self, session_id: Uuid) -> Result<(), DomainError>;

    /// Resolve an entry word to the session holding it.
    async fn find_session_by_entry_word(&self, word: &str) -> Result<Option<Uuid>, DomainError>;

    /// The entry word currently held by the session.
    async fn entry_word_for(&self, session_id: Uuid) -> Result<Option<String>, DomainError>;

    /// Insert a membership iff neither the user nor the join order is
    /// already present in the session.
    async fn insert_membership(&self, membership: &Membership) -> Result<bool, DomainError>;

    /// Load one membership.
    async fn get_membership(
        &self,
        session_id: Uuid,
        user_id: &str,
    ) -> Result<Option<Membership>, DomainError>;

    /// All memberships of a session ordered by join order.
    async fn list_memberships(&self, session_id: Uuid) -> Result<Vec<Membership>, DomainError>;

    /// Record a heartbeat: set `last_active_at = at` and `is_active = true`.
    async fn touch_membership(
        &self,
        session_id: Uuid,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, DomainError>;

    /// Change a member's display name.
    async fn rename_membership(
        &self,
        session_id: Uuid,
        user_id: &str,
        display_name: &str,
    ) -> Result<bool, DomainError>;

    /// Mark every active membership whose heartbeat is older than `cutoff`
    /// inactive. Returns the affected user ids.
    async fn deactivate_stale_memberships(
        &self,
        session_id: Uuid,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<String>, DomainError>;

    /// Replace the inactive membership of `vacated_user_id` with
    /// `replacement` (which carries the inherited join order), iff the
    /// vacated membership still exists and is still inactive.
    async fn take_over_seat(
        &self,
        session_id: Uuid,
        vacated_user_id: &str,
        replacement: &Membership,
    ) -> Result<bool, DomainError>;

    /// Load the story at `story_index`.
    async fn get_story(
        &self,
        session_id: Uuid,
        story_index: u32,
    ) -> Result<Option<Story>, DomainError>;

    /// Insert the line, or overwrite content and timestamp when the existing
    /// line at the same (story, order) has the same author.
    async fn upsert_story_text(&self, text: &StoryText) -> Result<TextUpsert, DomainError>;

    /// Load the line at (story, order).
    async fn get_story_text(
        &self,
        story_id: Uuid,
        text_order: u32,
    ) -> Result<Option<StoryText>, DomainError>;

    /// The line with the highest order strictly below `before_order`.
    async fn latest_story_text_before(
        &self,
        story_id: Uuid,
        before_order: u32,
    ) -> Result<Option<StoryText>, DomainError>;

    /// Idempotently record a ready marker. Returns `false` when the marker
    /// already existed.
    async fn insert_round_ready(&self, ready: &RoundReady) -> Result<bool, DomainError>;

    /// All ready markers for a round.
    async fn list_round_ready(
        &self,
        session_id: Uuid,
        round: u32,
    ) -> Result<Vec<RoundReady>, DomainError>;
}
