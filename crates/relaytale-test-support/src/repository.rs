//! Test repositories — `GameRepository` implementations for tests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relaytale_core::error::DomainError;
use relaytale_core::model::{GamePhase, GameSession, Membership, RoundReady, Story, StoryText};
use relaytale_core::repository::{GameRepository, SessionStart, TextUpsert};
use uuid::Uuid;

#[derive(Debug, Default)]
struct Tables {
    sessions: HashMap<Uuid, GameSession>,
    entry_words: HashMap<String, Uuid>,
    memberships: Vec<Membership>,
    stories: Vec<Story>,
    texts: Vec<StoryText>,
    ready: Vec<RoundReady>,
}

/// An in-memory repository with the same conditional-write semantics as the
/// Postgres implementation. Each method holds the table lock for its whole
/// body, so every call is atomic.
#[derive(Debug, Default)]
pub struct InMemoryGameRepository {
    tables: Mutex<Tables>,
}

impl InMemoryGameRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, DomainError> {
        self.tables
            .lock()
            .map_err(|e| DomainError::Infrastructure(format!("repository mutex poisoned: {e}")))
    }

    /// Snapshot of every stored line of every story.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn story_texts(&self) -> Vec<StoryText> {
        self.tables.lock().unwrap().texts.clone()
    }

    /// Snapshot of every story.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn stories(&self) -> Vec<Story> {
        self.tables.lock().unwrap().stories.clone()
    }

    /// Overwrites a member's last heartbeat, to simulate a silent client.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn backdate_heartbeat(&self, session_id: Uuid, user_id: &str, at: DateTime<Utc>) {
        let mut tables = self.tables.lock().unwrap();
        if let Some(m) = tables
            .memberships
            .iter_mut()
            .find(|m| m.session_id == session_id && m.user_id == user_id)
        {
            m.last_active_at = at;
        }
    }
}

#[async_trait]
impl GameRepository for InMemoryGameRepository {
    async fn insert_session(&self, session: &GameSession) -> Result<(), DomainError> {
        let mut tables = self.tables()?;
        if tables.sessions.contains_key(&session.session_id) {
            return Err(DomainError::Infrastructure(format!(
                "duplicate session id {}",
                session.session_id
            )));
        }
        tables.sessions.insert(session.session_id, session.clone());
        Ok(())
    }

    async fn get_session(&self, session_id: Uuid) -> Result<Option<GameSession>, DomainError> {
        Ok(self.tables()?.sessions.get(&session_id).cloned())
    }

    async fn start_session(&self, start: &SessionStart) -> Result<bool, DomainError> {
        let mut tables = self.tables()?;
        let Some(session) = tables.sessions.get_mut(&start.session_id) else {
            return Ok(false);
        };
        if session.phase != GamePhase::Waiting {
            return Ok(false);
        }
        session.phase = GamePhase::InProgress;
        session.current_round = 1;
        session.started_at = Some(start.started_at);
        session.seat_count = u32::try_from(start.stories.len())
            .map_err(|e| DomainError::Infrastructure(format!("seat count overflow: {e}")))?;

        for (user_id, join_order) in &start.seating {
            if let Some(m) = tables
                .memberships
                .iter_mut()
                .find(|m| m.session_id == start.session_id && &m.user_id == user_id)
            {
                m.join_order = *join_order;
            }
        }
        tables.stories.extend(start.stories.iter().cloned());
        Ok(true)
    }

    async fn advance_round(
        &self,
        session_id: Uuid,
        from_round: u32,
        to_round: u32,
    ) -> Result<bool, DomainError> {
        let mut tables = self.tables()?;
        match tables.sessions.get_mut(&session_id) {
            Some(s) if s.phase == GamePhase::InProgress && s.current_round == from_round => {
                s.current_round = to_round;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn end_session(
        &self,
        session_id: Uuid,
        from_round: u32,
        ended_at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        let mut tables = self.tables()?;
        match tables.sessions.get_mut(&session_id) {
            Some(s) if s.phase == GamePhase::InProgress && s.current_round == from_round => {
                s.phase = GamePhase::Ended;
                s.ended_at = Some(ended_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn claim_entry_word(&self, word: &str, session_id: Uuid) -> Result<bool, DomainError> {
        let mut tables = self.tables()?;
        if tables.entry_words.contains_key(word) {
            return Ok(false);
        }
        tables.entry_words.insert(word.to_owned(), session_id);
        Ok(true)
    }

    async fn release_entry_word(&self, session_id: Uuid) -> Result<(), DomainError> {
        self.tables()?
            .entry_words
            .retain(|_, owner| *owner != session_id);
        Ok(())
    }

    async fn find_session_by_entry_word(&self, word: &str) -> Result<Option<Uuid>, DomainError> {
        Ok(self.tables()?.entry_words.get(word).copied())
    }

    async fn entry_word_for(&self, session_id: Uuid) -> Result<Option<String>, DomainError> {
        Ok(self
            .tables()?
            .entry_words
            .iter()
            .find(|(_, owner)| **owner == session_id)
            .map(|(word, _)| word.clone()))
    }

    async fn insert_membership(&self, membership: &Membership) -> Result<bool, DomainError> {
        let mut tables = self.tables()?;
        let clash = tables.memberships.iter().any(|m| {
            m.session_id == membership.session_id
                && (m.user_id == membership.user_id || m.join_order == membership.join_order)
        });
        if clash {
            return Ok(false);
        }
        tables.memberships.push(membership.clone());
        Ok(true)
    }

    async fn get_membership(
        &self,
        session_id: Uuid,
        user_id: &str,
    ) -> Result<Option<Membership>, DomainError> {
        Ok(self
            .tables()?
            .memberships
            .iter()
            .find(|m| m.session_id == session_id && m.user_id == user_id)
            .cloned())
    }

    async fn list_memberships(&self, session_id: Uuid) -> Result<Vec<Membership>, DomainError> {
        let mut members: Vec<Membership> = self
            .tables()?
            .memberships
            .iter()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect();
        members.sort_by_key(|m| m.join_order);
        Ok(members)
    }

    async fn touch_membership(
        &self,
        session_id: Uuid,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        let mut tables = self.tables()?;
        match tables
            .memberships
            .iter_mut()
            .find(|m| m.session_id == session_id && m.user_id == user_id)
        {
            Some(m) => {
                m.last_active_at = at;
                m.is_active = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn rename_membership(
        &self,
        session_id: Uuid,
        user_id: &str,
        display_name: &str,
    ) -> Result<bool, DomainError> {
        let mut tables = self.tables()?;
        match tables
            .memberships
            .iter_mut()
            .find(|m| m.session_id == session_id && m.user_id == user_id)
        {
            Some(m) => {
                display_name.clone_into(&mut m.display_name);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn deactivate_stale_memberships(
        &self,
        session_id: Uuid,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<String>, DomainError> {
        let mut tables = self.tables()?;
        let mut deactivated = Vec::new();
        for m in tables
            .memberships
            .iter_mut()
            .filter(|m| m.session_id == session_id && m.is_active && m.last_active_at < cutoff)
        {
            m.is_active = false;
            deactivated.push(m.user_id.clone());
        }
        Ok(deactivated)
    }

    async fn take_over_seat(
        &self,
        session_id: Uuid,
        vacated_user_id: &str,
        replacement: &Membership,
    ) -> Result<bool, DomainError> {
        let mut tables = self.tables()?;
        let Some(position) = tables.memberships.iter().position(|m| {
            m.session_id == session_id
                && m.user_id == vacated_user_id
                && !m.is_active
                && m.join_order == replacement.join_order
        }) else {
            return Ok(false);
        };
        let already_member = tables
            .memberships
            .iter()
            .any(|m| m.session_id == session_id && m.user_id == replacement.user_id);
        if already_member {
            return Ok(false);
        }
        tables.memberships.remove(position);
        tables.memberships.push(replacement.clone());
        Ok(true)
    }

    async fn get_story(
        &self,
        session_id: Uuid,
        story_index: u32,
    ) -> Result<Option<Story>, DomainError> {
        Ok(self
            .tables()?
            .stories
            .iter()
            .find(|s| s.session_id == session_id && s.story_index == story_index)
            .cloned())
    }

    async fn upsert_story_text(&self, text: &StoryText) -> Result<TextUpsert, DomainError> {
        let mut tables = self.tables()?;
        match tables
            .texts
            .iter_mut()
            .find(|t| t.story_id == text.story_id && t.text_order == text.text_order)
        {
            Some(existing) if existing.author_user_id == text.author_user_id => {
                existing.content.clone_from(&text.content);
                existing.created_at = text.created_at;
                Ok(TextUpsert::Updated)
            }
            Some(_) => Ok(TextUpsert::AuthoredByOther),
            None => {
                tables.texts.push(text.clone());
                Ok(TextUpsert::Inserted)
            }
        }
    }

    async fn get_story_text(
        &self,
        story_id: Uuid,
        text_order: u32,
    ) -> Result<Option<StoryText>, DomainError> {
        Ok(self
            .tables()?
            .texts
            .iter()
            .find(|t| t.story_id == story_id && t.text_order == text_order)
            .cloned())
    }

    async fn latest_story_text_before(
        &self,
        story_id: Uuid,
        before_order: u32,
    ) -> Result<Option<StoryText>, DomainError> {
        Ok(self
            .tables()?
            .texts
            .iter()
            .filter(|t| t.story_id == story_id && t.text_order < before_order)
            .max_by_key(|t| t.text_order)
            .cloned())
    }

    async fn insert_round_ready(&self, ready: &RoundReady) -> Result<bool, DomainError> {
        let mut tables = self.tables()?;
        let exists = tables.ready.iter().any(|r| {
            r.session_id == ready.session_id && r.round == ready.round && r.user_id == ready.user_id
        });
        if exists {
            return Ok(false);
        }
        tables.ready.push(ready.clone());
        Ok(true)
    }

    async fn list_round_ready(
        &self,
        session_id: Uuid,
        round: u32,
    ) -> Result<Vec<RoundReady>, DomainError> {
        Ok(self
            .tables()?
            .ready
            .iter()
            .filter(|r| r.session_id == session_id && r.round == round)
            .cloned()
            .collect())
    }
}

/// A repository that always returns an infrastructure error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingGameRepository;

fn refused<T>() -> Result<T, DomainError> {
    Err(DomainError::Infrastructure("connection refused".into()))
}

#[async_trait]
impl GameRepository for FailingGameRepository {
    async fn insert_session(&self, _session: &GameSession) -> Result<(), DomainError> {
        refused()
    }

    async fn get_session(&self, _session_id: Uuid) -> Result<Option<GameSession>, DomainError> {
        refused()
    }

    async fn start_session(&self, _start: &SessionStart) -> Result<bool, DomainError> {
        refused()
    }

    async fn advance_round(
        &self,
        _session_id: Uuid,
        _from_round: u32,
        _to_round: u32,
    ) -> Result<bool, DomainError> {
        refused()
    }

    async fn end_session(
        &self,
        _session_id: Uuid,
        _from_round: u32,
        _ended_at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        refused()
    }

    async fn claim_entry_word(&self, _word: &str, _session_id: Uuid) -> Result<bool, DomainError> {
        refused()
    }

    async fn release_entry_word(&self, _session_id: Uuid) -> Result<(), DomainError> {
        refused()
    }

    async fn find_session_by_entry_word(&self, _word: &str) -> Result<Option<Uuid>, DomainError> {
        refused()
    }

    async fn entry_word_for(&self, _session_id: Uuid) -> Result<Option<String>, DomainError> {
        refused()
    }

    async fn insert_membership(&self, _membership: &Membership) -> Result<bool, DomainError> {
        refused()
    }

    async fn get_membership(
        &self,
        _session_id: Uuid,
        _user_id: &str,
    ) -> Result<Option<Membership>, DomainError> {
        refused()
    }

    async fn list_memberships(&self, _session_id: Uuid) -> Result<Vec<Membership>, DomainError> {
        refused()
    }

    async fn touch_membership(
        &self,
        _session_id: Uuid,
        _user_id: &str,
        _at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        refused()
    }

    async fn rename_membership(
        &self,
        _session_id: Uuid,
        _user_id: &str,
        _display_name: &str,
    ) -> Result<bool, DomainError> {
        refused()
    }

    async fn deactivate_stale_memberships(
        &self,
        _session_id: Uuid,
        _cutoff: DateTime<Utc>,
    ) -> Result<Vec<String>, DomainError> {
        refused()
    }

    async fn take_over_seat(
        &self,
        _session_id: Uuid,
        _vacated_user_id: &str,
        _replacement: &Membership,
    ) -> Result<bool, DomainError> {
        refused()
    }

    async fn get_story(
        &self,
        _session_id: Uuid,
        _story_index: u32,
    ) -> Result<Option<Story>, DomainError> {
        refused()
    }

    async fn upsert_story_text(&self, _text: &StoryText) -> Result<TextUpsert, DomainError> {
        refused()
    }

    async fn get_story_text(
        &self,
        _story_id: Uuid,
        _text_order: u32,
    ) -> Result<Option<StoryText>, DomainError> {
        refused()
    }

    async fn latest_story_text_before(
        &self,
        _story_id: Uuid,
        _before_order: u32,
    ) -> Result<Option<StoryText>, DomainError> {
        refused()
    }

    async fn insert_round_ready(&self, _ready: &RoundReady) -> Result<bool, DomainError> {
        refused()
    }

    async fn list_round_ready(
        &self,
        _session_id: Uuid,
        _round: u32,
    ) -> Result<Vec<RoundReady>, DomainError> {
        refused()
    }
}
