//! `PostgreSQL` implementation of the `GameRepository` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::debug;
use uuid::Uuid;

use relaytale_core::error::DomainError;
use relaytale_core::model::{
    GamePhase, GameSession, Membership, ProgressMode, RoundReady, Story, StoryText,
};
use relaytale_core::repository::{GameRepository, SessionStart, TextUpsert};

const SESSION_COLUMNS: &str = "session_id, game_name, user_limit, time_limit_minutes, phase, \
     current_round, seat_count, progress_mode, created_at, started_at, ended_at";

const MEMBERSHIP_COLUMNS: &str =
    "session_id, user_id, join_order, display_name, last_active_at, is_active";

const STORY_TEXT_COLUMNS: &str =
    "text_id, story_id, author_user_id, text_order, content, created_at";

/// PostgreSQL-backed game repository.
#[derive(Debug, Clone)]
pub struct PgGameRepository {
    pool: PgPool,
}

impl PgGameRepository {
    /// Creates a new `PgGameRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> DomainError {
    move |e| DomainError::Infrastructure(format!("{context}: {e}"))
}

fn to_db(value: u32) -> Result<i32, DomainError> {
    i32::try_from(value)
        .map_err(|_| DomainError::Infrastructure(format!("{value} does not fit an INTEGER column")))
}

fn column_u32(row: &PgRow, column: &str) -> Result<u32, DomainError> {
    let value: i32 = row.try_get(column).map_err(db_error("failed to decode row"))?;
    u32::try_from(value).map_err(|_| {
        DomainError::Infrastructure(format!("negative value {value} in column {column}"))
    })
}

fn session_from_row(row: &PgRow) -> Result<GameSession, DomainError> {
    let phase_code: i16 = row.try_get("phase").map_err(db_error("failed to decode session"))?;
    let mode: String = row
        .try_get("progress_mode")
        .map_err(db_error("failed to decode session"))?;
    Ok(GameSession {
        session_id: row.try_get("session_id").map_err(db_error("failed to decode session"))?,
        game_name: row.try_get("game_name").map_err(db_error("failed to decode session"))?,
        user_limit: column_u32(row, "user_limit")?,
        time_limit_minutes: column_u32(row, "time_limit_minutes")?,
        phase: GamePhase::from_code(phase_code).ok_or_else(|| {
            DomainError::Infrastructure(format!("unknown phase code {phase_code}"))
        })?,
        current_round: column_u32(row, "current_round")?,
        seat_count: column_u32(row, "seat_count")?,
        progress_mode: ProgressMode::parse(&mode)
            .ok_or_else(|| DomainError::Infrastructure(format!("unknown progress mode {mode:?}")))?,
        created_at: row.try_get("created_at").map_err(db_error("failed to decode session"))?,
        started_at: row.try_get("started_at").map_err(db_error("failed to decode session"))?,
        ended_at: row.try_get("ended_at").map_err(db_error("failed to decode session"))?,
    })
}

fn membership_from_row(row: &PgRow) -> Result<Membership, DomainError> {
    Ok(Membership {
        session_id: row.try_get("session_id").map_err(db_error("failed to decode membership"))?,
        user_id: row.try_get("user_id").map_err(db_error("failed to decode membership"))?,
        join_order: column_u32(row, "join_order")?,
        display_name: row
            .try_get("display_name")
            .map_err(db_error("failed to decode membership"))?,
        last_active_at: row
            .try_get("last_active_at")
            .map_err(db_error("failed to decode membership"))?,
        is_active: row.try_get("is_active").map_err(db_error("failed to decode membership"))?,
    })
}

fn story_from_row(row: &PgRow) -> Result<Story, DomainError> {
    Ok(Story {
        story_id: row.try_get("story_id").map_err(db_error("failed to decode story"))?,
        session_id: row.try_get("session_id").map_err(db_error("failed to decode story"))?,
        story_index: column_u32(row, "story_index")?,
        created_at: row.try_get("created_at").map_err(db_error("failed to decode story"))?,
    })
}

fn story_text_from_row(row: &PgRow) -> Result<StoryText, DomainError> {
    Ok(StoryText {
        text_id: row.try_get("text_id").map_err(db_error("failed to decode story text"))?,
        story_id: row.try_get("story_id").map_err(db_error("failed to decode story text"))?,
        author_user_id: row
            .try_get("author_user_id")
            .map_err(db_error("failed to decode story text"))?,
        text_order: column_u32(row, "text_order")?,
        content: row.try_get("content").map_err(db_error("failed to decode story text"))?,
        created_at: row.try_get("created_at").map_err(db_error("failed to decode story text"))?,
    })
}

fn round_ready_from_row(row: &PgRow) -> Result<RoundReady, DomainError> {
    Ok(RoundReady {
        session_id: row.try_get("session_id").map_err(db_error("failed to decode ready marker"))?,
        round: column_u32(row, "round")?,
        user_id: row.try_get("user_id").map_err(db_error("failed to decode ready marker"))?,
        ready_at: row.try_get("ready_at").map_err(db_error("failed to decode ready marker"))?,
    })
}

#[async_trait]
impl GameRepository for PgGameRepository {
    async fn insert_session(&self, session: &GameSession) -> Result<(), DomainError> {
        sqlx::query(&format!(
            "INSERT INTO game_sessions ({SESSION_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        ))
        .bind(session.session_id)
        .bind(&session.game_name)
        .bind(to_db(session.user_limit)?)
        .bind(to_db(session.time_limit_minutes)?)
        .bind(session.phase.code())
        .bind(to_db(session.current_round)?)
        .bind(to_db(session.seat_count)?)
        .bind(session.progress_mode.as_str())
        .bind(session.created_at)
        .bind(session.started_at)
        .bind(session.ended_at)
        .execute(&self.pool)
        .await
        .map_err(db_error("failed to insert session"))?;
        Ok(())
    }

    async fn get_session(&self, session_id: Uuid) -> Result<Option<GameSession>, DomainError> {
        let row = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS} FROM game_sessions WHERE session_id = $1"
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("failed to load session"))?;
        row.as_ref().map(session_from_row).transpose()
    }

    async fn start_session(&self, start: &SessionStart) -> Result<bool, DomainError> {
        let seat_count = u32::try_from(start.stories.len())
            .map_err(|e| DomainError::Infrastructure(format!("seat count overflow: {e}")))?;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("failed to begin transaction"))?;

        let started = sqlx::query(
            "UPDATE game_sessions \
             SET phase = $2, current_round = 1, started_at = $3, seat_count = $4 \
             WHERE session_id = $1 AND phase = $5",
        )
        .bind(start.session_id)
        .bind(GamePhase::InProgress.code())
        .bind(start.started_at)
        .bind(to_db(seat_count)?)
        .bind(GamePhase::Waiting.code())
        .execute(&mut *tx)
        .await
        .map_err(db_error("failed to start session"))?
        .rows_affected();
        if started == 0 {
            debug!(session_id = %start.session_id, "session no longer waiting");
            return Ok(false);
        }

        // Park every order on its negation so the renumbering below never
        // collides with an order that has not been rewritten yet.
        sqlx::query("UPDATE memberships SET join_order = -join_order WHERE session_id = $1")
            .bind(start.session_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("failed to reseat members"))?;
        for (user_id, join_order) in &start.seating {
            sqlx::query(
                "UPDATE memberships SET join_order = $3 WHERE session_id = $1 AND user_id = $2",
            )
            .bind(start.session_id)
            .bind(user_id)
            .bind(to_db(*join_order)?)
            .execute(&mut *tx)
            .await
            .map_err(db_error("failed to reseat members"))?;
        }

        for story in &start.stories {
            sqlx::query(
                "INSERT INTO stories (story_id, session_id, story_index, created_at) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(story.story_id)
            .bind(story.session_id)
            .bind(to_db(story.story_index)?)
            .bind(story.created_at)
            .execute(&mut *tx)
            .await
            .map_err(db_error("failed to create stories"))?;
        }

        tx.commit()
            .await
            .map_err(db_error("failed to commit session start"))?;
        Ok(true)
    }

    async fn advance_round(
        &self,
        session_id: Uuid,
        from_round: u32,
        to_round: u32,
    ) -> Result<bool, DomainError> {
        let affected = sqlx::query(
            "UPDATE game_sessions SET current_round = $3 \
             WHERE session_id = $1 AND phase = $4 AND current_round = $2",
        )
        .bind(session_id)
        .bind(to_db(from_round)?)
        .bind(to_db(to_round)?)
        .bind(GamePhase::InProgress.code())
        .execute(&self.pool)
        .await
        .map_err(db_error("failed to advance round"))?
        .rows_affected();
        Ok(affected == 1)
    }

    async fn end_session(
        &self,
        session_id: Uuid,
        from_round: u32,
        ended_at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        let affected = sqlx::query(
            "UPDATE game_sessions SET phase = $4, ended_at = $3 \
             WHERE session_id = $1 AND phase = $5 AND current_round = $2",
        )
        .bind(session_id)
        .bind(to_db(from_round)?)
        .bind(ended_at)
        .bind(GamePhase::Ended.code())
        .bind(GamePhase::InProgress.code())
        .execute(&self.pool)
        .await
        .map_err(db_error("failed to end session"))?
        .rows_affected();
        Ok(affected == 1)
    }

    async fn claim_entry_word(&self, word: &str, session_id: Uuid) -> Result<bool, DomainError> {
        let affected = sqlx::query(
            "INSERT INTO entry_words (word, session_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(word)
        .bind(session_id)
        .execute(&self.pool)
        .await
        .map_err(db_error("failed to claim entry word"))?
        .rows_affected();
        Ok(affected == 1)
    }

    async fn release_entry_word(&self, session_id: Uuid) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM entry_words WHERE session_id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(db_error("failed to release entry word"))?;
        Ok(())
    }

    async fn find_session_by_entry_word(&self, word: &str) -> Result<Option<Uuid>, DomainError> {
        sqlx::query_scalar("SELECT session_id FROM entry_words WHERE word = $1")
            .bind(word)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("failed to resolve entry word"))
    }

    async fn entry_word_for(&self, session_id: Uuid) -> Result<Option<String>, DomainError> {
        sqlx::query_scalar("SELECT word FROM entry_words WHERE session_id = $1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("failed to load entry word"))
    }

    async fn insert_membership(&self, membership: &Membership) -> Result<bool, DomainError> {
        let affected = sqlx::query(&format!(
            "INSERT INTO memberships ({MEMBERSHIP_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT DO NOTHING"
        ))
        .bind(membership.session_id)
        .bind(&membership.user_id)
        .bind(to_db(membership.join_order)?)
        .bind(&membership.display_name)
        .bind(membership.last_active_at)
        .bind(membership.is_active)
        .execute(&self.pool)
        .await
        .map_err(db_error("failed to insert membership"))?
        .rows_affected();
        Ok(affected == 1)
    }

    async fn get_membership(
        &self,
        session_id: Uuid,
        user_id: &str,
    ) -> Result<Option<Membership>, DomainError> {
        let row = sqlx::query(&format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM memberships WHERE session_id = $1 AND user_id = $2"
        ))
        .bind(session_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("failed to load membership"))?;
        row.as_ref().map(membership_from_row).transpose()
    }

    async fn list_memberships(&self, session_id: Uuid) -> Result<Vec<Membership>, DomainError> {
        let rows = sqlx::query(&format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM memberships WHERE session_id = $1 \
             ORDER BY join_order"
        ))
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("failed to list memberships"))?;
        rows.iter().map(membership_from_row).collect()
    }

    async fn touch_membership(
        &self,
        session_id: Uuid,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        let affected = sqlx::query(
            "UPDATE memberships SET last_active_at = $3, is_active = TRUE \
             WHERE session_id = $1 AND user_id = $2",
        )
        .bind(session_id)
        .bind(user_id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(db_error("failed to record heartbeat"))?
        .rows_affected();
        Ok(affected == 1)
    }

    async fn rename_membership(
        &self,
        session_id: Uuid,
        user_id: &str,
        display_name: &str,
    ) -> Result<bool, DomainError> {
        let affected = sqlx::query(
            "UPDATE memberships SET display_name = $3 WHERE session_id = $1 AND user_id = $2",
        )
        .bind(session_id)
        .bind(user_id)
        .bind(display_name)
        .execute(&self.pool)
        .await
        .map_err(db_error("failed to rename member"))?
        .rows_affected();
        Ok(affected == 1)
    }

    async fn deactivate_stale_memberships(
        &self,
        session_id: Uuid,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<String>, DomainError> {
        sqlx::query_scalar(
            "UPDATE memberships SET is_active = FALSE \
             WHERE session_id = $1 AND is_active AND last_active_at < $2 \
             RETURNING user_id",
        )
        .bind(session_id)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("failed to sweep presence"))
    }

    async fn take_over_seat(
        &self,
        session_id: Uuid,
        vacated_user_id: &str,
        replacement: &Membership,
    ) -> Result<bool, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("failed to begin transaction"))?;

        let vacated = sqlx::query(
            "DELETE FROM memberships \
             WHERE session_id = $1 AND user_id = $2 AND join_order = $3 AND NOT is_active",
        )
        .bind(session_id)
        .bind(vacated_user_id)
        .bind(to_db(replacement.join_order)?)
        .execute(&mut *tx)
        .await
        .map_err(db_error("failed to vacate seat"))?
        .rows_affected();
        if vacated == 0 {
            return Ok(false);
        }

        let seated = sqlx::query(&format!(
            "INSERT INTO memberships ({MEMBERSHIP_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT DO NOTHING"
        ))
        .bind(session_id)
        .bind(&replacement.user_id)
        .bind(to_db(replacement.join_order)?)
        .bind(&replacement.display_name)
        .bind(replacement.last_active_at)
        .bind(replacement.is_active)
        .execute(&mut *tx)
        .await
        .map_err(db_error("failed to seat replacement"))?
        .rows_affected();
        if seated == 0 {
            return Ok(false);
        }

        tx.commit()
            .await
            .map_err(db_error("failed to commit seat takeover"))?;
        Ok(true)
    }

    async fn get_story(
        &self,
        session_id: Uuid,
        story_index: u32,
    ) -> Result<Option<Story>, DomainError> {
        let row = sqlx::query(
            "SELECT story_id, session_id, story_index, created_at FROM stories \
             WHERE session_id = $1 AND story_index = $2",
        )
        .bind(session_id)
        .bind(to_db(story_index)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("failed to load story"))?;
        row.as_ref().map(story_from_row).transpose()
    }

    async fn upsert_story_text(&self, text: &StoryText) -> Result<TextUpsert, DomainError> {
        let inserted: Option<bool> = sqlx::query_scalar(&format!(
            "INSERT INTO story_texts ({STORY_TEXT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (story_id, text_order) DO UPDATE \
             SET content = EXCLUDED.content, created_at = EXCLUDED.created_at \
             WHERE story_texts.author_user_id = EXCLUDED.author_user_id \
             RETURNING (xmax = 0)"
        ))
        .bind(text.text_id)
        .bind(text.story_id)
        .bind(&text.author_user_id)
        .bind(to_db(text.text_order)?)
        .bind(&text.content)
        .bind(text.created_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("failed to write story text"))?;
        Ok(match inserted {
            Some(true) => TextUpsert::Inserted,
            Some(false) => TextUpsert::Updated,
            None => TextUpsert::AuthoredByOther,
        })
    }

    async fn get_story_text(
        &self,
        story_id: Uuid,
        text_order: u32,
    ) -> Result<Option<StoryText>, DomainError> {
        let row = sqlx::query(&format!(
            "SELECT {STORY_TEXT_COLUMNS} FROM story_texts WHERE story_id = $1 AND text_order = $2"
        ))
        .bind(story_id)
        .bind(to_db(text_order)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("failed to load story text"))?;
        row.as_ref().map(story_text_from_row).transpose()
    }

    async fn latest_story_text_before(
        &self,
        story_id: Uuid,
        before_order: u32,
    ) -> Result<Option<StoryText>, DomainError> {
        let row = sqlx::query(&format!(
            "SELECT {STORY_TEXT_COLUMNS} FROM story_texts \
             WHERE story_id = $1 AND text_order < $2 \
             ORDER BY text_order DESC LIMIT 1"
        ))
        .bind(story_id)
        .bind(to_db(before_order)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("failed to load story text"))?;
        row.as_ref().map(story_text_from_row).transpose()
    }

    async fn insert_round_ready(&self, ready: &RoundReady) -> Result<bool, DomainError> {
        let affected = sqlx::query(
            "INSERT INTO round_ready (session_id, round, user_id, ready_at) \
             VALUES ($1, $2, $3, $4) ON CONFLICT DO NOTHING",
        )
        .bind(ready.session_id)
        .bind(to_db(ready.round)?)
        .bind(&ready.user_id)
        .bind(ready.ready_at)
        .execute(&self.pool)
        .await
        .map_err(db_error("failed to record ready marker"))?
        .rows_affected();
        Ok(affected == 1)
    }

    async fn list_round_ready(
        &self,
        session_id: Uuid,
        round: u32,
    ) -> Result<Vec<RoundReady>, DomainError> {
        let rows = sqlx::query(
            "SELECT session_id, round, user_id, ready_at FROM round_ready \
             WHERE session_id = $1 AND round = $2 ORDER BY ready_at, user_id",
        )
        .bind(session_id)
        .bind(to_db(round)?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("failed to list ready markers"))?;
        rows.iter().map(round_ready_from_row).collect()
    }
}
