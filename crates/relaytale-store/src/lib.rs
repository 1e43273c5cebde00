//! Relaytale — `PostgreSQL` persistence.
//!
//! Implements the core's `GameRepository` and `SettingsProvider` against a
//! `PgPool`. Conditional writes are single statements or short
//! transactions so that concurrent requests resolve first-writer-wins.

pub mod pg_game_repository;
pub mod pg_settings;

use sqlx::migrate::Migrator;

/// Embedded schema migrations, applied at startup.
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");
