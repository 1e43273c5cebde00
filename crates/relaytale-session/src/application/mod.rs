//! Application services: each handler loads state through the repository,
//! applies the domain rules and writes back through conditional updates.

pub mod entry_words;
pub mod presence;
pub mod progression;
pub mod query_handlers;
pub mod stream;
pub mod submission;
pub mod tunables;

use relaytale_core::error::DomainError;
use relaytale_core::model::{GamePhase, GameSession, Membership};
use relaytale_core::repository::GameRepository;
use uuid::Uuid;

/// Loads a session or fails with `SessionNotFound`.
pub(crate) async fn load_session(
    repo: &dyn GameRepository,
    session_id: Uuid,
) -> Result<GameSession, DomainError> {
    repo.get_session(session_id)
        .await?
        .ok_or(DomainError::SessionNotFound(session_id))
}

/// Loads a membership or fails with `NotAMember`.
pub(crate) async fn load_member(
    repo: &dyn GameRepository,
    session_id: Uuid,
    user_id: &str,
) -> Result<Membership, DomainError> {
    repo.get_membership(session_id, user_id)
        .await?
        .ok_or_else(|| DomainError::NotAMember {
            session_id,
            user_id: user_id.to_owned(),
        })
}

/// Fails with `InvalidPhase` unless the session is in `expected`.
pub(crate) fn require_phase(session: &GameSession, expected: GamePhase) -> Result<(), DomainError> {
    if session.phase == expected {
        Ok(())
    } else {
        Err(DomainError::InvalidPhase {
            expected,
            actual: session.phase,
        })
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Shared setup for handler tests.

    use std::sync::Mutex;

    use chrono::{DateTime, TimeZone, Utc};
    use relaytale_core::model::ProgressMode;
    use relaytale_core::rng::DeterministicRng;
    use relaytale_test_support::{InMemoryGameRepository, ManualClock, MockRng, StaticSettings};
    use uuid::Uuid;

    use crate::application::presence::handle_join_session;
    use crate::application::progression::{handle_create_session, handle_start_game};
    use crate::domain::commands::{CreateSession, JoinSession, StartGame};

    pub fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
    }

    /// Collaborators for one scenario.
    pub struct World {
        pub clock: ManualClock,
        pub settings: StaticSettings,
        pub repo: InMemoryGameRepository,
        pub rng: Mutex<MockRng>,
    }

    impl World {
        pub fn new() -> Self {
            Self {
                clock: ManualClock::new(t0()),
                settings: StaticSettings::empty(),
                repo: InMemoryGameRepository::new(),
                rng: Mutex::new(MockRng),
            }
        }

        pub fn rng(&self) -> &Mutex<dyn DeterministicRng + Send> {
            &self.rng
        }

        /// Creates a lobby owned by `u1` and returns its id and entry word.
        pub async fn lobby(&self, mode: ProgressMode, time_limit: u32) -> (Uuid, String) {
            let command = CreateSession {
                correlation_id: Uuid::new_v4(),
                game_name: "Fables".to_owned(),
                creator_user_id: "u1".to_owned(),
                creator_name: "Player 1".to_owned(),
                user_limit: 10,
                time_limit_minutes: Some(time_limit),
                progress_mode: mode,
            };
            let created =
                handle_create_session(&command, &self.clock, self.rng(), &self.settings, &self.repo)
                    .await
                    .unwrap();
            (created.session_id, created.entry_word)
        }

        pub async fn join(&self, entry_word: &str, user_id: &str) {
            let command = JoinSession {
                correlation_id: Uuid::new_v4(),
                entry_word: entry_word.to_owned(),
                player_name: format!("Player {}", &user_id[1..]),
                user_id: user_id.to_owned(),
            };
            handle_join_session(&command, &self.clock, &self.settings, &self.repo)
                .await
                .unwrap();
        }

        /// Creates a lobby, joins `u2..=u{players}` and starts the game.
        pub async fn started(&self, mode: ProgressMode, players: u32) -> (Uuid, String) {
            let (session_id, word) = self.lobby(mode, 1).await;
            for n in 2..=players {
                self.join(&word, &format!("u{n}")).await;
            }
            let command = StartGame {
                correlation_id: Uuid::new_v4(),
                session_id,
                user_id: "u1".to_owned(),
            };
            handle_start_game(&command, &self.clock, &self.settings, &self.repo)
                .await
                .unwrap();
            (session_id, word)
        }
    }
}
