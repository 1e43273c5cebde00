//! Shared application state.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use relaytale_core::clock::Clock;
use relaytale_core::repository::GameRepository;
use relaytale_core::rng::DeterministicRng;
use relaytale_core::settings::SettingsProvider;
use relaytale_session::application::stream::StreamContext;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Clock for deterministic time.
    pub clock: Arc<dyn Clock>,
    /// RNG for entry-word generation.
    pub rng: Arc<Mutex<dyn DeterministicRng + Send>>,
    /// Game state store.
    pub repository: Arc<dyn GameRepository>,
    /// Runtime tunables.
    pub settings: Arc<dyn SettingsProvider>,
    /// Pause between polls of a live status stream.
    pub stream_interval: Duration,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        rng: Arc<Mutex<dyn DeterministicRng + Send>>,
        repository: Arc<dyn GameRepository>,
        settings: Arc<dyn SettingsProvider>,
        stream_interval: Duration,
    ) -> Self {
        Self {
            clock,
            rng,
            repository,
            settings,
            stream_interval,
        }
    }

    /// Collaborators handed to a live status stream task.
    #[must_use]
    pub fn stream_context(&self) -> StreamContext {
        StreamContext {
            clock: Arc::clone(&self.clock),
            settings: Arc::clone(&self.settings),
            repo: Arc::clone(&self.repository),
            interval: self.stream_interval,
        }
    }
}
