//! Shared test doubles and utilities for the Relaytale game core.

mod clock;
mod repository;
mod rng;
mod settings;

pub use clock::{FixedClock, ManualClock};
pub use repository::{FailingGameRepository, InMemoryGameRepository};
pub use rng::{MockRng, SequenceRng};
pub use settings::StaticSettings;
