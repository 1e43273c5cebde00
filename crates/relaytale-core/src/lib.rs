//! Relaytale Core — shared domain model and collaborator traits.
//!
//! This crate defines the records, error taxonomy and collaborator
//! interfaces (repository, settings, clock, RNG) that the game core and its
//! adapters depend on. It contains no infrastructure code.

pub mod clock;
pub mod command;
pub mod error;
pub mod model;
pub mod repository;
pub mod rng;
pub mod settings;
