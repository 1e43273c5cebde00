//! Relaytale — game session lifecycle.
//!
//! Responsible for the session state machine (waiting → in progress →
//! ended), story rotation, presence tracking and slot takeover, round
//! advancement, and the status views observed by clients.

pub mod application;
pub mod domain;
