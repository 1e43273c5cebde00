//! Pure domain rules: no I/O, no clocks.

pub mod commands;
pub mod entry_word;
pub mod progression;
pub mod rotation;
pub mod seating;
pub mod validation;
