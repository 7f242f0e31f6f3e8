//! Core types shared by every layer of the player.
//!
//! All media time values are microseconds (`i64`).

pub mod time;

pub use time::Time;
