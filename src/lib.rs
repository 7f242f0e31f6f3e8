//! Playback core for adaptive (HLS) streams.
//!
//! The application fetches segments and feeds them in; the engine buffers
//! them per continuity era, decodes video on the caller's thread, decodes
//! audio on its own thread, and keeps video in sync with the audio clock.

pub mod audio;
pub mod config;
pub mod core;
pub mod media;
pub mod playback;
pub mod segment;
pub mod synthetic;

pub use config::{ConfigError, PlayerConfig};
pub use playback::{MediaBackend, PlaybackEngine, PlaybackState, PlayerError, UpdateStatus};
pub use segment::{FeedStatus, Segment};
