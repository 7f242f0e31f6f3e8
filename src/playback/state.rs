//! Playback state machine.

use std::fmt;

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Stopped - no playback active
    #[default]
    Stopped,
    /// Paused - decode sources and audio thread kept, nothing advances
    Paused,
    /// Playing - video frames are pulled every update
    Playing,
    /// Seeking - waiting for the segment covering the seek target
    Seeking,
    /// FormatChanging - the active era ran out and the next one is queued
    FormatChanging,
}

impl PlaybackState {
    /// Check if currently playing
    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackState::Playing)
    }

    /// Check if paused
    pub fn is_paused(&self) -> bool {
        matches!(self, PlaybackState::Paused)
    }

    /// Check if stopped
    pub fn is_stopped(&self) -> bool {
        matches!(self, PlaybackState::Stopped)
    }

    /// Check if seeking
    pub fn is_seeking(&self) -> bool {
        matches!(self, PlaybackState::Seeking)
    }

    pub fn is_format_changing(&self) -> bool {
        matches!(self, PlaybackState::FormatChanging)
    }

    /// Whether a seek may start from this state.
    pub fn can_seek(&self) -> bool {
        matches!(
            self,
            PlaybackState::Playing | PlaybackState::Paused | PlaybackState::FormatChanging
        )
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlaybackState::Stopped => "stopped",
            PlaybackState::Paused => "paused",
            PlaybackState::Playing => "playing",
            PlaybackState::Seeking => "seeking",
            PlaybackState::FormatChanging => "format-changing",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = PlaybackState::default();
        assert!(state.is_stopped());
        assert!(!state.can_seek());
    }

    #[test]
    fn test_seekable_states() {
        assert!(PlaybackState::Playing.can_seek());
        assert!(PlaybackState::Paused.can_seek());
        assert!(PlaybackState::FormatChanging.can_seek());
        assert!(!PlaybackState::Seeking.can_seek());
        assert!(!PlaybackState::Stopped.can_seek());
    }

    #[test]
    fn test_display() {
        assert_eq!(PlaybackState::FormatChanging.to_string(), "format-changing");
    }
}
