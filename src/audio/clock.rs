//! Master clock derived from the audio output.
//!
//! The clock reads `offset + played audio`, where the offset is the media
//! time the current audio era started at. The engine rebases the offset
//! whenever playback restarts from a new position; the audio thread keeps
//! the status fields current. Everything sits behind one mutex that is
//! separate from the target-state queue.

use std::sync::{Mutex, MutexGuard};

use crate::audio::output::PlaybackHead;
use crate::core::time::Time;

/// State of the audio thread as last published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioState {
    Initialized,
    Playing,
    Paused,
    Stopped,
    /// The loop has exited.
    Finished,
}

#[derive(Debug)]
struct ClockState {
    offset: Time,
    head: Option<PlaybackHead>,
    state: AudioState,
    buffered_samples: usize,
    samples_written: u64,
}

/// Shared between the engine and the audio thread.
#[derive(Debug)]
pub struct AudioClock {
    inner: Mutex<ClockState>,
}

impl AudioClock {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(ClockState {
                offset: 0,
                head: None,
                state: AudioState::Initialized,
                buffered_samples: 0,
                samples_written: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ClockState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current master time: offset plus audio played so far.
    pub fn timestamp(&self) -> Time {
        let inner = self.lock();
        let played = inner.head.as_ref().map_or(0, PlaybackHead::position);
        inner.offset + played
    }

    pub fn offset(&self) -> Time {
        self.lock().offset
    }

    pub fn set_offset(&self, offset: Time) {
        self.lock().offset = offset;
    }

    /// Restart the clock at `offset`, discarding audio played so far.
    pub fn rebase(&self, offset: Time) {
        let mut inner = self.lock();
        inner.offset = offset;
        if let Some(head) = &inner.head {
            head.reset();
        }
    }

    pub(crate) fn attach_head(&self, head: PlaybackHead) {
        self.lock().head = Some(head);
    }

    pub fn state(&self) -> AudioState {
        self.lock().state
    }

    pub(crate) fn publish(&self, state: AudioState, buffered_samples: usize) {
        let mut inner = self.lock();
        inner.state = state;
        inner.buffered_samples = buffered_samples;
    }

    pub(crate) fn add_written(&self, samples: usize) {
        self.lock().samples_written += samples as u64;
    }

    /// Samples decoded but not yet played.
    pub fn buffered_samples(&self) -> usize {
        self.lock().buffered_samples
    }

    /// Samples handed to the output since the pipeline started.
    pub fn samples_written(&self) -> u64 {
        self.lock().samples_written
    }
}

impl Default for AudioClock {
    fn default() -> Self {
        Self::new()
    }
}
