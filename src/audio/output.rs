//! The sink that decoded PCM is written to.
//!
//! An output owns a playback head: the amount of audio actually played since
//! it was created or last flushed, advanced by whatever drives the hardware.
//! The head is the basis of the master clock, so it must only move while
//! the output is playing.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use crate::audio::error::AudioError;
use crate::core::time::Time;
use crate::media::TrackMetadata;

/// Shape of the PCM the output is fed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioFormat {
    /// Read the format off a decoded audio track.
    pub fn from_metadata(format: &TrackMetadata) -> Result<Self, AudioError> {
        let sample_rate = format
            .sample_rate
            .ok_or(AudioError::IncompleteFormat("sample rate"))?;
        let channels = format
            .channels
            .ok_or(AudioError::IncompleteFormat("channel count"))?;
        Ok(Self {
            sample_rate,
            channels,
        })
    }
}

/// Played-audio position in microseconds, shared with the clock.
#[derive(Debug, Clone, Default)]
pub struct PlaybackHead(Arc<AtomicI64>);

impl PlaybackHead {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> Time {
        self.0.load(Ordering::Acquire)
    }

    pub fn set(&self, position: Time) {
        self.0.store(position, Ordering::Release);
    }

    pub fn advance(&self, by: Time) {
        self.0.fetch_add(by, Ordering::AcqRel);
    }

    pub fn reset(&self) {
        self.set(0);
    }
}

/// A PCM sink. Lives on the audio thread, so it need not be `Send`.
pub trait AudioOutput {
    fn play(&mut self) -> Result<(), AudioError>;

    fn pause(&mut self) -> Result<(), AudioError>;

    /// Stop playback and discard queued audio.
    fn stop(&mut self) -> Result<(), AudioError>;

    /// Discard queued audio and reset the playback head.
    fn flush(&mut self);

    /// Queue interleaved samples; returns how many were accepted.
    fn write(&mut self, samples: &[f32]) -> Result<usize, AudioError>;

    fn playback_head(&self) -> PlaybackHead;

    /// Samples queued but not yet played.
    fn buffered_samples(&self) -> usize;
}

/// Opens outputs on the audio thread.
pub trait AudioOutputFactory: Send + Sync {
    fn create(&self, format: AudioFormat) -> Result<Box<dyn AudioOutput>, AudioError>;
}
