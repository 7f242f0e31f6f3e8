//! cpal-backed audio output.
//!
//! The cpal callback pulls samples from a ring shared with [`CpalOutput::write`]
//! and advances the playback head by the audio it actually played. Underruns
//! are filled with silence and do not move the head, so the master clock
//! stalls instead of running ahead of the sound.
//!
//! # Thread Safety
//!
//! - The callback runs on cpal's real-time thread and never blocks: if the
//!   ring is contended it plays silence for that period.
//! - `cpal::Stream` is not `Send`; [`CpalOutputFactory`] is invoked on the
//!   audio thread, which keeps the stream for its whole life.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};
use tracing::{debug, error};

use crate::audio::error::AudioError;
use crate::audio::output::{AudioFormat, AudioOutput, AudioOutputFactory, PlaybackHead};
use crate::core::time;

/// Errors surfaced by cpal
#[derive(Debug)]
pub enum CpalError {
    Stream(cpal::StreamError),
    DefaultConfig(cpal::DefaultStreamConfigError),
    BuildStream(cpal::BuildStreamError),
    PlayStream(cpal::PlayStreamError),
    PauseStream(cpal::PauseStreamError),
}

impl std::fmt::Display for CpalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CpalError::Stream(e) => write!(f, "cpal stream error: {}", e),
            CpalError::DefaultConfig(e) => write!(f, "cpal default config error: {}", e),
            CpalError::BuildStream(e) => write!(f, "cpal build stream error: {}", e),
            CpalError::PlayStream(e) => write!(f, "cpal play stream error: {}", e),
            CpalError::PauseStream(e) => write!(f, "cpal pause stream error: {}", e),
        }
    }
}

impl std::error::Error for CpalError {}

impl From<cpal::StreamError> for CpalError {
    fn from(err: cpal::StreamError) -> Self {
        CpalError::Stream(err)
    }
}

impl From<cpal::DefaultStreamConfigError> for CpalError {
    fn from(err: cpal::DefaultStreamConfigError) -> Self {
        CpalError::DefaultConfig(err)
    }
}

impl From<cpal::BuildStreamError> for CpalError {
    fn from(err: cpal::BuildStreamError) -> Self {
        CpalError::BuildStream(err)
    }
}

impl From<cpal::PlayStreamError> for CpalError {
    fn from(err: cpal::PlayStreamError) -> Self {
        CpalError::PlayStream(err)
    }
}

impl From<cpal::PauseStreamError> for CpalError {
    fn from(err: cpal::PauseStreamError) -> Self {
        CpalError::PauseStream(err)
    }
}

impl From<CpalError> for AudioError {
    fn from(err: CpalError) -> Self {
        AudioError::Output(err.to_string())
    }
}

/// Opens the default output device.
#[derive(Debug, Clone)]
pub struct CpalOutputFactory {
    /// Ring capacity in seconds of audio.
    pub buffer_seconds: f64,
}

impl Default for CpalOutputFactory {
    fn default() -> Self {
        Self {
            buffer_seconds: 0.5,
        }
    }
}

impl AudioOutputFactory for CpalOutputFactory {
    fn create(&self, format: AudioFormat) -> Result<Box<dyn AudioOutput>, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;
        let output = CpalOutput::open(device, format, self.buffer_seconds)?;
        Ok(Box::new(output))
    }
}

/// One cpal output stream.
pub struct CpalOutput {
    stream: Stream,
    ring: Arc<Mutex<VecDeque<f32>>>,
    capacity: usize,
    played_frames: Arc<AtomicU64>,
    head: PlaybackHead,
}

impl CpalOutput {
    fn open(device: Device, format: AudioFormat, buffer_seconds: f64) -> Result<Self, AudioError> {
        let config = StreamConfig {
            channels: format.channels,
            sample_rate: SampleRate(format.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };
        let capacity = ((format.sample_rate as f64 * buffer_seconds) as usize).max(1)
            * format.channels as usize;

        let ring = Arc::new(Mutex::new(VecDeque::with_capacity(capacity)));
        let played_frames = Arc::new(AtomicU64::new(0));
        let head = PlaybackHead::new();

        let cb_ring = Arc::clone(&ring);
        let cb_played = Arc::clone(&played_frames);
        let cb_head = head.clone();
        let channels = format.channels.max(1) as usize;
        let sample_rate = format.sample_rate;

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let Ok(mut ring) = cb_ring.try_lock() else {
                        data.fill(0.0);
                        return;
                    };
                    let available = ring.len().min(data.len());
                    for (slot, sample) in data.iter_mut().zip(ring.drain(..available)) {
                        *slot = sample;
                    }
                    data[available..].fill(0.0);
                    drop(ring);

                    let frames = (available / channels) as u64;
                    if frames > 0 {
                        let total = cb_played.fetch_add(frames, Ordering::AcqRel) + frames;
                        cb_head.set(time::from_samples(total, sample_rate));
                    }
                },
                |err| error!(error = %err, "audio stream error"),
                None,
            )
            .map_err(CpalError::from)?;

        debug!(?config, capacity, "opened cpal output stream");
        Ok(Self {
            stream,
            ring,
            capacity,
            played_frames,
            head,
        })
    }

    fn clear(&mut self) {
        if let Ok(mut ring) = self.ring.lock() {
            ring.clear();
        }
        self.played_frames.store(0, Ordering::Release);
        self.head.reset();
    }
}

impl AudioOutput for CpalOutput {
    fn play(&mut self) -> Result<(), AudioError> {
        self.stream.play().map_err(CpalError::from)?;
        Ok(())
    }

    fn pause(&mut self) -> Result<(), AudioError> {
        self.stream.pause().map_err(CpalError::from)?;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.stream.pause().map_err(CpalError::from)?;
        self.clear();
        Ok(())
    }

    fn flush(&mut self) {
        self.clear();
    }

    fn write(&mut self, samples: &[f32]) -> Result<usize, AudioError> {
        let mut ring = self
            .ring
            .lock()
            .map_err(|_| AudioError::Output("sample ring poisoned".to_string()))?;
        let room = self.capacity.saturating_sub(ring.len());
        let accepted = room.min(samples.len());
        ring.extend(&samples[..accepted]);
        Ok(accepted)
    }

    fn playback_head(&self) -> PlaybackHead {
        self.head.clone()
    }

    fn buffered_samples(&self) -> usize {
        self.ring.lock().map_or(0, |ring| ring.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpal_output_creation() {
        // No device is expected in CI; only exercise the path when one exists.
        let factory = CpalOutputFactory::default();
        let format = AudioFormat {
            sample_rate: 48_000,
            channels: 2,
        };
        if let Ok(mut output) = factory.create(format) {
            assert_eq!(output.playback_head().position(), 0);
            let accepted = output.write(&[0.0; 64]).unwrap();
            assert_eq!(accepted, 64);
            output.flush();
            assert_eq!(output.buffered_samples(), 0);
        }
    }
}
