//! Audio output whose clock is moved by hand.
//!
//! Writes are accepted in full and discarded. The playback head only moves
//! when the owner of the [`OutputProbe`] advances it, or back to zero on
//! flush and stop, which makes the master clock fully deterministic.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use crate::audio::{AudioError, AudioFormat, AudioOutput, AudioOutputFactory, PlaybackHead};
use crate::core::time::Time;

/// Calls observed by a [`ManualOutput`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputEvent {
    Created(AudioFormat),
    Play,
    Pause,
    Stop,
    Flush,
}

#[derive(Debug, Default)]
struct ProbeLog {
    events: Vec<OutputEvent>,
    samples_written: usize,
    write_calls: usize,
}

/// Shared view of every output a [`ManualOutputFactory`] creates.
#[derive(Debug, Clone, Default)]
pub struct OutputProbe {
    log: Arc<Mutex<ProbeLog>>,
    head: PlaybackHead,
}

impl OutputProbe {
    fn log(&self) -> MutexGuard<'_, ProbeLog> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn events(&self) -> Vec<OutputEvent> {
        self.log().events.clone()
    }

    pub fn count(&self, event: &OutputEvent) -> usize {
        self.log().events.iter().filter(|e| *e == event).count()
    }

    pub fn samples_written(&self) -> usize {
        self.log().samples_written
    }

    pub fn write_calls(&self) -> usize {
        self.log().write_calls
    }

    /// Pretend `by` more audio has been played.
    pub fn advance(&self, by: Time) {
        self.head.advance(by);
    }

    pub fn head(&self) -> PlaybackHead {
        self.head.clone()
    }

    /// Poll until `event` has been seen at least `times` times. Returns
    /// false after five seconds.
    pub fn wait_for(&self, event: &OutputEvent, times: usize) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if self.count(event) >= times {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        false
    }
}

/// Creates [`ManualOutput`]s sharing one probe.
#[derive(Debug, Clone, Default)]
pub struct ManualOutputFactory {
    probe: OutputProbe,
    /// Outputs created before the factory starts refusing.
    limit: Option<usize>,
}

impl ManualOutputFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory that behaves as if no device were present.
    pub fn failing() -> Self {
        Self::failing_after(0)
    }

    /// A factory whose device disappears after `created` outputs.
    pub fn failing_after(created: usize) -> Self {
        Self {
            limit: Some(created),
            ..Self::default()
        }
    }

    pub fn probe(&self) -> OutputProbe {
        self.probe.clone()
    }
}

impl AudioOutputFactory for ManualOutputFactory {
    fn create(&self, format: AudioFormat) -> Result<Box<dyn AudioOutput>, AudioError> {
        let mut log = self.probe.log();
        let created = log
            .events
            .iter()
            .filter(|e| matches!(e, OutputEvent::Created(_)))
            .count();
        if self.limit.map_or(false, |limit| created >= limit) {
            return Err(AudioError::NoDevice);
        }
        log.events.push(OutputEvent::Created(format));
        Ok(Box::new(ManualOutput {
            probe: self.probe.clone(),
        }))
    }
}

pub struct ManualOutput {
    probe: OutputProbe,
}

impl ManualOutput {
    fn record(&self, event: OutputEvent) {
        self.probe.log().events.push(event);
    }
}

impl AudioOutput for ManualOutput {
    fn play(&mut self) -> Result<(), AudioError> {
        self.record(OutputEvent::Play);
        Ok(())
    }

    fn pause(&mut self) -> Result<(), AudioError> {
        self.record(OutputEvent::Pause);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.probe.head.reset();
        self.record(OutputEvent::Stop);
        Ok(())
    }

    fn flush(&mut self) {
        self.probe.head.reset();
        self.record(OutputEvent::Flush);
    }

    fn write(&mut self, samples: &[f32]) -> Result<usize, AudioError> {
        let mut log = self.probe.log();
        log.samples_written += samples.len();
        log.write_calls += 1;
        Ok(samples.len())
    }

    fn playback_head(&self) -> PlaybackHead {
        self.probe.head()
    }

    fn buffered_samples(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_head_moves_only_by_hand() {
        let factory = ManualOutputFactory::new();
        let probe = factory.probe();
        let mut output = factory
            .create(AudioFormat {
                sample_rate: 48_000,
                channels: 2,
            })
            .unwrap();

        output.play().unwrap();
        assert_eq!(output.write(&[0.0; 10]).unwrap(), 10);
        assert_eq!(output.playback_head().position(), 0);

        probe.advance(20_000);
        assert_eq!(output.playback_head().position(), 20_000);

        output.flush();
        assert_eq!(probe.head().position(), 0);
        assert_eq!(probe.count(&OutputEvent::Play), 1);
        assert_eq!(probe.count(&OutputEvent::Flush), 1);
        assert_eq!(probe.samples_written(), 10);
    }

    #[test]
    fn test_failing_factory() {
        let factory = ManualOutputFactory::failing();
        let result = factory.create(AudioFormat {
            sample_rate: 44_100,
            channels: 1,
        });
        assert!(matches!(result, Err(AudioError::NoDevice)));
    }

    #[test]
    fn test_factory_fails_after_limit() {
        let factory = ManualOutputFactory::failing_after(1);
        let format = AudioFormat {
            sample_rate: 48_000,
            channels: 2,
        };
        assert!(factory.create(format).is_ok());
        assert!(matches!(factory.create(format), Err(AudioError::NoDevice)));
        assert!(matches!(factory.create(format), Err(AudioError::NoDevice)));
    }
}
