//! The audio decode loop and its control-side handle.
//!
//! [`AudioController`] lives on a dedicated thread. Each [`AudioController::update`]
//! applies at most one queued [`TargetState`], then performs one read from
//! the audio decoder or one write to the output. [`AudioPipeline`] is what
//! the engine holds: it spawns the thread, forwards target states, and reads
//! the master clock.
//!
//! Outputs are created on the audio thread itself because platform streams
//! are generally not `Send`. Creation and decoder start are reported back
//! before [`AudioPipeline::start`] returns, so a failure there is seen by the
//! caller synchronously.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel;
use tracing::{debug, error, info, warn};

use crate::audio::buffer::PcmBuffer;
use crate::audio::clock::{AudioClock, AudioState};
use crate::audio::error::AudioError;
use crate::audio::output::{AudioFormat, AudioOutput, AudioOutputFactory};
use crate::audio::queue::{target_state_queue, TargetState, TargetStateQueue, TargetStateSender};
use crate::config::PlayerConfig;
use crate::core::time::Time;
use crate::media::{MediaSource, Payload, ReadOptions, ReadStatus};

/// Result of one controller iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopStatus {
    Continue,
    Finished,
}

/// Audio-thread side: owns the decoder, the output and the pending PCM.
pub struct AudioController {
    queue: TargetStateQueue,
    clock: Arc<AudioClock>,
    output: Box<dyn AudioOutput>,
    format: AudioFormat,
    source: Option<Box<dyn MediaSource>>,
    pending: Option<PcmBuffer>,
    state: AudioState,
    write_chunk: usize,
    idle_sleep: Duration,
    at_end_of_stream: bool,
    finished: bool,
}

impl AudioController {
    pub fn new(
        queue: TargetStateQueue,
        clock: Arc<AudioClock>,
        output: Box<dyn AudioOutput>,
        format: AudioFormat,
        config: &PlayerConfig,
    ) -> Self {
        clock.attach_head(output.playback_head());
        Self {
            queue,
            clock,
            output,
            format,
            source: None,
            pending: None,
            state: AudioState::Initialized,
            write_chunk: config.audio_write_chunk.max(1),
            idle_sleep: config.audio_idle_sleep(),
            at_end_of_stream: false,
            finished: false,
        }
    }

    pub fn state(&self) -> AudioState {
        self.state
    }

    /// Install the initial decoder, starting it unless the caller already did.
    pub fn install_source(
        &mut self,
        mut source: Box<dyn MediaSource>,
        already_started: bool,
    ) -> Result<(), AudioError> {
        if let Some(mut old) = self.source.take() {
            old.stop();
        }
        self.pending = None;
        self.at_end_of_stream = false;

        if !already_started {
            source
                .start()
                .map_err(|e| AudioError::SourceStart(e.to_string()))?;
        }
        if let Some(meta) = source.format() {
            if let Ok(format) = AudioFormat::from_metadata(&meta) {
                if format != self.format {
                    warn!(?format, output = ?self.format, "audio source format differs from output");
                }
            }
        }
        self.source = Some(source);
        Ok(())
    }

    /// One iteration of the audio loop.
    pub fn update(&mut self) -> LoopStatus {
        if self.finished {
            return LoopStatus::Finished;
        }

        let mut worked = false;
        if let Some(target) = self.queue.pop() {
            debug!(?target, "applying audio target state");
            self.apply(target);
            worked = true;
            if self.finished {
                self.clock.publish(AudioState::Finished, 0);
                return LoopStatus::Finished;
            }
        }

        if self.state == AudioState::Playing {
            worked |= self.step();
        }

        self.clock.publish(self.state, self.buffered_samples());
        if !worked {
            thread::sleep(self.idle_sleep);
        }
        LoopStatus::Continue
    }

    fn apply(&mut self, target: TargetState) {
        match target {
            TargetState::Play => match self.output.play() {
                Ok(()) => self.state = AudioState::Playing,
                Err(e) => {
                    error!(error = %e, "audio output refused to play");
                    self.state = AudioState::Stopped;
                }
            },
            TargetState::Pause => {
                if let Err(e) = self.output.pause() {
                    warn!(error = %e, "audio output failed to pause");
                }
                self.state = AudioState::Paused;
            }
            TargetState::Flush => {
                self.output.flush();
                self.pending = None;
            }
            TargetState::Stop { seeking } => {
                if let Err(e) = self.output.stop() {
                    warn!(error = %e, "audio output failed to stop");
                }
                self.pending = None;
                self.state = AudioState::Stopped;
                if !seeking {
                    if let Some(mut source) = self.source.take() {
                        source.stop();
                    }
                    self.finished = true;
                }
            }
            TargetState::SetSource {
                source,
                already_started,
            } => {
                if let Err(e) = self.install_source(source, already_started) {
                    error!(error = %e, "failed to install audio source");
                    self.state = AudioState::Stopped;
                }
            }
            TargetState::ClearSource => {
                if let Some(mut source) = self.source.take() {
                    source.stop();
                }
                self.pending = None;
            }
        }
    }

    /// Read one buffer or write one chunk. Returns false when there was
    /// nothing to do.
    fn step(&mut self) -> bool {
        if self.pending.is_none() && !self.fill_pending() {
            return false;
        }

        let Some(pending) = self.pending.as_mut() else {
            return true;
        };
        let len = pending.remaining().len().min(self.write_chunk);
        match self.output.write(&pending.remaining()[..len]) {
            Ok(0) => false, // output full
            Ok(written) => {
                pending.advance(written);
                let drained = pending.is_drained();
                self.clock.add_written(written);
                if drained {
                    self.pending = None;
                }
                true
            }
            Err(e) => {
                error!(error = %e, "audio output write failed");
                self.state = AudioState::Stopped;
                false
            }
        }
    }

    fn fill_pending(&mut self) -> bool {
        let Some(source) = self.source.as_mut() else {
            return false;
        };
        match source.read(&ReadOptions::default()) {
            Ok(buffer) => {
                self.at_end_of_stream = false;
                let timestamp = buffer.timestamp.unwrap_or(0);
                match buffer.payload {
                    Payload::Pcm(samples) if !samples.is_empty() => {
                        self.pending = Some(PcmBuffer::new(
                            samples,
                            self.format.channels,
                            self.format.sample_rate,
                            timestamp,
                        ));
                    }
                    Payload::Pcm(_) | Payload::Empty => {}
                    _ => warn!("audio decoder produced a non-PCM buffer"),
                }
                true
            }
            Err(status) if status.is_informational() => {
                debug!(?status, "audio decoder status");
                true
            }
            Err(ReadStatus::EndOfStream) => {
                if !self.at_end_of_stream {
                    debug!("audio decoder reached end of stream");
                    self.at_end_of_stream = true;
                }
                false
            }
            Err(status) => {
                error!(?status, "audio decoder failed");
                self.state = AudioState::Stopped;
                false
            }
        }
    }

    fn buffered_samples(&self) -> usize {
        self.output.buffered_samples() + self.pending.as_ref().map_or(0, |p| p.remaining().len())
    }
}

/// Control-side handle to the audio thread.
pub struct AudioPipeline {
    sender: TargetStateSender,
    clock: Arc<AudioClock>,
    format: AudioFormat,
    thread: Option<JoinHandle<()>>,
    /// Set once a final stop has been queued; the loop is about to exit.
    finishing: AtomicBool,
}

impl AudioPipeline {
    /// Spawn the audio thread with `source` installed. The output is left
    /// stopped until a [`TargetState::Play`] arrives.
    pub fn start(
        factory: Arc<dyn AudioOutputFactory>,
        format: AudioFormat,
        source: Box<dyn MediaSource>,
        config: &PlayerConfig,
    ) -> Result<Self, AudioError> {
        let (sender, queue) = target_state_queue();
        let clock = Arc::new(AudioClock::new());
        let (init_tx, init_rx) = channel::bounded::<Result<(), AudioError>>(1);

        let thread_clock = Arc::clone(&clock);
        let config = config.clone();
        let handle = thread::Builder::new()
            .name("audio-pipeline".to_string())
            .spawn(move || {
                let output = match factory.create(format) {
                    Ok(output) => output,
                    Err(e) => {
                        let _ = init_tx.send(Err(e));
                        return;
                    }
                };
                let mut controller = AudioController::new(queue, thread_clock, output, format, &config);
                if let Err(e) = controller.install_source(source, false) {
                    let _ = init_tx.send(Err(e));
                    return;
                }
                if init_tx.send(Ok(())).is_err() {
                    return;
                }

                while controller.update() == LoopStatus::Continue {
                    thread::yield_now();
                }
                debug!("audio loop finished");
            })
            .map_err(AudioError::Spawn)?;

        let ready = init_rx.recv().unwrap_or(Err(AudioError::InitAborted));
        if let Err(e) = ready {
            if handle.join().is_err() {
                error!("audio thread panicked during startup");
            }
            return Err(e);
        }

        info!(
            sample_rate = format.sample_rate,
            channels = format.channels,
            "audio pipeline started"
        );
        Ok(Self {
            sender,
            clock,
            format,
            thread: Some(handle),
            finishing: AtomicBool::new(false),
        })
    }

    /// Queue a target state for the audio thread.
    pub fn push_target_state(&self, state: TargetState) -> Result<(), AudioError> {
        let last = matches!(state, TargetState::Stop { seeking: false });
        self.sender.push(state)?;
        if last {
            self.finishing.store(true, Ordering::Release);
        }
        Ok(())
    }

    /// Target states not yet applied by the audio thread.
    pub fn target_state_count(&self) -> usize {
        self.sender.pending()
    }

    /// Current master time.
    pub fn timestamp(&self) -> Time {
        self.clock.timestamp()
    }

    pub fn set_timestamp_offset(&self, offset: Time) {
        self.clock.set_offset(offset);
    }

    /// Restart the master clock at `offset`.
    pub fn rebase_clock(&self, offset: Time) {
        self.clock.rebase(offset);
    }

    pub fn clock(&self) -> &Arc<AudioClock> {
        &self.clock
    }

    pub fn state(&self) -> AudioState {
        self.clock.state()
    }

    pub fn buffered_samples(&self) -> usize {
        self.clock.buffered_samples()
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Whether a final stop has been queued.
    pub fn is_finishing(&self) -> bool {
        self.finishing.load(Ordering::Acquire)
    }

    /// True while the thread is alive and will keep applying target states.
    pub fn is_running(&self) -> bool {
        !self.is_finishing() && self.thread.as_ref().map_or(false, |t| !t.is_finished())
    }

    /// Ask the loop to finish and join the thread.
    pub fn shutdown(&mut self) {
        let Some(handle) = self.thread.take() else {
            return;
        };
        // Fails only if the loop already exited.
        let _ = self.sender.push(TargetState::Stop { seeking: false });
        self.finishing.store(true, Ordering::Release);
        if handle.join().is_err() {
            error!("audio thread panicked");
        }
        debug!("audio pipeline shut down");
    }
}

impl Drop for AudioPipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}
