//! Audio decode thread and master clock.

pub mod buffer;
pub mod clock;
#[cfg(feature = "cpal-output")]
pub mod cpal_output;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod queue;

pub use buffer::PcmBuffer;
pub use clock::{AudioClock, AudioState};
#[cfg(feature = "cpal-output")]
pub use cpal_output::CpalOutputFactory;
pub use error::AudioError;
pub use output::{AudioFormat, AudioOutput, AudioOutputFactory, PlaybackHead};
pub use pipeline::{AudioController, AudioPipeline, LoopStatus};
pub use queue::{target_state_queue, TargetState, TargetStateQueue, TargetStateSender};
