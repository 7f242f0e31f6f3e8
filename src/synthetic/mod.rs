//! In-process media backend.
//!
//! Stands in for the platform demuxer, decoders, audio device, renderer and
//! the segment-fetching application, so the engine can be driven end to end
//! without media files or hardware. Used by the demo binary and the tests.

pub mod collaborators;
pub mod decoder;
pub mod extractor;
pub mod layout;
pub mod output;

pub use collaborators::{RecordingRenderer, RecordingSupplier, RenderProbe};
pub use decoder::{SyntheticDecoderFactory, HARDWARE_COMPONENT};
pub use extractor::{SyntheticExtractorFactory, AUDIO_MIME, VIDEO_MIME};
pub use layout::{SegmentLayout, FLAG_NO_TIMESTAMPS, FLAG_SPURIOUS_EMPTY};
pub use output::{ManualOutputFactory, OutputEvent, OutputProbe};
