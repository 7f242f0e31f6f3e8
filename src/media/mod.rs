//! Boundary with the external media collaborators: demuxer, decoders,
//! renderer and the segment-supplying application.

pub mod buffer;
pub mod format;
pub mod render;
pub mod source;

pub use buffer::{MediaBuffer, Payload};
pub use format::{CropRect, TrackKind, TrackMetadata};
pub use render::{RenderError, RenderPath, SegmentSupplier, VideoRenderer};
pub use source::{
    DecoderFactory, Extractor, ExtractorFactory, MediaError, MediaSource, ReadOptions, ReadStatus,
};
