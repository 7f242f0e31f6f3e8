//! Contracts for the demuxer and decoder collaborators.
//!
//! The engine never parses containers or decodes media itself. It opens an
//! [`Extractor`] over a segment store, picks tracks, wraps them in decoders
//! from a [`DecoderFactory`] and pulls [`MediaBuffer`]s out of the resulting
//! [`MediaSource`]s. Audio sources are moved onto the audio thread, so every
//! source must be `Send`.

use std::sync::Arc;

use thiserror::Error;

use crate::core::time::Time;
use crate::media::buffer::MediaBuffer;
use crate::media::format::TrackMetadata;
use crate::segment::SegmentStore;

/// Error type for demuxer and decoder operations
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("no demuxer could be created for store {store}: {reason}")]
    Extractor { store: u64, reason: String },
    #[error("track {0} does not exist")]
    InvalidTrack(usize),
    #[error("no decoder for {mime}: {reason}")]
    Decoder { mime: String, reason: String },
    #[error("decoder failed to start: {0}")]
    Start(String),
}

/// Non-data outcome of a read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadStatus {
    /// The output format changed; query `format()` again.
    FormatChanged,
    /// The decoder's output buffers were reallocated.
    OutputBuffersChanged,
    /// The demuxer crossed a timestamp discontinuity.
    Discontinuity,
    /// No more data in the underlying store.
    EndOfStream,
    /// Unrecoverable decoder or demuxer failure.
    Error(String),
}

impl ReadStatus {
    /// Informational codes that carry no buffer but are not failures.
    pub fn is_informational(&self) -> bool {
        matches!(
            self,
            ReadStatus::FormatChanged | ReadStatus::OutputBuffersChanged | ReadStatus::Discontinuity
        )
    }
}

/// Options for a single read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Seek before reading, to the sync point at or before this time.
    pub seek_to: Option<Time>,
}

/// A pull-based producer of buffers: a demuxed track or a decoder.
pub trait MediaSource: Send {
    fn start(&mut self) -> Result<(), MediaError>;

    fn stop(&mut self);

    /// Block until the next buffer or status is available.
    fn read(&mut self, options: &ReadOptions) -> Result<MediaBuffer, ReadStatus>;

    /// Current output format, if known.
    fn format(&self) -> Option<TrackMetadata>;
}

/// A demuxer opened over one segment store.
pub trait Extractor: Send {
    fn track_count(&self) -> usize;

    fn track_metadata(&self, index: usize) -> Option<TrackMetadata>;

    /// Hand out the demuxed track at `index`.
    fn track(&mut self, index: usize) -> Result<Box<dyn MediaSource>, MediaError>;

    /// Detach from the store. Tracks already handed out report end of
    /// stream from then on and pull no further segments.
    fn close(&mut self);
}

/// Opens demuxers over segment stores.
pub trait ExtractorFactory: Send + Sync {
    fn create(&self, store: Arc<SegmentStore>) -> Result<Box<dyn Extractor>, MediaError>;
}

/// Creates decoders for demuxed tracks.
pub trait DecoderFactory: Send + Sync {
    fn create(
        &self,
        format: &TrackMetadata,
        track: Box<dyn MediaSource>,
    ) -> Result<Box<dyn MediaSource>, MediaError>;
}
