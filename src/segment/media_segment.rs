//! Media segments as handed over by the controlling application.

use std::path::PathBuf;
use std::sync::Arc;

use crate::core::time::{self, Time};

/// Where a segment's bytes live.
#[derive(Debug, Clone)]
pub enum SegmentSource {
    /// Bytes already in memory (downloaded by the application).
    Memory(Arc<[u8]>),
    /// A cached file on disk, read when the demuxer reaches it.
    File(PathBuf),
}

/// A discrete, independently appendable chunk of media.
///
/// Immutable once built; ownership moves into a [`SegmentStore`] on append.
///
/// [`SegmentStore`]: crate::segment::SegmentStore
#[derive(Debug, Clone)]
pub struct Segment {
    pub uri: String,
    pub source: SegmentSource,
    /// Quality tier chosen by the application's bitrate logic.
    pub quality: u32,
    /// Continuity era; segments sharing an era are time-contiguous.
    pub era: u32,
    /// Declared presentation start time (microseconds).
    pub start_time: Time,
}

impl Segment {
    pub fn from_bytes(
        uri: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
        quality: u32,
        era: u32,
        start_seconds: f64,
    ) -> Self {
        Self {
            uri: uri.into(),
            source: SegmentSource::Memory(bytes.into()),
            quality,
            era,
            start_time: time::from_seconds(start_seconds),
        }
    }

    pub fn from_file(path: impl Into<PathBuf>, quality: u32, era: u32, start_seconds: f64) -> Self {
        let path = path.into();
        Self {
            uri: path.display().to_string(),
            source: SegmentSource::File(path),
            quality,
            era,
            start_time: time::from_seconds(start_seconds),
        }
    }
}

/// A segment pulled out of a store by the demuxer, with its bytes resolved.
#[derive(Debug, Clone)]
pub struct SegmentChunk {
    pub uri: String,
    pub quality: u32,
    pub era: u32,
    pub start_time: Time,
    pub bytes: Arc<[u8]>,
}
