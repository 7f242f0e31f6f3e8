//! Era-aware buffer of appended segments feeding one demuxer.
//!
//! A store accumulates segments of a single continuity era. The first
//! segment appended (after creation or after `clear_sources`) fixes the era
//! and the store's recorded start time; a segment from any other era is
//! handed back as a discontinuity so the caller can route it elsewhere.
//!
//! The store is shared between the control thread and the audio thread
//! through the demuxer, so all state sits behind one mutex.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::{debug, warn};

use crate::core::time::Time;
use crate::segment::media_segment::{Segment, SegmentChunk, SegmentSource};

static NEXT_STORE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("segment {uri} is not readable yet: {source}")]
    Unavailable {
        uri: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read segment {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result of [`SegmentStore::append`].
#[derive(Debug)]
pub enum AppendOutcome {
    /// Queued and readable.
    Appended,
    /// Queued, but its bytes could not be reached yet. Playback continues on
    /// the assumption the data shows up before the demuxer needs it.
    Provisional(StoreError),
    /// The segment belongs to another continuity era. It was not queued and
    /// is handed back to the caller.
    Discontinuity(Segment),
}

#[derive(Debug, Default)]
struct StoreInner {
    era: Option<u32>,
    start_time: Option<Time>,
    quality: Option<u32>,
    queued: VecDeque<Segment>,
    appended: u64,
    consumed: u64,
}

/// Ordered buffer of segments belonging to one continuity era.
#[derive(Debug)]
pub struct SegmentStore {
    id: u64,
    inner: Mutex<StoreInner>,
}

impl SegmentStore {
    pub fn new() -> Self {
        Self {
            id: NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed),
            inner: Mutex::new(StoreInner::default()),
        }
    }

    /// Process-unique id, used in logs.
    pub fn id(&self) -> u64 {
        self.id
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a segment to the end of the store.
    pub fn append(&self, segment: Segment) -> AppendOutcome {
        // Probe file-backed segments before taking the lock
        let unavailable = match &segment.source {
            SegmentSource::File(path) => std::fs::metadata(path).err(),
            SegmentSource::Memory(_) => None,
        };

        let mut inner = self.lock();
        match inner.era {
            Some(era) if era != segment.era => {
                debug!(
                    store = self.id,
                    store_era = era,
                    segment_era = segment.era,
                    uri = %segment.uri,
                    "segment belongs to another continuity era"
                );
                return AppendOutcome::Discontinuity(segment);
            }
            Some(_) => {}
            None => inner.era = Some(segment.era),
        }
        if inner.start_time.is_none() {
            inner.start_time = Some(segment.start_time);
        }
        inner.quality = Some(segment.quality);
        inner.appended += 1;

        let uri = segment.uri.clone();
        inner.queued.push_back(segment);
        debug!(
            store = self.id,
            uri = %uri,
            preloaded = inner.queued.len(),
            "segment appended"
        );

        match unavailable {
            Some(source) => AppendOutcome::Provisional(StoreError::Unavailable { uri, source }),
            None => AppendOutcome::Appended,
        }
    }

    /// Pop the oldest unconsumed segment for the demuxer.
    ///
    /// Returns `None` when the store has nothing buffered. File-backed
    /// segments are read here, outside the store lock.
    pub fn next_segment(&self) -> Option<Result<SegmentChunk, StoreError>> {
        let segment = {
            let mut inner = self.lock();
            let segment = inner.queued.pop_front()?;
            inner.consumed += 1;
            segment
        };

        let bytes = match segment.source {
            SegmentSource::Memory(bytes) => bytes,
            SegmentSource::File(path) => match std::fs::read(&path) {
                Ok(bytes) => bytes.into(),
                Err(source) => {
                    warn!(store = self.id, path = %path.display(), error = %source, "segment read failed");
                    return Some(Err(StoreError::Read { path, source }));
                }
            },
        };

        Some(Ok(SegmentChunk {
            uri: segment.uri,
            quality: segment.quality,
            era: segment.era,
            start_time: segment.start_time,
            bytes,
        }))
    }

    /// Number of segments appended but not yet pulled by the demuxer.
    pub fn preloaded_segment_count(&self) -> usize {
        self.lock().queued.len()
    }

    /// Discard buffered-but-unconsumed segments.
    ///
    /// The era and recorded start time are forgotten as well, so the next
    /// appended segment defines them again.
    pub fn clear_sources(&self) {
        let mut inner = self.lock();
        let dropped = inner.queued.len();
        inner.queued.clear();
        inner.era = None;
        inner.start_time = None;
        debug!(store = self.id, dropped, "cleared buffered segments");
    }

    pub fn era(&self) -> Option<u32> {
        self.lock().era
    }

    /// Start time of the first segment appended since creation or the last clear.
    pub fn start_time(&self) -> Option<Time> {
        self.lock().start_time
    }

    /// Quality tier of the most recently appended segment.
    pub fn quality(&self) -> Option<u32> {
        self.lock().quality
    }

    pub fn appended_count(&self) -> u64 {
        self.lock().appended
    }

    pub fn consumed_count(&self) -> u64 {
        self.lock().consumed
    }
}

impl Default for SegmentStore {
    fn default() -> Self {
        Self::new()
    }
}
