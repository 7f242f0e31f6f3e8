//! Demuxer for synthetic segments.
//!
//! One demux state is shared by every track of an extractor, the same way a
//! container demuxer reads interleaved packets: whichever track runs dry
//! first pulls the next segment from the store, and the samples of the other
//! track are queued for it.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::core::time::Time;
use crate::media::{
    Extractor, ExtractorFactory, MediaBuffer, MediaError, MediaSource, Payload, ReadOptions,
    ReadStatus, TrackKind, TrackMetadata,
};
use crate::segment::SegmentStore;
use crate::synthetic::layout::{SegmentLayout, FLAG_NO_TIMESTAMPS, FLAG_SPURIOUS_EMPTY};

pub const VIDEO_MIME: &str = "video/x-synthetic";
pub const AUDIO_MIME: &str = "audio/x-synthetic";

/// Bitrate advertised by the video track. The audio track advertises none.
pub const VIDEO_BITRATE: u64 = 800_000;

/// Opens [`SyntheticExtractor`]s.
#[derive(Debug, Clone)]
pub struct SyntheticExtractorFactory {
    pub include_video: bool,
    pub include_audio: bool,
}

impl Default for SyntheticExtractorFactory {
    fn default() -> Self {
        Self {
            include_video: true,
            include_audio: true,
        }
    }
}

impl SyntheticExtractorFactory {
    /// Audio tracks only, as an alternate-audio rendition would carry.
    pub fn audio_only() -> Self {
        Self {
            include_video: false,
            include_audio: true,
        }
    }
}

impl ExtractorFactory for SyntheticExtractorFactory {
    fn create(&self, store: Arc<SegmentStore>) -> Result<Box<dyn Extractor>, MediaError> {
        let store_id = store.id();
        let mut demux = DemuxState {
            store,
            video: VecDeque::new(),
            audio: VecDeque::new(),
            layout: None,
            closed: false,
        };
        // Probe the first segment for track formats.
        if !demux.pull() {
            return Err(MediaError::Extractor {
                store: store_id,
                reason: "no readable segment buffered".to_string(),
            });
        }
        let Some(layout) = demux.layout else {
            return Err(MediaError::Extractor {
                store: store_id,
                reason: "no layout after probe".to_string(),
            });
        };

        let mut tracks = Vec::new();
        if self.include_video {
            let mut meta = TrackMetadata::new(VIDEO_MIME);
            meta.width = Some(layout.width);
            meta.height = Some(layout.height);
            meta.bitrate = Some(VIDEO_BITRATE);
            tracks.push(meta);
        }
        if self.include_audio {
            let mut meta = TrackMetadata::new(AUDIO_MIME);
            meta.sample_rate = Some(layout.sample_rate);
            meta.channels = Some(layout.channels);
            tracks.push(meta);
        }

        debug!(store = store_id, tracks = tracks.len(), "synthetic extractor opened");
        Ok(Box::new(SyntheticExtractor {
            demux: Arc::new(Mutex::new(demux)),
            tracks,
        }))
    }
}

struct DemuxState {
    store: Arc<SegmentStore>,
    video: VecDeque<MediaBuffer>,
    audio: VecDeque<MediaBuffer>,
    layout: Option<SegmentLayout>,
    closed: bool,
}

impl DemuxState {
    /// Expand the next readable segment into both queues. Returns false
    /// once the store has nothing left.
    fn pull(&mut self) -> bool {
        loop {
            let chunk = match self.store.next_segment() {
                None => return false,
                Some(Err(e)) => {
                    warn!(error = %e, "skipping unreadable segment");
                    continue;
                }
                Some(Ok(chunk)) => chunk,
            };
            let layout = match SegmentLayout::decode(&chunk.bytes) {
                Ok(layout) => layout,
                Err(e) => {
                    warn!(uri = %chunk.uri, error = %e, "skipping malformed segment");
                    continue;
                }
            };

            for i in 0..layout.video_frames {
                if layout.flags & FLAG_SPURIOUS_EMPTY != 0 {
                    self.video.push_back(MediaBuffer::empty());
                }
                let pts = layout.base_pts + i as Time * layout.frame_duration_us as Time;
                let mut frame = MediaBuffer::new(Payload::Encoded(i.to_le_bytes().to_vec()), pts);
                if layout.flags & FLAG_NO_TIMESTAMPS != 0 {
                    frame.timestamp = None;
                }
                self.video.push_back(frame);
            }

            let step = layout.audio_buffer_duration();
            let samples = layout.audio_buffer_frames * layout.channels as u32;
            for i in 0..layout.audio_buffers {
                let pts = layout.base_pts + i as Time * step;
                self.audio
                    .push_back(MediaBuffer::new(Payload::Encoded(samples.to_le_bytes().to_vec()), pts));
            }

            debug!(uri = %chunk.uri, era = chunk.era, frames = layout.video_frames, "demuxed segment");
            self.layout.get_or_insert(layout);
            return true;
        }
    }

    fn next(&mut self, kind: TrackKind) -> Result<MediaBuffer, ReadStatus> {
        if self.closed {
            return Err(ReadStatus::EndOfStream);
        }
        loop {
            let queued = match kind {
                TrackKind::Video => self.video.pop_front(),
                _ => self.audio.pop_front(),
            };
            if let Some(buffer) = queued {
                return Ok(buffer);
            }
            if !self.pull() {
                return Err(ReadStatus::EndOfStream);
            }
        }
    }
}

fn lock(demux: &Mutex<DemuxState>) -> MutexGuard<'_, DemuxState> {
    demux.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Demuxer over one segment store.
pub struct SyntheticExtractor {
    demux: Arc<Mutex<DemuxState>>,
    tracks: Vec<TrackMetadata>,
}

impl Extractor for SyntheticExtractor {
    fn track_count(&self) -> usize {
        self.tracks.len()
    }

    fn track_metadata(&self, index: usize) -> Option<TrackMetadata> {
        self.tracks.get(index).cloned()
    }

    fn track(&mut self, index: usize) -> Result<Box<dyn MediaSource>, MediaError> {
        let meta = self
            .tracks
            .get(index)
            .cloned()
            .ok_or(MediaError::InvalidTrack(index))?;
        Ok(Box::new(SyntheticTrack {
            kind: meta.kind(),
            meta,
            demux: Arc::clone(&self.demux),
        }))
    }

    fn close(&mut self) {
        lock(&self.demux).closed = true;
    }
}

/// One demuxed track; yields encoded samples.
pub struct SyntheticTrack {
    kind: TrackKind,
    meta: TrackMetadata,
    demux: Arc<Mutex<DemuxState>>,
}

impl MediaSource for SyntheticTrack {
    fn start(&mut self) -> Result<(), MediaError> {
        Ok(())
    }

    fn stop(&mut self) {}

    fn read(&mut self, _options: &ReadOptions) -> Result<MediaBuffer, ReadStatus> {
        lock(&self.demux).next(self.kind)
    }

    fn format(&self) -> Option<TrackMetadata> {
        Some(self.meta.clone())
    }
}
