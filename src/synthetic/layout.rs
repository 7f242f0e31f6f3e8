//! Byte layout of synthetic segments.
//!
//! A synthetic segment is a fixed little-endian header describing evenly
//! spaced video frames and audio buffers; the demuxer expands it into
//! samples. Raw timestamps start at `base_pts` and step by the frame or
//! buffer duration.

use thiserror::Error;

use crate::core::time::{self, Time};
use crate::segment::Segment;

const MAGIC: &[u8; 4] = b"HLSY";
const HEADER_LEN: usize = 4 + 4 * 7 + 2 + 1 + 8;

/// Insert an empty buffer before every video frame.
pub const FLAG_SPURIOUS_EMPTY: u8 = 0b01;
/// Emit video frames without timestamps.
pub const FLAG_NO_TIMESTAMPS: u8 = 0b10;

/// Error type for malformed synthetic segments
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("segment is {0} bytes, shorter than the header")]
    Truncated(usize),
    #[error("bad magic")]
    BadMagic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentLayout {
    pub video_frames: u32,
    pub frame_duration_us: u32,
    pub width: u32,
    pub height: u32,
    pub audio_buffers: u32,
    /// Frames (samples per channel) in each audio buffer.
    pub audio_buffer_frames: u32,
    pub sample_rate: u32,
    pub channels: u16,
    pub flags: u8,
    /// Raw timestamp of the first frame and first audio buffer.
    pub base_pts: Time,
}

impl SegmentLayout {
    /// Ten 33 ms frames of 320x240 video with matching stereo audio.
    pub fn new(base_pts: Time) -> Self {
        Self {
            video_frames: 10,
            frame_duration_us: 33_000,
            width: 320,
            height: 240,
            audio_buffers: 10,
            audio_buffer_frames: 1_584,
            sample_rate: 48_000,
            channels: 2,
            flags: 0,
            base_pts,
        }
    }

    pub fn with_frames(mut self, frames: u32) -> Self {
        self.video_frames = frames;
        self.audio_buffers = frames;
        self
    }

    pub fn with_flags(mut self, flags: u8) -> Self {
        self.flags = flags;
        self
    }

    /// Presentation span of the video frames.
    pub fn duration(&self) -> Time {
        self.video_frames as Time * self.frame_duration_us as Time
    }

    pub fn audio_buffer_duration(&self) -> Time {
        time::from_samples(self.audio_buffer_frames as u64, self.sample_rate)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN);
        out.extend_from_slice(MAGIC);
        for value in [
            self.video_frames,
            self.frame_duration_us,
            self.width,
            self.height,
            self.audio_buffers,
            self.audio_buffer_frames,
            self.sample_rate,
        ] {
            out.extend_from_slice(&value.to_le_bytes());
        }
        out.extend_from_slice(&self.channels.to_le_bytes());
        out.push(self.flags);
        out.extend_from_slice(&self.base_pts.to_le_bytes());
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, LayoutError> {
        if bytes.len() < HEADER_LEN {
            return Err(LayoutError::Truncated(bytes.len()));
        }
        if &bytes[..4] != MAGIC {
            return Err(LayoutError::BadMagic);
        }

        let u32_at = |at: usize| u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        let mut base = [0u8; 8];
        base.copy_from_slice(&bytes[35..43]);

        Ok(Self {
            video_frames: u32_at(4),
            frame_duration_us: u32_at(8),
            width: u32_at(12),
            height: u32_at(16),
            audio_buffers: u32_at(20),
            audio_buffer_frames: u32_at(24),
            sample_rate: u32_at(28),
            channels: u16::from_le_bytes([bytes[32], bytes[33]]),
            flags: bytes[34],
            base_pts: i64::from_le_bytes(base),
        })
    }

    /// Wrap the encoded layout as an in-memory segment starting at
    /// `base_pts`.
    pub fn to_segment(&self, uri: impl Into<String>, quality: u32, era: u32) -> Segment {
        Segment::from_bytes(uri, self.encode(), quality, era, time::to_seconds(self.base_pts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode() {
        let layout = SegmentLayout::new(10_000_000)
            .with_frames(3)
            .with_flags(FLAG_SPURIOUS_EMPTY);
        let bytes = layout.encode();
        assert_eq!(bytes.len(), HEADER_LEN);
        assert_eq!(SegmentLayout::decode(&bytes), Ok(layout));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert_eq!(SegmentLayout::decode(&[0u8; 3]), Err(LayoutError::Truncated(3)));
        assert_eq!(SegmentLayout::decode(&[0u8; HEADER_LEN]), Err(LayoutError::BadMagic));
    }

    #[test]
    fn test_durations() {
        let layout = SegmentLayout::new(0);
        assert_eq!(layout.duration(), 330_000);
        assert_eq!(layout.audio_buffer_duration(), 33_000);
    }

    #[test]
    fn test_to_segment() {
        let segment = SegmentLayout::new(2_500_000).to_segment("seg-1", 3, 1);
        assert_eq!(segment.start_time, 2_500_000);
        assert_eq!(segment.era, 1);
        assert_eq!(segment.quality, 3);
    }
}
