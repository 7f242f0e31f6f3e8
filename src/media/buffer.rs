//! Buffers exchanged with the demuxer and the decoders.

use crate::core::time::Time;

/// What a buffer carries.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Spurious empty buffer; some decoders emit these and they are skipped.
    Empty,
    /// Compressed access unit straight from the demuxer.
    Encoded(Vec<u8>),
    /// Decoded picture in the decoder's native color format.
    Pixels {
        data: Vec<u8>,
        width: u32,
        height: u32,
        stride: u32,
        color_format: i32,
    },
    /// Opaque handle of a decoder-owned hardware buffer.
    Hardware { handle: u64 },
    /// Decoded interleaved PCM.
    Pcm(Vec<f32>),
}

/// One unit read from a [`MediaSource`](crate::media::MediaSource).
#[derive(Debug, Clone, PartialEq)]
pub struct MediaBuffer {
    pub payload: Payload,
    /// Presentation timestamp (microseconds), when the producer set one.
    pub timestamp: Option<Time>,
}

impl MediaBuffer {
    pub fn new(payload: Payload, timestamp: Time) -> Self {
        Self {
            payload,
            timestamp: Some(timestamp),
        }
    }

    pub fn empty() -> Self {
        Self {
            payload: Payload::Empty,
            timestamp: None,
        }
    }

    /// Byte length of the carried range; zero for empty buffers.
    pub fn range_length(&self) -> usize {
        match &self.payload {
            Payload::Empty => 0,
            Payload::Encoded(data) => data.len(),
            Payload::Pixels { data, .. } => data.len(),
            Payload::Hardware { .. } => 1,
            Payload::Pcm(samples) => samples.len() * std::mem::size_of::<f32>(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.range_length() == 0
    }
}
