//! Decoded PCM waiting to be written to the output.

use crate::core::time::{self, Time};

/// One decoded audio buffer, partially consumed by the output.
///
/// Outputs may accept fewer samples than offered; the remainder stays here
/// and is offered again on the next loop iteration.
#[derive(Debug, Clone)]
pub struct PcmBuffer {
    data: Vec<f32>, // Interleaved samples (L, R, L, R, ...)
    channels: u16,
    sample_rate: u32,
    cursor: usize,
    pub timestamp: Time, // Timestamp of the first sample
}

impl PcmBuffer {
    pub fn new(data: Vec<f32>, channels: u16, sample_rate: u32, timestamp: Time) -> Self {
        Self {
            data,
            channels: channels.max(1),
            sample_rate,
            cursor: 0,
            timestamp,
        }
    }

    /// Samples not yet accepted by the output.
    pub fn remaining(&self) -> &[f32] {
        &self.data[self.cursor..]
    }

    /// Mark `count` samples as written.
    pub fn advance(&mut self, count: usize) {
        self.cursor = (self.cursor + count).min(self.data.len());
    }

    pub fn is_drained(&self) -> bool {
        self.cursor >= self.data.len()
    }

    /// Frames (samples per channel) left to write.
    pub fn remaining_frames(&self) -> usize {
        self.remaining().len() / self.channels as usize
    }

    /// Playback duration of the unwritten remainder.
    pub fn remaining_duration(&self) -> Time {
        time::from_samples(self.remaining_frames() as u64, self.sample_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_writes() {
        let mut buf = PcmBuffer::new(vec![0.0; 8], 2, 48_000, 0);
        assert_eq!(buf.remaining().len(), 8);
        assert_eq!(buf.remaining_frames(), 4);

        buf.advance(6);
        assert_eq!(buf.remaining().len(), 2);
        assert!(!buf.is_drained());

        buf.advance(10);
        assert!(buf.is_drained());
        assert!(buf.remaining().is_empty());
    }

    #[test]
    fn test_remaining_duration() {
        let buf = PcmBuffer::new(vec![0.0; 2 * 48_000], 2, 48_000, 0);
        assert_eq!(buf.remaining_duration(), time::constants::MICROS_PER_SECOND);
    }
}
