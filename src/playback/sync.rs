//! Audio/video synchronization.
//!
//! Audio is the master clock. Each decoded video frame is compared with the
//! audio clock and either rendered, dropped, or held for a later update.
//! Both thresholds are inclusive on the render side: a frame exactly
//! `ahead` early or exactly `behind` late is still rendered.

use tracing::warn;

use crate::config::PlayerConfig;
use crate::core::time::Time;

/// What to do with the frame under consideration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// In sync; present it.
    Render,
    /// Video is behind; drop it and read the next one.
    Skip,
    /// Video is ahead; keep it and stop reading until the next update.
    Wait,
}

/// Drift thresholds, in microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvSync {
    pub ahead_threshold: Time,
    pub behind_threshold: Time,
}

impl AvSync {
    pub fn new(ahead_threshold: Time, behind_threshold: Time) -> Self {
        Self {
            ahead_threshold,
            behind_threshold,
        }
    }

    pub fn from_config(config: &PlayerConfig) -> Self {
        Self::new(config.ahead_threshold_us, config.behind_threshold_us)
    }

    /// Decide on a frame presented at `video`, given audio clock `audio`.
    pub fn decide(&self, audio: Time, video: Time) -> SyncAction {
        let delta = audio - video;
        if delta < -self.ahead_threshold {
            SyncAction::Wait
        } else if delta > self.behind_threshold {
            SyncAction::Skip
        } else {
            SyncAction::Render
        }
    }
}

impl Default for AvSync {
    fn default() -> Self {
        Self::new(10_000, 40_000)
    }
}

/// Per-era bookkeeping of video presentation times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoTiming {
    start_offset: Time,
    segment_time_offset: Option<Time>,
    last_video_time: Option<Time>,
    frame_count: u64,
    frame_delta_total: Time,
    anomalies: u64,
    regression_tolerance: Time,
}

impl VideoTiming {
    pub fn new(regression_tolerance: Time) -> Self {
        Self {
            start_offset: 0,
            segment_time_offset: None,
            last_video_time: None,
            frame_count: 0,
            frame_delta_total: 0,
            anomalies: 0,
            regression_tolerance,
        }
    }

    /// Forget everything and anchor the next era at `start_offset`.
    pub fn reset(&mut self, start_offset: Time) {
        *self = Self {
            start_offset,
            ..Self::new(self.regression_tolerance)
        };
    }

    /// Map a raw decoder timestamp onto the era's declared timeline.
    ///
    /// The first frame after a reset fixes the offset so that it lands on
    /// the era's start; later frames reuse it.
    pub fn rebase(&mut self, raw: Time) -> Time {
        let offset = *self
            .segment_time_offset
            .get_or_insert(self.start_offset - raw);
        raw + offset
    }

    /// Record a newly decoded frame at presentation time `time`.
    pub fn observe(&mut self, time: Time) {
        self.frame_count += 1;
        if let Some(last) = self.last_video_time {
            if time > last {
                self.frame_delta_total += time - last;
            } else if time < last - self.regression_tolerance {
                self.anomalies += 1;
                warn!(
                    last_video_time = last,
                    video_time = time,
                    "video timestamp went backwards within one era"
                );
            }
        }
        self.last_video_time = Some(time);
    }

    pub fn start_offset(&self) -> Time {
        self.start_offset
    }

    /// Zero until the first frame of the era has been seen.
    pub fn segment_time_offset(&self) -> Time {
        self.segment_time_offset.unwrap_or(0)
    }

    pub fn last_video_time(&self) -> Option<Time> {
        self.last_video_time
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Sum of forward timestamp steps between consecutive frames.
    pub fn frame_delta_total(&self) -> Time {
        self.frame_delta_total
    }

    /// Mean frame spacing observed so far.
    pub fn average_frame_delta(&self) -> Option<Time> {
        (self.frame_count > 1).then(|| self.frame_delta_total / (self.frame_count as Time - 1))
    }

    pub fn anomalies(&self) -> u64 {
        self.anomalies
    }
}

impl Default for VideoTiming {
    fn default() -> Self {
        Self::new(0)
    }
}
