//! Segment supplier and renderer that record what the engine asks of them.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::core::time::Time;
use crate::media::{
    CropRect, MediaBuffer, Payload, RenderError, RenderPath, SegmentSupplier, TrackMetadata,
    VideoRenderer,
};
use crate::playback::BufferGeometry;

#[derive(Debug, Default)]
struct SupplierLog {
    next_requests: usize,
    time_requests: Vec<f64>,
    dimensions: Vec<(u32, u32)>,
    render_paths: Vec<RenderPath>,
}

/// Records requests; seek targets snap down to segment boundaries.
#[derive(Debug)]
pub struct RecordingSupplier {
    segment_seconds: f64,
    log: Mutex<SupplierLog>,
}

impl RecordingSupplier {
    pub fn new(segment_seconds: f64) -> Self {
        Self {
            segment_seconds,
            log: Mutex::new(SupplierLog::default()),
        }
    }

    fn log(&self) -> MutexGuard<'_, SupplierLog> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn next_requests(&self) -> usize {
        self.log().next_requests
    }

    /// Hand out and reset the count of pending next-segment requests.
    pub fn take_next_requests(&self) -> usize {
        std::mem::take(&mut self.log().next_requests)
    }

    pub fn time_requests(&self) -> Vec<f64> {
        self.log().time_requests.clone()
    }

    pub fn last_dimensions(&self) -> Option<(u32, u32)> {
        self.log().dimensions.last().copied()
    }

    pub fn render_paths(&self) -> Vec<RenderPath> {
        self.log().render_paths.clone()
    }

    /// Start of the segment covering `seconds`.
    pub fn segment_start(&self, seconds: f64) -> f64 {
        if self.segment_seconds <= 0.0 {
            return seconds;
        }
        (seconds / self.segment_seconds).floor() * self.segment_seconds
    }
}

impl SegmentSupplier for RecordingSupplier {
    fn request_next_segment(&self) {
        self.log().next_requests += 1;
    }

    fn request_segment_for_time(&self, seconds: f64) -> f64 {
        self.log().time_requests.push(seconds);
        self.segment_start(seconds)
    }

    fn video_dimensions_changed(&self, width: u32, height: u32) {
        self.log().dimensions.push((width, height));
    }

    fn render_path_selected(&self, path: RenderPath) {
        self.log().render_paths.push(path);
    }
}

#[derive(Debug, Default)]
struct RenderLog {
    frames: Vec<Option<Time>>,
    configurations: Vec<(BufferGeometry, RenderPath)>,
    reject_color_format: Option<i32>,
}

/// Shared view of what a [`RecordingRenderer`] presented.
#[derive(Debug, Clone, Default)]
pub struct RenderProbe {
    log: Arc<Mutex<RenderLog>>,
}

impl RenderProbe {
    fn log(&self) -> MutexGuard<'_, RenderLog> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Timestamps of presented frames, in order.
    pub fn frames(&self) -> Vec<Option<Time>> {
        self.log().frames.clone()
    }

    pub fn frame_count(&self) -> usize {
        self.log().frames.len()
    }

    pub fn configurations(&self) -> Vec<(BufferGeometry, RenderPath)> {
        self.log().configurations.clone()
    }
}

/// Renderer that keeps a log instead of drawing.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    probe: RenderProbe,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A renderer with no color conversion for `color_format`.
    pub fn rejecting(color_format: i32) -> Self {
        let renderer = Self::default();
        renderer.probe.log().reject_color_format = Some(color_format);
        renderer
    }

    pub fn probe(&self) -> RenderProbe {
        self.probe.clone()
    }
}

impl VideoRenderer for RecordingRenderer {
    fn configure(
        &mut self,
        geometry: BufferGeometry,
        format: &TrackMetadata,
        path: RenderPath,
    ) -> Result<(), RenderError> {
        let mut log = self.probe.log();
        if path == RenderPath::Software && format.color_format == log.reject_color_format {
            if let Some(color_format) = format.color_format {
                return Err(RenderError::UnsupportedColorFormat(color_format));
            }
        }
        log.configurations.push((geometry, path));
        Ok(())
    }

    fn render(&mut self, frame: &MediaBuffer, crop: CropRect) -> Result<(), RenderError> {
        match &frame.payload {
            Payload::Pixels { width, height, .. } if crop.right >= *width || crop.bottom >= *height => {
                return Err(RenderError::InvalidBuffer(format!(
                    "crop {:?} outside {}x{} frame",
                    crop, width, height
                )));
            }
            Payload::Pixels { .. } | Payload::Hardware { .. } => {}
            _ => {
                return Err(RenderError::InvalidBuffer(
                    "not a video frame".to_string(),
                ))
            }
        }
        self.probe.log().frames.push(frame.timestamp);
        Ok(())
    }
}
