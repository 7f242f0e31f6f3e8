//! Presentation-side collaborators: the renderer and the application that
//! supplies segments.

use thiserror::Error;

use crate::media::buffer::MediaBuffer;
use crate::media::format::{CropRect, TrackMetadata};
use crate::playback::geometry::BufferGeometry;

/// Error type for rendering operations
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no surface attached")]
    NoSurface,
    #[error("no valid color conversion for format {0}")]
    UnsupportedColorFormat(i32),
    #[error("invalid buffer: {0}")]
    InvalidBuffer(String),
}

/// How decoded frames reach the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPath {
    /// Decoder-owned buffers are presented by handle.
    Hardware,
    /// Pixels are color-converted into the surface.
    Software,
}

/// The on-screen surface.
pub trait VideoRenderer: Send {
    /// Called whenever decode sources are (re)initialized.
    fn configure(
        &mut self,
        geometry: BufferGeometry,
        format: &TrackMetadata,
        path: RenderPath,
    ) -> Result<(), RenderError>;

    /// Present one decoded frame.
    fn render(&mut self, frame: &MediaBuffer, crop: CropRect) -> Result<(), RenderError>;
}

/// The controlling application, which fetches segments and picks qualities.
pub trait SegmentSupplier: Send + Sync {
    /// Ask for the next segment. Fire-and-forget; the segment arrives later
    /// through `PlaybackEngine::feed_segment`.
    fn request_next_segment(&self);

    /// Ask for the segment covering `seconds`; returns the start time of the
    /// segment that will actually be supplied.
    fn request_segment_for_time(&self, seconds: f64) -> f64;

    fn video_dimensions_changed(&self, _width: u32, _height: u32) {}

    fn render_path_selected(&self, _path: RenderPath) {}
}
