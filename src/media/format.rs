//! Track metadata published by the demuxer and the decoders.

/// Crop rectangle in decoded-buffer coordinates (inclusive edges).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl CropRect {
    /// Crop covering the whole buffer.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            left: 0,
            top: 0,
            right: width.saturating_sub(1),
            bottom: height.saturating_sub(1),
        }
    }

    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left) + 1
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top) + 1
    }
}

/// Broad kind of a track, derived from its MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Video,
    Audio,
    Other,
}

/// Metadata describing one demuxed or decoded track.
///
/// Every field but the MIME type is optional: not every demuxer or decoder
/// publishes everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackMetadata {
    pub mime: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Bits per second.
    pub bitrate: Option<u64>,
    pub crop: Option<CropRect>,
    /// Name of the hardware decoder component, when one is in use.
    pub decoder_component: Option<String>,
    pub color_format: Option<i32>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
}

impl TrackMetadata {
    pub fn new(mime: impl Into<String>) -> Self {
        Self {
            mime: mime.into(),
            ..Default::default()
        }
    }

    pub fn kind(&self) -> TrackKind {
        let mime = self.mime.to_ascii_lowercase();
        if mime.starts_with("video/") {
            TrackKind::Video
        } else if mime.starts_with("audio/") {
            TrackKind::Audio
        } else {
            TrackKind::Other
        }
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        Some((self.width?, self.height?))
    }
}
