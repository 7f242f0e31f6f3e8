//! Fitting decoded-buffer dimensions to the screen's aspect ratio.

/// Dimensions of the surface buffer frames are rendered into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufferGeometry {
    pub width: u32,
    pub height: u32,
}

impl BufferGeometry {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Stretch a decoded buffer to the screen's aspect ratio.
    ///
    /// When the buffer is portrait its width is recomputed from its height;
    /// otherwise its height is recomputed from its width. Results are
    /// truncated. An unknown screen (either side zero) leaves the buffer
    /// as decoded.
    ///
    /// | buffer  | screen    | result  |
    /// |---------|-----------|---------|
    /// | 480x256 | 320x240   | 480x360 |
    /// | 480x256 | 240x320   | 480x640 |
    /// | 256x480 | 1920x1080 | 853x480 |
    /// | 256x480 | 1080x1920 | 270x480 |
    pub fn fit_to_screen(buffer_width: u32, buffer_height: u32, screen_width: u32, screen_height: u32) -> Self {
        if screen_width == 0 || screen_height == 0 || buffer_width == 0 || buffer_height == 0 {
            return Self::new(buffer_width, buffer_height);
        }

        let screen_aspect = screen_width as f64 / screen_height as f64;
        if buffer_width < buffer_height {
            Self::new((buffer_height as f64 * screen_aspect) as u32, buffer_height)
        } else {
            Self::new(buffer_width, (buffer_width as f64 / screen_aspect) as u32)
        }
    }
}
