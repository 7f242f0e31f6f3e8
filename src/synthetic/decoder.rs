//! Decoder for synthetic tracks.

use crate::media::{
    DecoderFactory, MediaBuffer, MediaError, MediaSource, Payload, ReadOptions, ReadStatus,
    TrackKind, TrackMetadata,
};

/// Component name reported when decoding "in hardware".
pub const HARDWARE_COMPONENT: &str = "synthetic.video.decoder";

/// Color format reported by the software path.
pub const SOFTWARE_COLOR_FORMAT: i32 = 21;

/// Creates [`SyntheticDecoder`]s.
#[derive(Debug, Clone, Default)]
pub struct SyntheticDecoderFactory {
    /// Video decoders name a component and hand out buffer handles.
    pub hardware: bool,
    /// Video decoders fail to start.
    pub fail_video_start: bool,
}

impl DecoderFactory for SyntheticDecoderFactory {
    fn create(
        &self,
        format: &TrackMetadata,
        track: Box<dyn MediaSource>,
    ) -> Result<Box<dyn MediaSource>, MediaError> {
        let kind = format.kind();
        if kind == TrackKind::Other {
            return Err(MediaError::Decoder {
                mime: format.mime.clone(),
                reason: "unsupported track".to_string(),
            });
        }

        let mut output = format.clone();
        if kind == TrackKind::Video {
            if self.hardware {
                output.decoder_component = Some(HARDWARE_COMPONENT.to_string());
            } else {
                output.color_format = Some(SOFTWARE_COLOR_FORMAT);
            }
        }

        Ok(Box::new(SyntheticDecoder {
            kind,
            track,
            format: output,
            hardware: self.hardware,
            fail_start: self.fail_video_start && kind == TrackKind::Video,
            next_handle: 1,
        }))
    }
}

/// Turns encoded synthetic samples into frames and PCM.
pub struct SyntheticDecoder {
    kind: TrackKind,
    track: Box<dyn MediaSource>,
    format: TrackMetadata,
    hardware: bool,
    fail_start: bool,
    next_handle: u64,
}

impl SyntheticDecoder {
    fn decode_video(&mut self, data: Vec<u8>) -> Payload {
        if self.hardware {
            let handle = self.next_handle;
            self.next_handle += 1;
            return Payload::Hardware { handle };
        }
        let width = self.format.width.unwrap_or(0);
        let height = self.format.height.unwrap_or(0);
        let shade = data.first().copied().unwrap_or(0);
        Payload::Pixels {
            data: vec![shade; width as usize * height as usize],
            width,
            height,
            stride: width,
            color_format: SOFTWARE_COLOR_FORMAT,
        }
    }

    fn decode_audio(data: &[u8]) -> Payload {
        let count = match data {
            [a, b, c, d, ..] => u32::from_le_bytes([*a, *b, *c, *d]) as usize,
            _ => 0,
        };
        Payload::Pcm(vec![0.0; count])
    }
}

impl MediaSource for SyntheticDecoder {
    fn start(&mut self) -> Result<(), MediaError> {
        if self.fail_start {
            return Err(MediaError::Start(format!("{} refused to start", self.format.mime)));
        }
        self.track.start()
    }

    fn stop(&mut self) {
        self.track.stop();
    }

    fn read(&mut self, options: &ReadOptions) -> Result<MediaBuffer, ReadStatus> {
        let buffer = self.track.read(options)?;
        let payload = match buffer.payload {
            Payload::Encoded(data) => match self.kind {
                TrackKind::Video => self.decode_video(data),
                _ => Self::decode_audio(&data),
            },
            other => other,
        };
        Ok(MediaBuffer {
            payload,
            timestamp: buffer.timestamp,
        })
    }

    fn format(&self) -> Option<TrackMetadata> {
        Some(self.format.clone())
    }
}
