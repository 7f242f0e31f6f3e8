//! Demo driver: plays a synthetic stream through the engine.
//!
//! A scripted "application" answers segment requests, optionally switching
//! to a new continuity era part way through, while the audio clock is
//! advanced one frame per tick.

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use tracing::{debug, info, metadata::LevelFilter};
use tracing_subscriber::EnvFilter;

use hlsplay::audio::AudioOutputFactory;
use hlsplay::core::time::{self, Time};
use hlsplay::synthetic::{
    ManualOutputFactory, RecordingRenderer, RecordingSupplier, SegmentLayout,
    SyntheticDecoderFactory, SyntheticExtractorFactory,
};
use hlsplay::{MediaBackend, PlaybackEngine, PlaybackState, PlayerConfig, Segment, UpdateStatus};

const FRAMES_PER_SEGMENT: u32 = 10;
const FRAME_DURATION: Time = 33_000;
/// Where the second continuity era starts on the media timeline.
const SECOND_ERA_START: Time = 60_000_000;

#[derive(Parser, Debug)]
#[command(name = "hlsplay")]
#[command(about = "Play a synthetic adaptive stream through the playback engine")]
#[command(version)]
struct Args {
    /// Player configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Segments in the stream
    #[arg(short, long, default_value_t = 6)]
    segments: u32,

    /// Start a new continuity era after this many segments
    #[arg(short, long)]
    discontinuity_after: Option<u32>,

    /// Display ticks to run for
    #[arg(short, long, default_value_t = 300)]
    ticks: u32,

    /// Decode video "in hardware"
    #[arg(long)]
    hardware: bool,

    /// Play through the default audio device and tick in real time
    #[cfg(feature = "cpal-output")]
    #[arg(long)]
    device: bool,
}

impl Args {
    #[cfg(feature = "cpal-output")]
    fn use_device(&self) -> bool {
        self.device
    }

    #[cfg(not(feature = "cpal-output"))]
    fn use_device(&self) -> bool {
        false
    }
}

/// The scripted application side: hands out segments in order.
struct Playlist {
    total: u32,
    discontinuity_after: Option<u32>,
    next: u32,
}

impl Playlist {
    fn next_segment(&mut self) -> Option<Segment> {
        if self.next >= self.total {
            return None;
        }
        let index = self.next;
        self.next += 1;

        let segment_span = FRAMES_PER_SEGMENT as Time * FRAME_DURATION;
        let (era, start) = match self.discontinuity_after {
            Some(after) if index >= after => (1, SECOND_ERA_START + (index - after) as Time * segment_span),
            _ => (0, index as Time * segment_span),
        };
        Some(
            SegmentLayout::new(start)
                .with_frames(FRAMES_PER_SEGMENT)
                .to_segment(format!("segment-{}.ts", index), 0, era),
        )
    }
}

#[cfg(feature = "cpal-output")]
fn device_output() -> Arc<dyn AudioOutputFactory> {
    Arc::new(hlsplay::audio::CpalOutputFactory::default())
}

#[cfg(not(feature = "cpal-output"))]
fn device_output() -> Arc<dyn AudioOutputFactory> {
    Arc::new(ManualOutputFactory::new())
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => PlayerConfig::load(path)?,
        None => PlayerConfig::default(),
    };

    let manual = ManualOutputFactory::new();
    let clock = manual.probe();
    let real_time = args.use_device();
    let outputs: Arc<dyn AudioOutputFactory> = if real_time {
        device_output()
    } else {
        Arc::new(manual)
    };
    let supplier = Arc::new(RecordingSupplier::new(time::to_seconds(
        FRAMES_PER_SEGMENT as Time * FRAME_DURATION,
    )));
    let renderer = RecordingRenderer::new();
    let frames = renderer.probe();

    let backend = MediaBackend {
        extractors: Arc::new(SyntheticExtractorFactory::default()),
        decoders: Arc::new(SyntheticDecoderFactory {
            hardware: args.hardware,
            ..Default::default()
        }),
        audio_outputs: outputs,
        supplier: supplier.clone(),
        renderer: Box::new(renderer),
    };
    let mut engine = PlaybackEngine::new(config, backend)?;
    engine.set_screen_size(1280, 720);

    let mut playlist = Playlist {
        total: args.segments,
        discontinuity_after: args.discontinuity_after,
        next: 0,
    };
    for segment in std::iter::from_fn(|| playlist.next_segment()).take(2) {
        engine.feed_segment(segment);
    }

    engine.play()?;

    for tick in 0..args.ticks {
        match engine.update()? {
            UpdateStatus::FormatChanged => {
                info!(tick, "applying format change");
                engine.apply_format_change()?;
            }
            UpdateStatus::EndOfStream => {
                info!(tick, "stream finished");
                break;
            }
            UpdateStatus::Rendered(count) => debug!(tick, count, "frame rendered"),
            UpdateStatus::Working | UpdateStatus::Idle => {}
        }

        for _ in 0..supplier.take_next_requests() {
            if let Some(segment) = playlist.next_segment() {
                engine.feed_segment(segment);
            }
        }
        if real_time {
            thread::sleep(Duration::from_micros(FRAME_DURATION as u64));
        } else if engine.state() == PlaybackState::Playing {
            clock.advance(FRAME_DURATION);
        }
    }

    let stats = engine.stats();
    info!(
        rendered = stats.rendered_frames,
        skipped = stats.skipped_frames,
        presented = frames.frame_count(),
        position = %time::format_time(engine.timestamp()),
        state = %stats.state,
        "playback summary"
    );
    engine.close();
    Ok(())
}
