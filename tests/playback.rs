use std::sync::Arc;

use hlsplay::media::{MediaError, RenderError, RenderPath};
use hlsplay::playback::{BufferGeometry, MediaBackend, PlaybackEngine, PlaybackState, PlayerError, UpdateStatus};
use hlsplay::segment::{FeedStatus, Segment};
use hlsplay::synthetic::{
    ManualOutputFactory, OutputEvent, OutputProbe, RecordingRenderer, RecordingSupplier,
    RenderProbe, SegmentLayout, SyntheticDecoderFactory, SyntheticExtractorFactory,
    FLAG_NO_TIMESTAMPS, FLAG_SPURIOUS_EMPTY,
};
use hlsplay::PlayerConfig;

const FRAME: i64 = 33_000;

struct Harness {
    engine: PlaybackEngine,
    output: OutputProbe,
    frames: RenderProbe,
    supplier: Arc<RecordingSupplier>,
}

struct Options {
    extractors: SyntheticExtractorFactory,
    decoders: SyntheticDecoderFactory,
    outputs: ManualOutputFactory,
    renderer: RecordingRenderer,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            extractors: SyntheticExtractorFactory::default(),
            decoders: SyntheticDecoderFactory::default(),
            outputs: ManualOutputFactory::new(),
            renderer: RecordingRenderer::new(),
        }
    }
}

fn harness() -> Harness {
    harness_with(Options::default())
}

fn harness_with(options: Options) -> Harness {
    let supplier = Arc::new(RecordingSupplier::new(1.0));
    let output = options.outputs.probe();
    let frames = options.renderer.probe();
    let backend = MediaBackend {
        extractors: Arc::new(options.extractors),
        decoders: Arc::new(options.decoders),
        audio_outputs: Arc::new(options.outputs),
        supplier: supplier.clone(),
        renderer: Box::new(options.renderer),
    };
    Harness {
        engine: PlaybackEngine::new(PlayerConfig::default(), backend).unwrap(),
        output,
        frames,
        supplier,
    }
}

fn segment(start: i64, frames: u32, era: u32) -> Segment {
    SegmentLayout::new(start)
        .with_frames(frames)
        .to_segment(format!("seg-{}-{}", era, start), 0, era)
}

fn untimed_segment(start: i64, frames: u32) -> Segment {
    SegmentLayout::new(start)
        .with_frames(frames)
        .with_flags(FLAG_NO_TIMESTAMPS)
        .to_segment("untimed", 0, 0)
}

/// Three contiguous era-0 segments of ten frames each.
fn feed_era0(engine: &mut PlaybackEngine) {
    for i in 0..3 {
        assert_eq!(engine.feed_segment(segment(i * 10 * FRAME, 10, 0)), FeedStatus::Ok);
    }
}

/// Tick until `wanted` comes back.
fn run_until(h: &mut Harness, wanted: UpdateStatus) {
    for _ in 0..100 {
        if h.engine.update().unwrap() == wanted {
            return;
        }
    }
    panic!("never saw {:?}", wanted);
}

#[test]
fn test_renders_five_frames_in_sync() {
    let mut h = harness();
    feed_era0(&mut h.engine);
    h.engine.play().unwrap();
    assert_eq!(h.engine.state(), PlaybackState::Playing);

    for _ in 0..5 {
        let status = h.engine.update().unwrap();
        assert!(matches!(status, UpdateStatus::Rendered(_)), "got {:?}", status);
        h.output.advance(FRAME);
    }

    assert_eq!(h.engine.rendered_frames(), 5);
    assert_eq!(
        h.frames.frames(),
        vec![Some(0), Some(FRAME), Some(2 * FRAME), Some(3 * FRAME), Some(4 * FRAME)]
    );
    assert_eq!(h.engine.timing().frame_count(), 5);
    assert_eq!(h.engine.timing().frame_delta_total(), 4 * FRAME);
    assert_eq!(h.engine.timing().average_frame_delta(), Some(FRAME));
}

#[test]
fn test_holds_frame_while_video_ahead() {
    let mut h = harness();
    feed_era0(&mut h.engine);
    h.engine.play().unwrap();

    assert_eq!(h.engine.update().unwrap(), UpdateStatus::Rendered(1));
    // Clock has not moved, so the next frame is 33ms early.
    assert_eq!(h.engine.update().unwrap(), UpdateStatus::Working);
    assert_eq!(h.engine.update().unwrap(), UpdateStatus::Working);
    assert_eq!(h.engine.timing().frame_count(), 2);

    h.output.advance(FRAME);
    assert_eq!(h.engine.update().unwrap(), UpdateStatus::Rendered(2));
    assert_eq!(h.frames.frames(), vec![Some(0), Some(FRAME)]);
}

#[test]
fn test_skips_late_frames() {
    let mut h = harness();
    feed_era0(&mut h.engine);
    h.engine.play().unwrap();

    h.output.advance(5 * FRAME);
    assert_eq!(h.engine.update().unwrap(), UpdateStatus::Rendered(1));
    assert_eq!(h.frames.frames(), vec![Some(4 * FRAME)]);
    assert_eq!(h.engine.stats().skipped_frames, 4);
}

#[test]
fn test_format_change_on_discontinuity() {
    let mut h = harness();
    assert_eq!(h.engine.feed_segment(segment(0, 3, 0)), FeedStatus::Ok);
    assert_eq!(h.engine.feed_segment(segment(3 * FRAME, 3, 0)), FeedStatus::Ok);
    assert_eq!(
        h.engine.feed_segment(segment(10_000_000, 3, 1)),
        FeedStatus::Discontinuity
    );
    assert_eq!(h.engine.sources().cache().len(), 1);

    h.engine.play().unwrap();
    h.output.advance(1_000_000_000);
    run_until(&mut h, UpdateStatus::FormatChanged);
    assert_eq!(h.engine.state(), PlaybackState::FormatChanging);
    assert_eq!(h.engine.rendered_frames(), 0);

    // Signalled once; further ticks just wait for the caller.
    assert_eq!(h.engine.update().unwrap(), UpdateStatus::Working);
    assert_eq!(h.engine.update().unwrap(), UpdateStatus::Working);

    h.engine.apply_format_change().unwrap();
    assert_eq!(h.engine.state(), PlaybackState::Playing);
    assert_eq!(h.engine.timing().frame_count(), 0);
    assert_eq!(h.engine.timing().frame_delta_total(), 0);
    assert_eq!(h.engine.start_time_offset(), 10_000_000);
    assert_eq!(h.engine.sources().cache().len(), 0);
    assert_eq!(h.engine.sources().active().unwrap().era(), Some(1));

    assert!(h.output.wait_for(&OutputEvent::Play, 2));
    assert_eq!(h.engine.timestamp(), 10_000_000);
    assert_eq!(h.engine.update().unwrap(), UpdateStatus::Rendered(1));
    assert_eq!(h.frames.frames(), vec![Some(10_000_000)]);
    assert_eq!(h.engine.timing().segment_time_offset(), 0);
}

#[test]
fn test_apply_format_change_requires_pending_era() {
    let mut h = harness();
    feed_era0(&mut h.engine);
    h.engine.play().unwrap();
    let err = h.engine.apply_format_change().unwrap_err();
    assert!(matches!(
        err,
        PlayerError::InvalidState {
            state: PlaybackState::Playing,
            ..
        }
    ));
    assert_eq!(h.engine.state(), PlaybackState::Playing);
}

#[test]
fn test_end_of_stream_stops() {
    let mut h = harness();
    h.engine.feed_segment(segment(0, 3, 0));
    h.engine.play().unwrap();
    h.output.advance(1_000_000_000);

    run_until(&mut h, UpdateStatus::EndOfStream);
    assert_eq!(h.engine.state(), PlaybackState::Stopped);
    assert!(h.output.wait_for(&OutputEvent::Stop, 1));
    assert_eq!(h.engine.update().unwrap(), UpdateStatus::Idle);
}

#[test]
fn test_seek_after_end_of_stream_restarts_audio() {
    let mut h = harness();
    h.engine.feed_segment(segment(0, 3, 0));
    h.engine.play().unwrap();
    h.output.advance(1_000_000_000);
    run_until(&mut h, UpdateStatus::EndOfStream);

    // The final stop is queued, so the old thread cannot be reused.
    assert!(!h.engine.audio().unwrap().is_running());

    h.engine.seek(0.0).unwrap();
    assert_eq!(h.engine.state(), PlaybackState::Seeking);
    h.engine.feed_segment(segment(0, 10, 0));
    h.engine.update().unwrap();
    assert_eq!(h.engine.state(), PlaybackState::Playing);

    let audio = h.engine.audio().unwrap();
    assert!(audio.is_running());
    assert_eq!(h.output.count(&OutputEvent::Created(audio.format())), 2);
    assert!(h.output.wait_for(&OutputEvent::Play, 2));
    assert!(h.engine.audio().unwrap().is_running());

    assert!(matches!(h.engine.update().unwrap(), UpdateStatus::Rendered(_)));
    assert_eq!(h.frames.frames().last(), Some(&Some(0)));
}

#[test]
fn test_seek_clamps_negative_time() {
    let mut h = harness();
    feed_era0(&mut h.engine);
    h.engine.play().unwrap();

    h.engine.seek(-5.0).unwrap();
    assert_eq!(h.supplier.time_requests(), vec![0.0]);
    assert_eq!(h.engine.start_time_offset(), 0);
    assert_eq!(h.engine.state(), PlaybackState::Seeking);
}

#[test]
fn test_seek_from_playing() {
    let mut h = harness();
    feed_era0(&mut h.engine);
    h.engine.play().unwrap();
    h.engine.update().unwrap();

    h.engine.seek(5.5).unwrap();
    assert_eq!(h.supplier.time_requests(), vec![5.5]);
    assert_eq!(h.engine.start_time_offset(), 5_000_000);
    assert_eq!(h.engine.sources().total_preloaded(), 0);

    // Nothing buffered yet.
    assert_eq!(h.engine.update().unwrap(), UpdateStatus::Working);
    assert_eq!(h.engine.state(), PlaybackState::Seeking);

    h.engine.feed_segment(segment(5_000_000, 10, 0));
    assert_eq!(h.engine.update().unwrap(), UpdateStatus::Working);
    assert_eq!(h.engine.state(), PlaybackState::Playing);

    assert!(h.output.wait_for(&OutputEvent::Play, 2));
    let audio = h.engine.audio().unwrap();
    assert!(audio.is_running());
    assert_eq!(h.output.count(&OutputEvent::Created(audio.format())), 1);
    assert_eq!(h.engine.update().unwrap(), UpdateStatus::Rendered(2));
    assert_eq!(h.frames.frames().last(), Some(&Some(5_000_000)));
}

#[test]
fn test_seek_from_paused() {
    let mut h = harness();
    feed_era0(&mut h.engine);
    h.engine.play().unwrap();
    h.engine.pause();
    assert_eq!(h.engine.state(), PlaybackState::Paused);

    h.engine.seek(2.0).unwrap();
    h.engine.feed_segment(segment(2_000_000, 10, 0));
    h.engine.update().unwrap();
    assert_eq!(h.engine.state(), PlaybackState::Playing);
}

#[test]
fn test_seek_from_format_changing() {
    let mut h = harness();
    h.engine.feed_segment(segment(0, 3, 0));
    h.engine.feed_segment(segment(10_000_000, 3, 1));
    h.engine.play().unwrap();
    h.output.advance(1_000_000_000);
    run_until(&mut h, UpdateStatus::FormatChanged);

    h.engine.seek(1.0).unwrap();
    // Queued eras are dropped along with the active store's data.
    assert_eq!(h.engine.sources().cache().len(), 0);

    h.engine.feed_segment(segment(1_000_000, 10, 0));
    h.engine.update().unwrap();
    assert_eq!(h.engine.state(), PlaybackState::Playing);
    assert_eq!(h.engine.start_time_offset(), 1_000_000);
}

#[test]
fn test_seek_while_stopped_rejected() {
    let mut h = harness();
    feed_era0(&mut h.engine);
    let err = h.engine.seek(1.0).unwrap_err();
    assert!(matches!(err, PlayerError::InvalidState { .. }));
    assert_eq!(h.engine.state(), PlaybackState::Stopped);
    assert!(h.supplier.time_requests().is_empty());
}

#[test]
fn test_stop_commands_audio_stop() {
    let mut h = harness();
    feed_era0(&mut h.engine);
    h.engine.play().unwrap();
    h.engine.update().unwrap();

    h.engine.stop();
    assert_eq!(h.engine.state(), PlaybackState::Stopped);
    assert!(h.output.wait_for(&OutputEvent::Stop, 1));
    assert_eq!(h.engine.update().unwrap(), UpdateStatus::Idle);
}

#[test]
fn test_play_after_stop_replaces_pipeline() {
    let mut h = harness();
    feed_era0(&mut h.engine);
    h.engine.play().unwrap();
    h.engine.update().unwrap();
    h.engine.stop();

    h.engine.feed_segment(segment(30 * FRAME, 10, 0));
    h.engine.play().unwrap();
    assert_eq!(h.engine.state(), PlaybackState::Playing);
    let audio = h.engine.audio().unwrap();
    assert!(audio.is_running());
    assert_eq!(h.output.count(&OutputEvent::Created(audio.format())), 2);
    assert!(h.output.wait_for(&OutputEvent::Play, 2));
}

#[test]
fn test_failed_restart_keeps_previous_pipeline() {
    let mut h = harness_with(Options {
        outputs: ManualOutputFactory::failing_after(1),
        ..Options::default()
    });
    feed_era0(&mut h.engine);
    h.engine.play().unwrap();
    h.engine.update().unwrap();
    h.engine.stop();

    h.engine.feed_segment(segment(30 * FRAME, 10, 0));
    assert!(matches!(h.engine.play(), Err(PlayerError::Audio(_))));
    assert_eq!(h.engine.state(), PlaybackState::Stopped);
    assert!(h.engine.audio().is_some());
    assert!(h.engine.stats().has_audio_pipeline);
    assert_eq!(h.engine.update().unwrap(), UpdateStatus::Idle);
}

#[test]
fn test_pause_and_resume() {
    let mut h = harness();
    feed_era0(&mut h.engine);
    h.engine.play().unwrap();

    h.engine.toggle_pause();
    assert_eq!(h.engine.state(), PlaybackState::Paused);
    assert_eq!(h.engine.update().unwrap(), UpdateStatus::Idle);
    assert!(h.output.wait_for(&OutputEvent::Pause, 1));

    // Play while paused resumes rather than reinitializing.
    h.engine.play().unwrap();
    assert_eq!(h.engine.state(), PlaybackState::Playing);
    assert!(h.output.wait_for(&OutputEvent::Play, 2));
    assert_eq!(h.output.count(&OutputEvent::Created(h.engine.audio().unwrap().format())), 1);
}

#[test]
fn test_reset_is_idempotent() {
    let mut h = harness();
    feed_era0(&mut h.engine);
    h.engine.feed_segment(segment(10_000_000, 3, 1));
    h.engine.play().unwrap();
    h.engine.update().unwrap();

    h.engine.reset();
    let first = h.engine.stats();
    h.engine.reset();
    let second = h.engine.stats();

    assert_eq!(first, second);
    assert_eq!(first.state, PlaybackState::Stopped);
    assert_eq!(first.rendered_frames, 0);
    assert_eq!(first.decoded_frames, 0);
    assert_eq!(first.preloaded_segments, 0);
    assert_eq!(first.cached_stores, 0);
    assert!(!first.has_audio_pipeline);
    assert!(h.engine.sources().active().is_none());
}

#[test]
fn test_engine_reusable_after_reset() {
    let mut h = harness();
    h.engine.feed_segment(untimed_segment(0, 3));
    h.engine.play().unwrap();
    assert!(h.engine.update().is_err());

    h.engine.reset();
    feed_era0(&mut h.engine);
    h.engine.play().unwrap();
    assert_eq!(h.engine.update().unwrap(), UpdateStatus::Rendered(1));
}

#[test]
fn test_rejects_invalid_config() {
    let backend = MediaBackend {
        extractors: Arc::new(SyntheticExtractorFactory::default()),
        decoders: Arc::new(SyntheticDecoderFactory::default()),
        audio_outputs: Arc::new(ManualOutputFactory::new()),
        supplier: Arc::new(RecordingSupplier::new(1.0)),
        renderer: Box::new(RecordingRenderer::new()),
    };
    let config = PlayerConfig {
        preload_threshold: 0,
        ..PlayerConfig::default()
    };
    let result = PlaybackEngine::new(config, backend);
    assert!(matches!(result, Err(PlayerError::Config(_))));
}

#[test]
fn test_play_without_segments() {
    let mut h = harness();
    assert!(matches!(h.engine.play(), Err(PlayerError::NoSegments)));
    assert_eq!(h.engine.state(), PlaybackState::Stopped);
}

#[test]
fn test_missing_audio_track() {
    let mut h = harness_with(Options {
        extractors: SyntheticExtractorFactory {
            include_video: true,
            include_audio: false,
        },
        ..Options::default()
    });
    feed_era0(&mut h.engine);
    assert!(matches!(h.engine.play(), Err(PlayerError::MissingTrack("audio"))));
    assert_eq!(h.engine.state(), PlaybackState::Stopped);
    assert!(h.engine.audio().is_none());
}

#[test]
fn test_missing_video_track() {
    let mut h = harness_with(Options {
        extractors: SyntheticExtractorFactory::audio_only(),
        ..Options::default()
    });
    feed_era0(&mut h.engine);
    assert!(matches!(h.engine.play(), Err(PlayerError::MissingTrack("video"))));
}

#[test]
fn test_video_decoder_start_failure() {
    let mut h = harness_with(Options {
        decoders: SyntheticDecoderFactory {
            fail_video_start: true,
            ..Default::default()
        },
        ..Options::default()
    });
    feed_era0(&mut h.engine);
    let err = h.engine.play().unwrap_err();
    assert!(matches!(err, PlayerError::Media(MediaError::Start(_))));
    assert_eq!(h.engine.state(), PlaybackState::Stopped);
    assert!(h.engine.audio().is_none());
    assert!(h.output.events().is_empty());
}

#[test]
fn test_audio_output_unavailable() {
    let mut h = harness_with(Options {
        outputs: ManualOutputFactory::failing(),
        ..Options::default()
    });
    feed_era0(&mut h.engine);
    assert!(matches!(h.engine.play(), Err(PlayerError::Audio(_))));
    assert_eq!(h.engine.state(), PlaybackState::Stopped);
}

#[test]
fn test_no_color_conversion() {
    let mut h = harness_with(Options {
        renderer: RecordingRenderer::rejecting(21),
        ..Options::default()
    });
    feed_era0(&mut h.engine);
    let err = h.engine.play().unwrap_err();
    assert!(matches!(
        err,
        PlayerError::Render(RenderError::UnsupportedColorFormat(21))
    ));
    assert_eq!(h.engine.state(), PlaybackState::Stopped);
}

#[test]
fn test_missing_timestamp_is_fatal() {
    let mut h = harness();
    h.engine.feed_segment(untimed_segment(0, 3));
    h.engine.play().unwrap();

    assert!(matches!(h.engine.update(), Err(PlayerError::MissingTimestamp)));
    assert_eq!(h.engine.state(), PlaybackState::Stopped);
    assert!(h.output.wait_for(&OutputEvent::Stop, 1));
}

#[test]
fn test_spurious_empty_buffers_skipped() {
    let mut h = harness();
    let layout = SegmentLayout::new(0).with_flags(FLAG_SPURIOUS_EMPTY);
    h.engine.feed_segment(layout.to_segment("empties", 0, 0));
    h.engine.play().unwrap();

    assert_eq!(h.engine.update().unwrap(), UpdateStatus::Rendered(1));
    assert_eq!(h.frames.frames(), vec![Some(0)]);
}

#[test]
fn test_requests_segments_below_preload_threshold() {
    let mut h = harness();
    h.engine.feed_segment(segment(0, 10, 0));
    h.engine.play().unwrap();
    h.engine.update().unwrap();
    assert!(h.supplier.next_requests() >= 1);
}

#[test]
fn test_software_render_path() {
    let mut h = harness();
    feed_era0(&mut h.engine);
    h.engine.play().unwrap();

    assert_eq!(h.engine.render_path(), Some(RenderPath::Software));
    assert_eq!(h.supplier.render_paths(), vec![RenderPath::Software]);
    assert_eq!(h.engine.video_dimensions(), Some((320, 240)));
    assert_eq!(h.supplier.last_dimensions(), Some((320, 240)));
    assert_eq!(h.engine.bitrate(), Some(800_000));
    assert_eq!(h.engine.video_format().unwrap().color_format, Some(21));
}

#[test]
fn test_hardware_render_path() {
    let mut h = harness_with(Options {
        decoders: SyntheticDecoderFactory {
            hardware: true,
            ..Default::default()
        },
        ..Options::default()
    });
    feed_era0(&mut h.engine);
    h.engine.play().unwrap();
    assert_eq!(h.engine.render_path(), Some(RenderPath::Hardware));
    assert_eq!(h.engine.update().unwrap(), UpdateStatus::Rendered(1));
}

#[test]
fn test_screen_size_reconfigures_renderer() {
    let mut h = harness();
    h.engine.set_screen_size(1920, 1080);
    feed_era0(&mut h.engine);
    h.engine.play().unwrap();

    let expected = BufferGeometry::fit_to_screen(320, 240, 1920, 1080);
    assert_eq!(h.engine.buffer_geometry(), expected);
    assert_eq!(h.frames.configurations(), vec![(expected, RenderPath::Software)]);

    h.engine.set_screen_size(480, 640);
    let rotated = BufferGeometry::fit_to_screen(320, 240, 480, 640);
    assert_eq!(h.frames.configurations().last(), Some(&(rotated, RenderPath::Software)));
}

#[test]
fn test_alternate_audio_rendition() {
    let mut h = harness();
    feed_era0(&mut h.engine);
    h.engine.feed_alternate_audio_segment(segment(0, 10, 0));
    assert!(h.engine.has_alternate_audio());

    h.engine.play().unwrap();
    assert_eq!(h.engine.update().unwrap(), UpdateStatus::Rendered(1));

    h.engine.clear_alternate_audio().unwrap();
    assert!(!h.engine.has_alternate_audio());
    assert_eq!(h.engine.state(), PlaybackState::Seeking);
    assert_eq!(h.supplier.time_requests().len(), 1);
}

#[test]
fn test_file_backed_segments() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("seg0.bin");
    std::fs::write(&path, SegmentLayout::new(0).encode()).unwrap();

    let mut h = harness();
    assert_eq!(h.engine.feed_segment(Segment::from_file(&path, 0, 0, 0.0)), FeedStatus::Ok);
    h.engine.play().unwrap();
    assert_eq!(h.engine.update().unwrap(), UpdateStatus::Rendered(1));
}
