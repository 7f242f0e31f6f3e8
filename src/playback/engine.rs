//! Main playback engine: the player state machine.
//!
//! The engine is driven from one control thread. The host feeds segments,
//! calls [`PlaybackEngine::play`], then calls [`PlaybackEngine::update`] once
//! per display tick. Each update pulls video frames from the decoder and
//! syncs them against the audio clock published by the audio thread.
//!
//! All mutation goes through `&mut self`; a host that drives the engine from
//! several threads wraps it in a `Mutex`. Nothing here blocks on the audio
//! thread except [`AudioPipeline::start`] during startup and the final join
//! on reset.

use std::sync::Arc;

use tracing::{debug, error, info, trace, warn};

use crate::audio::{AudioError, AudioFormat, AudioOutputFactory, AudioPipeline, TargetState};
use crate::config::{ConfigError, PlayerConfig};
use crate::core::time::{self, Time};
use crate::media::{
    CropRect, DecoderFactory, Extractor, ExtractorFactory, MediaBuffer, MediaError, MediaSource,
    ReadOptions, ReadStatus, RenderError, RenderPath, SegmentSupplier, TrackKind, TrackMetadata,
    VideoRenderer,
};
use crate::playback::geometry::BufferGeometry;
use crate::playback::state::PlaybackState;
use crate::playback::sync::{AvSync, SyncAction, VideoTiming};
use crate::segment::{AppendOutcome, DataSources, FeedStatus, Segment, SegmentStore};

/// Error type for playback engine
#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    #[error("no segments have been fed")]
    NoSegments,
    #[error("no {0} track found")]
    MissingTrack(&'static str),
    #[error("decoder returned a frame without a timestamp")]
    MissingTimestamp,
    #[error("video decoder failed: {0}")]
    Decoder(String),
    #[error("cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: PlaybackState,
    },
    #[error("media error: {0}")]
    Media(#[from] MediaError),
    #[error("audio error: {0}")]
    Audio(#[from] AudioError),
    #[error("render error: {0}")]
    Render(#[from] RenderError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Outcome of one [`PlaybackEngine::update`] tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStatus {
    /// Nothing was presented this tick; playback continues.
    Working,
    /// A frame was presented. Carries the frames rendered this session.
    Rendered(u64),
    /// The active era is exhausted and the next one is queued. Call
    /// [`PlaybackEngine::apply_format_change`].
    FormatChanged,
    /// The last era ran out; the engine is now stopped.
    EndOfStream,
    /// Stopped or paused; nothing to do.
    Idle,
}

/// External collaborators the engine drives.
pub struct MediaBackend {
    pub extractors: Arc<dyn ExtractorFactory>,
    pub decoders: Arc<dyn DecoderFactory>,
    pub audio_outputs: Arc<dyn AudioOutputFactory>,
    pub supplier: Arc<dyn SegmentSupplier>,
    pub renderer: Box<dyn VideoRenderer>,
}

/// Observable counters, for hosts and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackStats {
    pub state: PlaybackState,
    pub rendered_frames: u64,
    pub skipped_frames: u64,
    pub decoded_frames: u64,
    pub frame_delta_total: Time,
    pub timestamp_anomalies: u64,
    pub start_time_offset: Time,
    pub preloaded_segments: usize,
    pub cached_stores: usize,
    pub has_audio_pipeline: bool,
}

/// Decoders and demuxers opened over the active store.
struct DecodeSession {
    extractor: Box<dyn Extractor>,
    alternate_extractor: Option<Box<dyn Extractor>>,
    video: Box<dyn MediaSource>,
    video_format: TrackMetadata,
    dimensions: (u32, u32),
    crop: CropRect,
    bitrate: u64,
    render_path: RenderPath,
    /// Frame held back because video ran ahead of audio, with its
    /// presentation time.
    pending_frame: Option<(MediaBuffer, Time)>,
}

impl DecodeSession {
    fn close(mut self) {
        self.pending_frame = None;
        self.video.stop();
        self.extractor.close();
        if let Some(mut alternate) = self.alternate_extractor.take() {
            alternate.close();
        }
    }
}

/// Main playback engine
pub struct PlaybackEngine {
    config: PlayerConfig,
    sync: AvSync,
    backend: MediaBackend,
    state: PlaybackState,
    sources: DataSources,
    alternate_audio: Option<Arc<SegmentStore>>,
    session: Option<DecodeSession>,
    audio: Option<AudioPipeline>,
    timing: VideoTiming,
    start_time_offset: Time,
    rendered_frames: u64,
    skipped_frames: u64,
    screen_size: (u32, u32),
}

impl PlaybackEngine {
    /// Create a new playback engine. Rejects a config that fails
    /// [`PlayerConfig::validate`].
    pub fn new(config: PlayerConfig, backend: MediaBackend) -> Result<Self, PlayerError> {
        config.validate()?;
        Ok(Self {
            sync: AvSync::from_config(&config),
            timing: VideoTiming::new(config.timestamp_regression_tolerance_us),
            config,
            backend,
            state: PlaybackState::Stopped,
            sources: DataSources::new(),
            alternate_audio: None,
            session: None,
            audio: None,
            start_time_offset: 0,
            rendered_frames: 0,
            skipped_frames: 0,
            screen_size: (0, 0),
        })
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state != state {
            info!(from = %self.state, to = %state, "playback state changed");
            self.state = state;
        }
    }

    /// Hand a fetched segment to the engine.
    pub fn feed_segment(&mut self, segment: Segment) -> FeedStatus {
        debug!(uri = %segment.uri, era = segment.era, quality = segment.quality, "feeding segment");
        self.sources.feed(segment)
    }

    /// Hand a segment of the alternate audio rendition to the engine. Takes
    /// effect the next time decode sources are initialized.
    pub fn feed_alternate_audio_segment(&mut self, segment: Segment) {
        let store = self
            .alternate_audio
            .get_or_insert_with(|| Arc::new(SegmentStore::new()));
        match store.append(segment) {
            AppendOutcome::Appended => {}
            AppendOutcome::Provisional(err) => {
                warn!(error = %err, "alternate audio append failed, provisionally continuing");
            }
            AppendOutcome::Discontinuity(segment) => {
                info!(era = segment.era, "alternate audio moved to a new era, replacing its store");
                let fresh = Arc::new(SegmentStore::new());
                if let AppendOutcome::Provisional(err) = fresh.append(segment) {
                    warn!(error = %err, "alternate audio append failed, provisionally continuing");
                }
                self.alternate_audio = Some(fresh);
            }
        }
    }

    /// Drop the alternate audio rendition and flush decoders with a seek
    /// to the current position.
    pub fn clear_alternate_audio(&mut self) -> Result<(), PlayerError> {
        if self.alternate_audio.take().is_none() {
            return Ok(());
        }
        info!("alternate audio cleared");
        if self.state.can_seek() {
            let now = time::to_seconds(self.timestamp());
            self.seek(now)?;
        }
        Ok(())
    }

    pub fn has_alternate_audio(&self) -> bool {
        self.alternate_audio.is_some()
    }

    /// Initialize decode sources against the active store and start playback.
    ///
    /// Fails without changing state if a track is missing, a decoder cannot
    /// start, or the audio thread cannot open its output. A previous
    /// pipeline is kept until its replacement has started.
    pub fn play(&mut self) -> Result<(), PlayerError> {
        match self.state {
            PlaybackState::Playing => return Ok(()),
            PlaybackState::Paused => {
                self.resume();
                return Ok(());
            }
            PlaybackState::Seeking | PlaybackState::FormatChanging => {
                return Err(PlayerError::InvalidState {
                    operation: "play",
                    state: self.state,
                })
            }
            PlaybackState::Stopped => {}
        }

        let store = self.sources.active().cloned().ok_or(PlayerError::NoSegments)?;
        let start = store.start_time().unwrap_or(0);
        let (session, audio_source, audio_format) = self.open_session(&store)?;
        let session = self.start_session(session)?;

        // A pipeline already told to finish is joined before its successor
        // opens the device. Any other is only replaced once the new one runs.
        if let Some(previous) = self.audio.as_mut().filter(|audio| audio.is_finishing()) {
            previous.shutdown();
        }
        let pipeline = match AudioPipeline::start(
            Arc::clone(&self.backend.audio_outputs),
            audio_format,
            audio_source,
            &self.config,
        ) {
            Ok(pipeline) => pipeline,
            Err(e) => {
                error!(error = %e, "failed to start audio pipeline");
                session.close();
                return Err(e.into());
            }
        };
        pipeline.set_timestamp_offset(start);
        if let Err(e) = pipeline.push_target_state(TargetState::Play) {
            session.close();
            return Err(e.into());
        }

        self.start_time_offset = start;
        self.timing.reset(start);
        self.session = Some(session);
        if let Some(mut previous) = self.audio.replace(pipeline) {
            previous.shutdown();
        }
        self.set_state(PlaybackState::Playing);
        Ok(())
    }

    /// Run one tick of the state machine.
    pub fn update(&mut self) -> Result<UpdateStatus, PlayerError> {
        match self.state {
            PlaybackState::FormatChanging => return Ok(UpdateStatus::Working),
            PlaybackState::Stopped | PlaybackState::Paused => return Ok(UpdateStatus::Idle),
            PlaybackState::Seeking => return self.update_seeking(),
            PlaybackState::Playing => {}
        }

        let preloaded = self.sources.total_preloaded();
        if preloaded < self.config.preload_threshold {
            trace!(preloaded, "requesting next segment");
            self.backend.supplier.request_next_segment();
        }

        match self.pump_video() {
            Ok(status) => Ok(status),
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Bounded read loop against the video decoder.
    fn pump_video(&mut self) -> Result<UpdateStatus, PlayerError> {
        for _ in 0..self.config.max_reads_per_update {
            let Some(session) = self.session.as_mut() else {
                return Err(PlayerError::InvalidState {
                    operation: "update without decode sources",
                    state: self.state,
                });
            };

            let (frame, video_time) = match session.pending_frame.take() {
                Some(pending) => pending,
                None => match session.video.read(&ReadOptions::default()) {
                    Ok(buffer) if buffer.is_empty() => {
                        trace!("released empty decoder buffer");
                        continue;
                    }
                    Ok(buffer) => {
                        let raw = buffer.timestamp.ok_or(PlayerError::MissingTimestamp)?;
                        let video_time = self.timing.rebase(raw);
                        self.timing.observe(video_time);
                        (buffer, video_time)
                    }
                    Err(ReadStatus::EndOfStream) => return Ok(self.end_of_stream()),
                    Err(ReadStatus::Error(reason)) => return Err(PlayerError::Decoder(reason)),
                    Err(status) => {
                        debug!(?status, "video decoder status without buffer");
                        return Ok(UpdateStatus::Working);
                    }
                },
            };

            let audio_time = self
                .audio
                .as_ref()
                .map_or(self.start_time_offset, |audio| audio.timestamp());
            match self.sync.decide(audio_time, video_time) {
                SyncAction::Wait => {
                    trace!(audio_time, video_time, "video ahead of audio, holding frame");
                    session.pending_frame = Some((frame, video_time));
                    return Ok(UpdateStatus::Working);
                }
                SyncAction::Skip => {
                    self.skipped_frames += 1;
                    debug!(audio_time, video_time, "video behind audio, dropping frame");
                }
                SyncAction::Render => {
                    self.backend.renderer.render(&frame, session.crop)?;
                    self.rendered_frames += 1;
                    trace!(audio_time, video_time, rendered = self.rendered_frames, "rendered frame");
                    return Ok(UpdateStatus::Rendered(self.rendered_frames));
                }
            }
        }
        Ok(UpdateStatus::Working)
    }

    fn end_of_stream(&mut self) -> UpdateStatus {
        if self.sources.has_pending_eras() {
            info!(
                cached = self.sources.cache().len(),
                "continuity era exhausted, next era queued"
            );
            self.set_state(PlaybackState::FormatChanging);
            UpdateStatus::FormatChanged
        } else {
            info!("end of stream");
            self.teardown();
            self.stop_audio();
            self.set_state(PlaybackState::Stopped);
            UpdateStatus::EndOfStream
        }
    }

    fn update_seeking(&mut self) -> Result<UpdateStatus, PlayerError> {
        let Some(store) = self.sources.active().cloned() else {
            return Ok(UpdateStatus::Working);
        };
        if store.preloaded_segment_count() == 0 {
            return Ok(UpdateStatus::Working);
        }

        if let Err(e) = self.resume_session(&store) {
            return Err(self.fail(e));
        }
        info!(start = %time::format_time(self.start_time_offset), "seek complete");
        self.set_state(PlaybackState::Playing);
        Ok(UpdateStatus::Working)
    }

    /// Switch to the next queued continuity era.
    ///
    /// Decode sources are torn down and rebuilt over the promoted store; the
    /// cache and the audio thread survive.
    pub fn apply_format_change(&mut self) -> Result<(), PlayerError> {
        if self.state != PlaybackState::FormatChanging {
            return Err(PlayerError::InvalidState {
                operation: "apply a format change",
                state: self.state,
            });
        }

        self.teardown();
        let Some(store) = self.sources.promote_next() else {
            return Err(self.fail(PlayerError::NoSegments));
        };
        self.start_time_offset = store.start_time().unwrap_or(0);
        self.timing.reset(self.start_time_offset);

        if let Err(e) = self.resume_session(&store) {
            return Err(self.fail(e));
        }
        info!(
            store = store.id(),
            era = ?store.era(),
            start = %time::format_time(self.start_time_offset),
            "format change applied"
        );
        self.set_state(PlaybackState::Playing);
        Ok(())
    }

    /// Jump to `seconds`, clamped at zero.
    ///
    /// Playback resumes from the segment the supplier picks once it has been
    /// fed.
    pub fn seek(&mut self, seconds: f64) -> Result<(), PlayerError> {
        let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
        if self.state == PlaybackState::Stopped && self.audio.is_none() {
            return Err(PlayerError::InvalidState {
                operation: "seek",
                state: self.state,
            });
        }

        info!(requested = seconds, from = %self.state, "seeking");
        self.set_state(PlaybackState::Seeking);
        self.teardown();
        if let Some(store) = self.sources.active() {
            store.clear_sources();
        }
        self.sources.clear_pending();

        let achieved = self.backend.supplier.request_segment_for_time(seconds);
        self.start_time_offset = time::from_seconds(achieved.max(0.0));
        self.timing.reset(self.start_time_offset);
        if let Some(audio) = &self.audio {
            audio.rebase_clock(self.start_time_offset);
        }
        debug!(requested = seconds, achieved, "segment for seek requested");
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.state != PlaybackState::Playing {
            return;
        }
        self.push_audio(TargetState::Pause);
        self.set_state(PlaybackState::Paused);
    }

    pub fn resume(&mut self) {
        if self.state != PlaybackState::Paused {
            return;
        }
        self.push_audio(TargetState::Play);
        self.set_state(PlaybackState::Playing);
    }

    pub fn toggle_pause(&mut self) {
        match self.state {
            PlaybackState::Playing => self.pause(),
            PlaybackState::Paused => self.resume(),
            _ => debug!(state = %self.state, "toggle pause ignored"),
        }
    }

    /// Stop playback, ending the audio thread. Segments stay buffered.
    pub fn stop(&mut self) {
        if !matches!(self.state, PlaybackState::Playing | PlaybackState::Paused) {
            debug!(state = %self.state, "stop ignored");
            return;
        }
        self.teardown();
        self.stop_audio();
        self.set_state(PlaybackState::Stopped);
    }

    /// Tear everything down: decoders, stores, cache, audio thread and
    /// counters. Safe to call from any state, any number of times.
    pub fn reset(&mut self) {
        self.teardown();
        if let Some(mut audio) = self.audio.take() {
            audio.shutdown();
        }
        self.sources.reset();
        self.alternate_audio = None;
        self.start_time_offset = 0;
        self.timing.reset(0);
        self.rendered_frames = 0;
        self.skipped_frames = 0;
        self.set_state(PlaybackState::Stopped);
        debug!("engine reset");
    }

    pub fn close(&mut self) {
        self.reset();
        info!("engine closed");
    }

    /// Master clock reading, or the start offset when no audio runs.
    pub fn timestamp(&self) -> Time {
        self.audio
            .as_ref()
            .map_or(self.start_time_offset, |audio| audio.timestamp())
    }

    pub fn start_time_offset(&self) -> Time {
        self.start_time_offset
    }

    pub fn timing(&self) -> &VideoTiming {
        &self.timing
    }

    pub fn rendered_frames(&self) -> u64 {
        self.rendered_frames
    }

    pub fn audio(&self) -> Option<&AudioPipeline> {
        self.audio.as_ref()
    }

    pub fn sources(&self) -> &DataSources {
        &self.sources
    }

    /// Summed bitrate of the tracks that publish one, in bits per second.
    pub fn bitrate(&self) -> Option<u64> {
        self.session.as_ref().map(|s| s.bitrate)
    }

    pub fn video_dimensions(&self) -> Option<(u32, u32)> {
        self.session.as_ref().map(|s| s.dimensions)
    }

    pub fn video_format(&self) -> Option<&TrackMetadata> {
        self.session.as_ref().map(|s| &s.video_format)
    }

    pub fn render_path(&self) -> Option<RenderPath> {
        self.session.as_ref().map(|s| s.render_path)
    }

    pub fn stats(&self) -> PlaybackStats {
        PlaybackStats {
            state: self.state,
            rendered_frames: self.rendered_frames,
            skipped_frames: self.skipped_frames,
            decoded_frames: self.timing.frame_count(),
            frame_delta_total: self.timing.frame_delta_total(),
            timestamp_anomalies: self.timing.anomalies(),
            start_time_offset: self.start_time_offset,
            preloaded_segments: self.sources.total_preloaded(),
            cached_stores: self.sources.cache().len(),
            has_audio_pipeline: self.audio.is_some(),
        }
    }

    pub fn set_screen_size(&mut self, width: u32, height: u32) {
        self.screen_size = (width, height);
        info!(width, height, "screen size set");

        let Some(session) = &self.session else {
            return;
        };
        let geometry = self.buffer_geometry();
        if let Err(e) =
            self.backend
                .renderer
                .configure(geometry, &session.video_format, session.render_path)
        {
            warn!(error = %e, "renderer rejected new geometry");
        }
    }

    /// Surface buffer size for the current video and screen.
    pub fn buffer_geometry(&self) -> BufferGeometry {
        let (width, height) = self.video_dimensions().unwrap_or((0, 0));
        BufferGeometry::fit_to_screen(width, height, self.screen_size.0, self.screen_size.1)
    }

    /// Resolve tracks and create decoders over `store`.
    fn open_session(
        &self,
        store: &Arc<SegmentStore>,
    ) -> Result<(DecodeSession, Box<dyn MediaSource>, AudioFormat), PlayerError> {
        let mut extractor = self.backend.extractors.create(Arc::clone(store))?;

        let mut bitrate = 0u64;
        let mut video = None;
        let mut audio = None;
        for index in 0..extractor.track_count() {
            let Some(meta) = extractor.track_metadata(index) else {
                continue;
            };
            match meta.bitrate {
                Some(bps) => bitrate += bps,
                None => debug!(track = index, mime = %meta.mime, "track does not publish bitrate"),
            }
            match meta.kind() {
                TrackKind::Video if video.is_none() => video = Some((index, meta)),
                TrackKind::Audio if audio.is_none() => audio = Some((index, meta)),
                _ => {}
            }
        }

        let (video_index, video_meta) = video.ok_or(PlayerError::MissingTrack("video"))?;

        let mut alternate_extractor = None;
        let (audio_track, audio_meta) = match &self.alternate_audio {
            Some(alternate) => {
                let mut alt = self.backend.extractors.create(Arc::clone(alternate))?;
                let found = (0..alt.track_count()).find_map(|index| {
                    alt.track_metadata(index)
                        .filter(|meta| meta.kind() == TrackKind::Audio)
                        .map(|meta| (index, meta))
                });
                let (index, meta) = found.ok_or(PlayerError::MissingTrack("alternate audio"))?;
                let track = alt.track(index)?;
                alternate_extractor = Some(alt);
                (track, meta)
            }
            None => {
                let (index, meta) = audio.ok_or(PlayerError::MissingTrack("audio"))?;
                (extractor.track(index)?, meta)
            }
        };

        let video_track = extractor.track(video_index)?;
        let video_source = self.backend.decoders.create(&video_meta, video_track)?;
        let decoded = video_source.format().unwrap_or_else(|| video_meta.clone());

        let dimensions = decoded
            .dimensions()
            .or_else(|| video_meta.dimensions())
            .unwrap_or((0, 0));
        let crop = decoded
            .crop
            .or(video_meta.crop)
            .unwrap_or_else(|| CropRect::full(dimensions.0, dimensions.1));
        let render_path = if decoded.decoder_component.is_some() {
            RenderPath::Hardware
        } else {
            RenderPath::Software
        };

        let audio_source = self.backend.decoders.create(&audio_meta, audio_track)?;
        let audio_format = AudioFormat::from_metadata(&audio_source.format().unwrap_or(audio_meta))?;

        info!(
            width = dimensions.0,
            height = dimensions.1,
            bitrate,
            ?render_path,
            sample_rate = audio_format.sample_rate,
            channels = audio_format.channels,
            alternate_audio = alternate_extractor.is_some(),
            "decode sources initialized"
        );

        let session = DecodeSession {
            extractor,
            alternate_extractor,
            video: video_source,
            video_format: decoded,
            dimensions,
            crop,
            bitrate,
            render_path,
            pending_frame: None,
        };
        Ok((session, audio_source, audio_format))
    }

    /// Start the video decoder and point the renderer and supplier at it.
    fn start_session(&mut self, mut session: DecodeSession) -> Result<DecodeSession, PlayerError> {
        if let Err(e) = session.video.start() {
            error!(error = %e, "video decoder failed to start");
            session.close();
            return Err(e.into());
        }

        let (width, height) = session.dimensions;
        self.backend.supplier.video_dimensions_changed(width, height);
        self.backend.supplier.render_path_selected(session.render_path);

        let geometry = BufferGeometry::fit_to_screen(width, height, self.screen_size.0, self.screen_size.1);
        if let Err(e) =
            self.backend
                .renderer
                .configure(geometry, &session.video_format, session.render_path)
        {
            session.close();
            return Err(e.into());
        }
        Ok(session)
    }

    /// Rebuild decode sources over `store` and hand the new audio source to
    /// the audio thread, restarting the thread if it has exited.
    fn resume_session(&mut self, store: &Arc<SegmentStore>) -> Result<(), PlayerError> {
        let (session, audio_source, audio_format) = self.open_session(store)?;
        let session = self.start_session(session)?;
        let offset = self.start_time_offset;

        let reusable = self
            .audio
            .as_ref()
            .map_or(false, |audio| audio.is_running() && audio.format() == audio_format);
        if reusable {
            if let Some(audio) = &self.audio {
                audio.rebase_clock(offset);
                let pushed = audio
                    .push_target_state(TargetState::Flush)
                    .and_then(|()| {
                        audio.push_target_state(TargetState::SetSource {
                            source: audio_source,
                            already_started: false,
                        })
                    })
                    .and_then(|()| audio.push_target_state(TargetState::Play));
                if let Err(e) = pushed {
                    session.close();
                    return Err(e.into());
                }
            }
        } else {
            if let Some(mut previous) = self.audio.take() {
                previous.shutdown();
            }
            let pipeline = match AudioPipeline::start(
                Arc::clone(&self.backend.audio_outputs),
                audio_format,
                audio_source,
                &self.config,
            ) {
                Ok(pipeline) => pipeline,
                Err(e) => {
                    session.close();
                    return Err(e.into());
                }
            };
            pipeline.set_timestamp_offset(offset);
            if let Err(e) = pipeline.push_target_state(TargetState::Play) {
                session.close();
                return Err(e.into());
            }
            self.audio = Some(pipeline);
        }

        self.session = Some(session);
        Ok(())
    }

    /// Close decode sources and detach the audio thread from them. The
    /// audio thread itself, the stores and the cache survive.
    fn teardown(&mut self) {
        if let Some(session) = self.session.take() {
            session.close();
            debug!("decode sources closed");
        }
        if self.audio.as_ref().map_or(false, AudioPipeline::is_running) {
            self.push_audio(TargetState::Stop { seeking: true });
            self.push_audio(TargetState::ClearSource);
        }
        self.timing.reset(self.start_time_offset);
    }

    fn stop_audio(&mut self) {
        if self.audio.is_some() {
            self.push_audio(TargetState::Stop { seeking: false });
        }
    }

    fn push_audio(&self, state: TargetState) {
        let Some(audio) = &self.audio else {
            return;
        };
        if let Err(e) = audio.push_target_state(state) {
            warn!(error = %e, "audio thread did not accept target state");
        }
    }

    /// Fatal to the session: stop everything and hand the error back.
    fn fail(&mut self, err: PlayerError) -> PlayerError {
        error!(error = %err, state = %self.state, "playback failed, stopping");
        self.teardown();
        self.stop_audio();
        self.set_state(PlaybackState::Stopped);
        err
    }
}
