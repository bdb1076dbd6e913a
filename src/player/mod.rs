//! Media player core
//!
//! [`MediaPlayer`] owns one receiver session at a time. A driver opens a
//! stream, then calls the two ticks on its own schedules while the audio
//! sampler polls audio on a third context:
//!
//! ```text
//!   driver ──open(url)──► MediaPlayer ──connect──► Transport ──► Receiver
//!                              │
//!     tick_audio_and_metadata ─┤  state machine, metadata ──► BinarySink
//!     tick_video ──────────────┤  video frames ─────────────► TextureSink
//!     AudioSampler ────────────┘  audio frames ─────────────► AudioSink
//! ```
//!
//! All session state sits behind one mutex. Ticks hold it for their whole
//! body so that `close` from another thread is serialized against in-flight
//! dispatch. Captures never block (zero timeout by default). Events are
//! broadcast after the lock is released.

pub mod config;
pub mod events;
pub mod metadata;
pub mod options;
pub mod sampler;
pub mod session;
pub mod state;
pub mod tracks;

use std::ops::RangeInclusive;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use bytes::Bytes;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::media::{audio, video};
use crate::sink::{self, AudioSink, BinarySink, Dimensions, TextureSink, TextureSinkFormat, TextureSinkMode};
use crate::stats::PlayerStats;
use crate::transport::source::strip_scheme;
use crate::transport::{
    AudioFrame, Bandwidth, ColorFormat, Frame, FrameKind, ReceiverHandle, ReceiverSettings,
    SourceDescriptor, Timecode, Transport, VideoFrame,
};

pub use config::PlayerConfig;
pub use events::{EventListeners, ListenerId, MediaEvent};
pub use options::{
    FrameFormatPreference, MediaOptions, MediaSource, OptionValue, SourceBandwidth,
    SourceColorFormat,
};
pub use sampler::AudioSampler;
pub use session::{AudioFormat, Session, VideoFormat};
pub use state::MediaState;
pub use tracks::TrackType;

/// Name reported by [`MediaPlayer::name`]
pub const PLAYER_NAME: &str = "NdiMedia";

/// State shared with the audio sampler callback
struct PlayerShared {
    config: PlayerConfig,
    transport: Arc<dyn Transport>,
    session: Mutex<Session>,
    events: EventListeners,
    sampler: Arc<AudioSampler>,
    sampler_task: Mutex<Option<JoinHandle<()>>>,
}

impl PlayerShared {
    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Point the sampler at the session's receiver if audio should flow
    fn update_audio_sampler(&self, session: &Session) {
        self.sampler.set_receiver(session.sampler_receiver());
    }

    /// Sampler callback
    fn on_sampled_audio(&self, source: &ReceiverHandle, frame: &AudioFrame) {
        let mut session = self.lock();
        if session.receiver.as_ref() != Some(source) {
            tracing::trace!("Ignoring audio frame from a stale receiver");
            return;
        }
        self.process_audio_frame(&mut session, frame);
    }

    fn process_audio_frame(&self, session: &mut Session, frame: &AudioFrame) {
        if !session.is_open() {
            return;
        }

        session.audio_format = AudioFormat {
            channels: frame.channels,
            sample_rate: frame.sample_rate,
        };

        let Some(sink) = session.audio_sink.clone() else {
            return;
        };

        if sink.audio_sink_channels() != frame.channels
            || sink.audio_sink_sample_rate() != frame.sample_rate
        {
            tracing::debug!(
                channels = frame.channels,
                sample_rate = frame.sample_rate,
                "Re-initializing audio sink"
            );
            if !sink.initialize_audio_sink(frame.channels, frame.sample_rate) {
                let err = Error::SinkReinitFailed("audio");
                tracing::debug!(error = %err, "Dropping audio frame");
                session.counters.sink_reinit_failures += 1;
                return;
            }
        }

        let pcm = match audio::to_pcm_bytes(frame, audio::REFERENCE_LEVEL_DB) {
            Ok(pcm) => pcm,
            Err(e) => {
                tracing::debug!(error = %e, "Dropping audio frame");
                session.counters.conversion_failures += 1;
                return;
            }
        };

        sink.play_audio_sink(&pcm, frame.timecode);
        session.counters.samples_received += frame.samples as u64 * frame.channels as u64;
        session.counters.audio_frames_played += 1;
    }
}

/// Player for one network stream at a time
pub struct MediaPlayer {
    shared: Arc<PlayerShared>,
}

impl MediaPlayer {
    /// Create a closed player that connects through `transport`
    pub fn new(config: PlayerConfig, transport: Arc<dyn Transport>) -> Self {
        let shared = Arc::new_cyclic(|weak: &Weak<PlayerShared>| {
            let sampler = Arc::new(AudioSampler::new(config.poll_timeout_duration()));

            let player = weak.clone();
            sampler.on_samples(move |source, frame| {
                if let Some(player) = player.upgrade() {
                    player.on_sampled_audio(source, frame);
                }
            });

            PlayerShared {
                config,
                transport,
                session: Mutex::new(Session::new()),
                events: EventListeners::new(),
                sampler,
                sampler_task: Mutex::new(None),
            }
        });

        Self { shared }
    }

    /// Player configuration
    pub fn config(&self) -> &PlayerConfig {
        &self.shared.config
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.shared.lock()
    }

    fn broadcast(&self, events: &[MediaEvent]) {
        for event in events {
            self.shared.events.broadcast(*event);
        }
    }

    /// Open an `ndi://` URL
    ///
    /// Any open stream is closed first. On success the state stays
    /// [`MediaState::Closed`] until the next audio/metadata tick.
    pub fn open(&self, url: &str, options: &MediaOptions) -> Result<()> {
        self.close();

        let config = &self.shared.config;
        let source_str = strip_scheme(url)?;
        let computer_name = config.resolve_computer_name();
        let source = SourceDescriptor::parse(source_str, &config.local_host_token, &computer_name);

        let (color_format, sink_format) = negotiate_color_format(options, &source);
        let bandwidth = negotiate_bandwidth(options, &source);

        let mut settings = ReceiverSettings::new(source.clone())
            .color(color_format)
            .bandwidth(bandwidth)
            .allow_video_fields(true);
        if !config.receiver_name.is_empty() {
            settings = settings.name(config.receiver_name.clone());
        }

        {
            let mut session = self.lock();

            let receiver = match self.shared.transport.connect(&settings) {
                Ok(receiver) => ReceiverHandle::new(receiver),
                Err(reason) => {
                    tracing::error!(
                        source = %source,
                        error = %reason,
                        "Failed to open media source: couldn't create receiver"
                    );
                    return Err(Error::ConnectionFailed {
                        source_name: source.to_string(),
                        reason,
                    });
                }
            };

            send_metadata(&receiver, &metadata::product_identification(config));
            if let Some(format) = metadata::format_preference(options) {
                send_metadata(&receiver, &format);
            }
            if let Some(custom) = metadata::custom_metadata(config) {
                send_metadata(&receiver, custom);
            }

            session.receiver = Some(receiver);
            session.url = url.to_string();
            session.source = Some(source.clone());
            session.sink_format = sink_format;
            session.counters.reset();
            self.shared.update_audio_sampler(&session);
        }

        tracing::info!(
            url = %url,
            source = %source,
            endpoint = source.is_endpoint(),
            color_format = ?color_format,
            bandwidth = ?bandwidth,
            "Media opened"
        );

        self.broadcast(&[MediaEvent::TracksChanged, MediaEvent::MediaOpened]);
        Ok(())
    }

    /// Open a typed media source
    pub fn open_source(&self, source: &MediaSource) -> Result<()> {
        source.validate()?;
        self.open(&source.url(), &source.options())
    }

    /// Opening from an in-memory archive is not supported
    pub fn open_archive(&self, _archive: Bytes, _url: &str, _options: &MediaOptions) -> Result<()> {
        Err(Error::Unsupported("opening from an archive"))
    }

    /// Close the open stream
    ///
    /// Does nothing (and emits nothing) when no stream is open.
    pub fn close(&self) {
        let closed = {
            let mut session = self.lock();
            let receiver = session.close();
            self.shared.update_audio_sampler(&session);
            receiver
        };

        if closed.is_none() {
            return;
        }
        drop(closed);

        tracing::info!("Media closed");
        self.broadcast(&[MediaEvent::TracksChanged, MediaEvent::MediaClosed]);
    }

    /// Update playback state and deliver pending metadata
    pub fn tick_audio_and_metadata(&self, _delta: Duration) {
        let mut event = None;

        {
            let mut session = self.lock();
            let Some(receiver) = session.receiver.clone() else {
                return;
            };

            let target = state::target_state(session.paused, receiver.is_connected());
            let gated = self.shared.config.gate_state_on_audio_sink && session.audio_sink.is_none();

            if target != session.state && !gated {
                tracing::debug!(from = %session.state, to = %target, "Playback state changed");
                session.state = target;
                self.shared.update_audio_sampler(&session);

                if target == MediaState::Playing {
                    event = Some(MediaEvent::PlaybackResumed);
                    if let Some(sink) = &session.audio_sink {
                        sink.resume_audio_sink();
                    }
                } else {
                    event = Some(MediaEvent::PlaybackSuspended);
                    if let Some(sink) = &session.audio_sink {
                        sink.pause_audio_sink();
                        sink.flush_audio_sink();
                    }
                }
            }

            if let Some(sink) = session.metadata_sink.clone() {
                self.capture_metadata_frame(&mut session, &receiver, sink.as_ref());
            }
        }

        if let Some(event) = event {
            self.broadcast(&[event]);
        }
    }

    fn capture_metadata_frame(&self, session: &mut Session, receiver: &ReceiverHandle, sink: &dyn BinarySink) {
        let lease = match receiver.capture(FrameKind::Metadata, self.shared.config.poll_timeout_duration()) {
            Ok(lease) => lease,
            Err(e) => {
                tracing::debug!(error = %e, "Failed to receive metadata frame");
                return;
            }
        };

        if let Frame::Metadata(frame) = lease.frame() {
            sink.process_binary_sink_data(&frame.data, frame.timecode, Duration::ZERO);
            session.counters.metadata_frames_processed += 1;
        }
    }

    /// Deliver one pending video frame
    pub fn tick_video(&self, _delta: Duration) {
        let mut session = self.lock();
        if session.paused {
            return;
        }
        let Some(receiver) = session.receiver.clone() else {
            return;
        };

        let lease = match receiver.capture(FrameKind::Video, self.shared.config.poll_timeout_duration()) {
            Ok(lease) => lease,
            Err(e) => {
                tracing::debug!(error = %e, "Failed to receive video frame");
                return;
            }
        };

        if let Frame::Video(frame) = lease.frame() {
            process_video_frame(&mut session, frame);
        }
    }

    /// Feed an audio frame through the audio path of the open session
    ///
    /// Frames delivered while closed are ignored.
    pub fn handle_audio_frame(&self, frame: &AudioFrame) {
        let mut session = self.lock();
        self.shared.process_audio_frame(&mut session, frame);
    }

    /// Attach, replace or detach the audio sink
    pub fn set_audio_sink(&self, sink: Option<Arc<dyn AudioSink>>) {
        let mut session = self.lock();
        if sink::same_ref(session.audio_sink.as_ref(), sink.as_ref()) {
            return;
        }

        if let Some(old) = session.audio_sink.take() {
            old.shutdown_audio_sink();
        }
        if let Some(new) = &sink {
            let format = session.audio_format;
            if !new.initialize_audio_sink(format.channels, format.sample_rate) {
                tracing::warn!(
                    channels = format.channels,
                    sample_rate = format.sample_rate,
                    "Audio sink rejected the current format"
                );
            }
        }

        session.audio_sink = sink;
        self.shared.update_audio_sampler(&session);
    }

    /// Attach, replace or detach the texture sink
    pub fn set_video_sink(&self, sink: Option<Arc<dyn TextureSink>>) {
        let mut session = self.lock();
        if sink::same_ref(session.video_sink.as_ref(), sink.as_ref()) {
            return;
        }

        if let Some(old) = session.video_sink.take() {
            old.shutdown_texture_sink();
        }
        session.video_sink = sink.clone();

        if let Some(new) = sink {
            let format = session.video_format;
            if !new.initialize_texture_sink(
                format.dimensions,
                format.buffer_dimensions,
                session.sink_format,
                TextureSinkMode::Unbuffered,
            ) {
                tracing::warn!(dimensions = %format.dimensions, "Texture sink rejected the current format");
            }
        }
    }

    /// Attach, replace or detach the metadata sink
    pub fn set_metadata_sink(&self, sink: Option<Arc<dyn BinarySink>>) {
        let mut session = self.lock();
        if sink::same_ref(session.metadata_sink.as_ref(), sink.as_ref()) {
            return;
        }

        if let Some(old) = session.metadata_sink.take() {
            old.shutdown_binary_sink();
        }
        if let Some(new) = &sink {
            if !new.initialize_binary_sink() {
                tracing::warn!("Metadata sink failed to initialize");
            }
        }
        session.metadata_sink = sink;
    }

    /// Current playback rate: 1.0 while playing and not paused, else 0.0
    pub fn rate(&self) -> f32 {
        let session = self.lock();
        if !session.paused && session.state == MediaState::Playing {
            1.0
        } else {
            0.0
        }
    }

    /// Pause with 0.0, resume with 1.0
    ///
    /// [`rate`](Self::rate) reflects a pause immediately; the state follows on
    /// the next audio/metadata tick.
    pub fn set_rate(&self, rate: f32) -> Result<()> {
        let paused = if rate == 0.0 {
            true
        } else if rate == 1.0 {
            false
        } else {
            return Err(Error::Unsupported("playback rate other than 0.0 or 1.0"));
        };

        let mut session = self.lock();
        session.paused = paused;
        self.shared.update_audio_sampler(&session);
        Ok(())
    }

    pub fn supports_rate(&self, rate: f32) -> bool {
        rate == 1.0
    }

    pub fn supported_rates(&self) -> RangeInclusive<f32> {
        1.0..=1.0
    }

    pub fn seek(&self, _time: Duration) -> Result<()> {
        Err(Error::Unsupported("seeking"))
    }

    pub fn set_looping(&self, _looping: bool) -> Result<()> {
        Err(Error::Unsupported("looping"))
    }

    pub fn is_looping(&self) -> bool {
        false
    }

    pub fn supports_seeking(&self) -> bool {
        false
    }

    pub fn supports_scrubbing(&self) -> bool {
        false
    }

    /// Live streams have no duration
    pub fn duration(&self) -> Duration {
        Duration::ZERO
    }

    pub fn time(&self) -> Duration {
        Duration::ZERO
    }

    pub fn state(&self) -> MediaState {
        self.lock().state
    }

    pub fn name(&self) -> &'static str {
        PLAYER_NAME
    }

    /// URL of the open stream, empty when closed
    pub fn url(&self) -> String {
        self.lock().url.clone()
    }

    /// Human readable summary of the open stream, empty when closed
    pub fn info(&self) -> String {
        let session = self.lock();
        let Some(source) = &session.source else {
            return String::new();
        };

        let kind = if source.is_endpoint() { "endpoint" } else { "name" };
        let audio = session.audio_format;
        let video = session.video_format;

        format!(
            "Url: {}\nSource: {} ({})\nState: {}\nAudio: {} channels, {} Hz\nVideo: {} ({}), buffer {}, {:.2} fps\n",
            session.url,
            source,
            kind,
            session.state,
            audio.channels,
            audio.sample_rate,
            video.dimensions,
            session.sink_format.name(),
            video.buffer_dimensions,
            video.frame_rate,
        )
    }

    /// Receiver and session counters, `None` when closed
    pub fn stats(&self) -> Option<PlayerStats> {
        let session = self.lock();
        let receiver = session.receiver.as_ref()?;
        let performance = receiver.performance();

        Some(PlayerStats {
            total: performance.total,
            dropped: performance.dropped,
            queued: receiver.queue_depth(),
            session: session.counters,
        })
    }

    /// Register an event listener
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(MediaEvent) + Send + Sync + 'static,
    {
        self.shared.events.subscribe(listener)
    }

    /// Remove an event listener
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.shared.events.unsubscribe(id)
    }

    /// Recompute the audio sampler association
    pub fn update_audio_sampler(&self) {
        let session = self.lock();
        self.shared.update_audio_sampler(&session);
    }

    /// Check whether the audio sampler is associated with a receiver
    pub fn is_sampling_audio(&self) -> bool {
        self.shared.sampler.is_associated()
    }

    /// Poll and deliver one audio frame on the calling thread
    pub fn sample_audio(&self) -> bool {
        self.shared.sampler.sample_once()
    }

    /// Start background audio sampling on the current tokio runtime
    ///
    /// Replaces a previously spawned sampler task.
    pub fn spawn_audio_sampler(&self) {
        let config = &self.shared.config;
        let task = self
            .shared
            .sampler
            .spawn(config.sampler_interval_duration(), config.max_audio_frames_per_tick);

        let previous = self
            .shared
            .sampler_task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(task);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    pub fn num_tracks(&self, track_type: TrackType) -> usize {
        self.lock().num_tracks(track_type)
    }

    /// Selected track, `Some(0)` for every supported type while open
    pub fn selected_track(&self, track_type: TrackType) -> Option<usize> {
        self.lock().selected_track(track_type)
    }

    /// Track selection as last set through [`select_track`](Self::select_track)
    pub fn track_selection(&self, track_type: TrackType) -> Option<usize> {
        self.lock().track_selection(track_type)
    }

    /// Select track 0 or deselect with `None`
    pub fn select_track(&self, track_type: TrackType, index: Option<usize>) -> Result<()> {
        let mut session = self.lock();
        session.select_track(track_type, index)?;
        if track_type == TrackType::Audio {
            self.shared.update_audio_sampler(&session);
        }
        Ok(())
    }

    pub fn track_display_name(&self, track_type: TrackType, index: usize) -> &'static str {
        self.lock().track_display_name(track_type, index)
    }

    pub fn track_language(&self, track_type: TrackType, index: usize) -> &'static str {
        self.lock().track_language(track_type, index)
    }

    pub fn track_name(&self, _track_type: TrackType, _index: usize) -> &'static str {
        ""
    }

    pub fn audio_track_channels(&self, index: usize) -> u32 {
        self.lock().audio_track_channels(index)
    }

    pub fn audio_track_sample_rate(&self, index: usize) -> u32 {
        self.lock().audio_track_sample_rate(index)
    }

    pub fn video_track_dimensions(&self, index: usize) -> Dimensions {
        self.lock().video_track_dimensions(index)
    }

    pub fn video_track_frame_rate(&self, index: usize) -> f32 {
        self.lock().video_track_frame_rate(index)
    }

    pub fn video_track_bit_rate(&self, _index: usize) -> u32 {
        0
    }
}

impl Drop for MediaPlayer {
    fn drop(&mut self) {
        self.close();
        self.shared.sampler.unbind();

        let task = self
            .shared
            .sampler_task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(task) = task {
            task.abort();
        }
    }
}

impl std::fmt::Debug for MediaPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaPlayer")
            .field("session", &*self.lock())
            .field("sampler", &self.shared.sampler)
            .finish()
    }
}

fn send_metadata(receiver: &ReceiverHandle, message: &str) {
    if let Err(e) = receiver.send_metadata(message, Timecode::ZERO) {
        tracing::warn!(error = %e, "Connection metadata was rejected");
    }
}

/// Receive color format and matching sink format for the open options
fn negotiate_color_format(options: &MediaOptions, source: &SourceDescriptor) -> (ColorFormat, TextureSinkFormat) {
    let fallback = (ColorFormat::UyvyBgra, TextureSinkFormat::CharUyvy);
    if !options.has(options::COLOR_FORMAT) {
        return fallback;
    }

    let negotiated = options
        .try_get_int(options::COLOR_FORMAT)
        .and_then(ColorFormat::from_code)
        .and_then(|color| video::sink_format_for(color).map(|sink| (color, sink)));

    negotiated.unwrap_or_else(|| {
        tracing::warn!(
            source = %source,
            color_format = %options.get_str(options::COLOR_FORMAT, ""),
            "Unsupported color format option, falling back to UYVY"
        );
        fallback
    })
}

fn negotiate_bandwidth(options: &MediaOptions, source: &SourceDescriptor) -> Bandwidth {
    if !options.has(options::BANDWIDTH) {
        return Bandwidth::Highest;
    }

    options
        .try_get_int(options::BANDWIDTH)
        .and_then(Bandwidth::from_code)
        .unwrap_or_else(|| {
            tracing::warn!(
                source = %source,
                bandwidth = %options.get_str(options::BANDWIDTH, ""),
                "Unsupported bandwidth option, falling back to highest"
            );
            Bandwidth::Highest
        })
}

fn process_video_frame(session: &mut Session, frame: &VideoFrame) {
    let layout = video::texture_layout(frame, session.sink_format);
    session.video_format = VideoFormat {
        dimensions: layout.dimensions,
        buffer_dimensions: layout.buffer_dimensions,
        frame_rate: frame.frame_rate(),
    };

    let Some(sink) = session.video_sink.clone() else {
        return;
    };

    if !video::is_complete(frame) {
        tracing::debug!(
            dimensions = %layout.dimensions,
            stride = frame.line_stride,
            bytes = frame.data.len(),
            "Dropping incomplete video frame"
        );
        session.counters.conversion_failures += 1;
        return;
    }

    if sink.texture_sink_format() != layout.format || sink.texture_sink_dimensions() != layout.dimensions {
        tracing::debug!(
            dimensions = %layout.dimensions,
            buffer = %layout.buffer_dimensions,
            format = layout.format.name(),
            "Re-initializing texture sink"
        );
        if !sink.initialize_texture_sink(
            layout.dimensions,
            layout.buffer_dimensions,
            layout.format,
            TextureSinkMode::Unbuffered,
        ) {
            let err = Error::SinkReinitFailed("texture");
            tracing::debug!(error = %err, "Dropping video frame");
            session.counters.sink_reinit_failures += 1;
            return;
        }
    }

    sink.update_texture_sink_buffer(&frame.data, frame.line_stride);
    sink.display_texture_sink_buffer(frame.timecode);
    session.counters.video_frames_displayed += 1;
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::testing::{RecordingAudioSink, RecordingBinarySink, RecordingTextureSink, TextureCall};
    use crate::transport::{FourCc, FrameFormat, MemorySource, MemoryTransport, MetadataFrame};

    fn setup(config: PlayerConfig) -> (MediaPlayer, MemoryTransport) {
        let transport = MemoryTransport::new();
        let player = MediaPlayer::new(config.computer_name("STUDIO"), Arc::new(transport.clone()));
        (player, transport)
    }

    fn record_events(player: &MediaPlayer) -> Arc<Mutex<Vec<MediaEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let log = events.clone();
        player.subscribe(move |event| log.lock().unwrap().push(event));
        events
    }

    fn take(events: &Mutex<Vec<MediaEvent>>) -> Vec<MediaEvent> {
        std::mem::take(&mut *events.lock().unwrap())
    }

    fn video(fourcc: FourCc, xres: u32, yres: u32, timecode: i64) -> VideoFrame {
        let stride = xres * fourcc.bytes_per_pixel();
        VideoFrame {
            xres,
            yres,
            fourcc,
            frame_rate_n: 30000,
            frame_rate_d: 1001,
            frame_format: FrameFormat::Progressive,
            line_stride: stride,
            timecode: Timecode(timecode),
            data: Bytes::from(vec![0x80u8; (stride * yres) as usize]),
        }
    }

    fn tone(channels: usize, samples: usize, sample_rate: u32) -> AudioFrame {
        let planes = vec![vec![0.5f32; samples]; channels];
        AudioFrame::from_planes(sample_rate, &planes, Timecode(42))
    }

    /// Open a published source and run the first tick
    fn open_playing(player: &MediaPlayer, transport: &MemoryTransport) -> MemorySource {
        let source = transport.publish("cam");
        player.open("ndi://cam", &MediaOptions::new()).unwrap();
        player.tick_audio_and_metadata(Duration::ZERO);
        source
    }

    #[test]
    fn test_open_rejects_invalid_urls() {
        let (player, transport) = setup(PlayerConfig::default());
        let events = record_events(&player);

        for url in ["", "cam", "http://cam", "ndi://"] {
            let result = player.open(url, &MediaOptions::new());
            assert!(matches!(result, Err(Error::InvalidUrl(_))), "url {url:?}");
        }

        assert!(take(&events).is_empty());
        assert_eq!(player.state(), MediaState::Closed);
        assert_eq!(transport.source_count(), 0);
    }

    #[test]
    fn test_open_emits_events_and_waits_for_tick() {
        let (player, transport) = setup(PlayerConfig::default());
        let _source = transport.publish("cam");
        let events = record_events(&player);

        player.open("ndi://cam", &MediaOptions::new()).unwrap();
        assert_eq!(take(&events), vec![MediaEvent::TracksChanged, MediaEvent::MediaOpened]);
        assert_eq!(player.state(), MediaState::Closed);
        assert_eq!(player.url(), "ndi://cam");

        player.tick_audio_and_metadata(Duration::from_millis(16));
        assert_eq!(player.state(), MediaState::Playing);
        assert_eq!(player.rate(), 1.0);
        assert_eq!(take(&events), vec![MediaEvent::PlaybackResumed]);

        // No further transition while nothing changes
        player.tick_audio_and_metadata(Duration::from_millis(16));
        assert!(take(&events).is_empty());
    }

    #[test]
    fn test_missing_sender_prepares() {
        let (player, _transport) = setup(PlayerConfig::default());
        let events = record_events(&player);

        player.open("ndi://nobody", &MediaOptions::new()).unwrap();
        take(&events);

        player.tick_audio_and_metadata(Duration::ZERO);
        assert_eq!(player.state(), MediaState::Preparing);
        assert_eq!(player.rate(), 0.0);
        assert_eq!(take(&events), vec![MediaEvent::PlaybackSuspended]);
    }

    #[test]
    fn test_sender_going_away_and_back() {
        let (player, transport) = setup(PlayerConfig::default());
        let source = open_playing(&player, &transport);
        let events = record_events(&player);

        source.set_online(false);
        player.tick_audio_and_metadata(Duration::ZERO);
        assert_eq!(player.state(), MediaState::Preparing);

        source.set_online(true);
        player.tick_audio_and_metadata(Duration::ZERO);
        assert_eq!(player.state(), MediaState::Playing);
        assert_eq!(
            take(&events),
            vec![MediaEvent::PlaybackSuspended, MediaEvent::PlaybackResumed]
        );
    }

    #[test]
    fn test_connection_failure() {
        let (player, transport) = setup(PlayerConfig::default());
        let events = record_events(&player);
        transport.set_accepting(false);

        let result = player.open("ndi://cam", &MediaOptions::new());
        assert!(matches!(
            result,
            Err(Error::ConnectionFailed { ref source_name, reason: crate::error::TransportError::Rejected(_) })
                if source_name == "cam"
        ));
        assert!(take(&events).is_empty());
        assert_eq!(player.url(), "");
        assert!(player.stats().is_none());
    }

    #[test]
    fn test_identification_and_preferences_reach_sender() {
        let config = PlayerConfig::default()
            .product("Player", "Test Player")
            .manufacturer("Acme")
            .custom_metadata("  <tally on_program=\"true\"/>\n");
        let (player, transport) = setup(config);
        let source = transport.publish("cam");

        let options = MediaOptions::new()
            .int(options::AUDIO_CHANNELS, 2)
            .int(options::VIDEO_WIDTH, 1280);
        player.open("ndi://cam", &options).unwrap();

        let sent = source.connection_metadata();
        assert_eq!(sent.len(), 3);
        assert!(sent[0].starts_with("<ndi_product short_name=\"Player\" long_name=\"Test Player\" manufacturer=\"Acme\""));
        assert_eq!(
            sent[1],
            "<ndi_format><audio_format no_channels=\"2\"/><video_format xres=\"1280\"/></ndi_format>"
        );
        assert_eq!(sent[2], "<tally on_program=\"true\"/>");
    }

    #[test]
    fn test_no_format_message_without_preferences() {
        let (player, transport) = setup(PlayerConfig::default());
        let source = transport.publish("cam");

        player.open("ndi://cam", &MediaOptions::new()).unwrap();

        let sent = source.connection_metadata();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].starts_with("<ndi_product"));
    }

    #[test]
    fn test_local_host_substitution() {
        let (player, transport) = setup(PlayerConfig::default());
        let named = transport.publish("STUDIO (Camera 1)");

        player.open("ndi://localhost (Camera 1)", &MediaOptions::new()).unwrap();
        assert_eq!(named.receiver_count(), 1);
        assert!(player.info().contains("Source: STUDIO (Camera 1) (name)"));

        // Only a leading token is replaced
        let other = transport.publish("cam localhost (x)");
        player.open("ndi://cam localhost (x)", &MediaOptions::new()).unwrap();
        assert_eq!(other.receiver_count(), 1);
        assert_eq!(named.receiver_count(), 0);
    }

    #[test]
    fn test_endpoint_url() {
        let (player, transport) = setup(PlayerConfig::default());
        let endpoint = transport.publish("10.0.0.5:5961");

        player.open("ndi://10.0.0.5:5961", &MediaOptions::new()).unwrap();
        assert_eq!(endpoint.receiver_count(), 1);
        assert!(player.info().contains("(endpoint)"));
    }

    #[test]
    fn test_close_is_idempotent() {
        let (player, transport) = setup(PlayerConfig::default());
        let events = record_events(&player);

        player.close();
        assert!(take(&events).is_empty());

        let source = open_playing(&player, &transport);
        player.handle_audio_frame(&tone(2, 32, 48000));
        assert_eq!(player.audio_track_channels(0), 2);
        take(&events);

        player.close();
        assert_eq!(take(&events), vec![MediaEvent::TracksChanged, MediaEvent::MediaClosed]);
        assert_eq!(player.state(), MediaState::Closed);
        assert_eq!(player.url(), "");
        assert_eq!(player.num_tracks(TrackType::Audio), 0);
        assert_eq!(player.audio_track_channels(0), 0);
        assert_eq!(source.receiver_count(), 0);

        player.close();
        assert!(take(&events).is_empty());
    }

    #[test]
    fn test_ticks_without_stream_do_nothing() {
        let (player, _transport) = setup(PlayerConfig::default());
        let sink = Arc::new(RecordingTextureSink::new());
        player.set_video_sink(Some(sink.clone()));

        player.tick_audio_and_metadata(Duration::ZERO);
        player.tick_video(Duration::ZERO);

        assert_eq!(player.state(), MediaState::Closed);
        assert!(sink.updates().is_empty());
    }

    #[test]
    fn test_video_sink_reinitialized_once_per_format() {
        let (player, transport) = setup(PlayerConfig::default());
        let sink = Arc::new(RecordingTextureSink::new());
        player.set_video_sink(Some(sink.clone()));
        let source = open_playing(&player, &transport);

        for tc in 0..3 {
            source.send_video(video(FourCc::Uyvy, 1920, 1080, tc));
            player.tick_video(Duration::ZERO);
        }

        let inits = sink.initializations();
        assert_eq!(inits.len(), 2);
        assert_eq!(inits[0].dimensions, Dimensions::ZERO);
        assert_eq!(inits[1].dimensions, Dimensions::new(1920, 1080));
        assert_eq!(inits[1].buffer_dimensions, Dimensions::new(960, 1080));
        assert_eq!(inits[1].format, TextureSinkFormat::CharUyvy);
        assert_eq!(inits[1].mode, TextureSinkMode::Unbuffered);
        assert_eq!(sink.updates(), vec![(1920 * 2 * 1080, 3840); 3]);
        assert_eq!(sink.displayed(), vec![Timecode(0), Timecode(1), Timecode(2)]);

        source.send_video(video(FourCc::Uyvy, 1280, 720, 3));
        player.tick_video(Duration::ZERO);
        assert_eq!(sink.initializations().len(), 3);

        // Each reinit lands right before the push of the frame that caused it
        let calls = sink.calls();
        assert_eq!(calls.len(), 1 + 1 + 3 * 2 + 1 + 2);
        assert!(matches!(calls[0], TextureCall::Init(init) if init.dimensions == Dimensions::ZERO));
        assert!(matches!(calls[1], TextureCall::Init(init) if init.dimensions == Dimensions::new(1920, 1080)));
        assert_eq!(calls[2], TextureCall::Update(1920 * 2 * 1080, 3840));
        assert_eq!(calls[3], TextureCall::Display(Timecode(0)));
        assert!(matches!(calls[8], TextureCall::Init(init) if init.dimensions == Dimensions::new(1280, 720)));
        assert_eq!(calls[9], TextureCall::Update(1280 * 2 * 720, 2560));
        assert_eq!(calls[10], TextureCall::Display(Timecode(3)));

        assert_eq!(player.video_track_dimensions(0), Dimensions::new(1280, 720));
        assert!((player.video_track_frame_rate(0) - 29.97).abs() < 0.01);
        assert_eq!(transport.outstanding_frames(), 0);
    }

    #[test]
    fn test_video_reinit_failure_drops_frame() {
        let (player, transport) = setup(PlayerConfig::default());
        let sink = Arc::new(RecordingTextureSink::new());
        player.set_video_sink(Some(sink.clone()));
        sink.reject_init(true);
        let source = open_playing(&player, &transport);

        source.send_video(video(FourCc::Uyvy, 640, 480, 0));
        player.tick_video(Duration::ZERO);

        assert!(sink.updates().is_empty());
        assert_eq!(player.stats().unwrap().session.sink_reinit_failures, 1);
        assert_eq!(transport.outstanding_frames(), 0);

        // Next frame is retried
        sink.reject_init(false);
        source.send_video(video(FourCc::Uyvy, 640, 480, 1));
        player.tick_video(Duration::ZERO);
        assert_eq!(sink.updates().len(), 1);
    }

    #[test]
    fn test_bgra_color_format_option() {
        let (player, transport) = setup(PlayerConfig::default());
        let sink = Arc::new(RecordingTextureSink::new());
        player.set_video_sink(Some(sink.clone()));
        let source = transport.publish("cam");

        let options = MediaOptions::new().int(options::COLOR_FORMAT, ColorFormat::BgrxBgra.code());
        player.open("ndi://cam", &options).unwrap();
        source.send_video(video(FourCc::Bgra, 320, 240, 0));
        player.tick_video(Duration::ZERO);

        let inits = sink.initializations();
        assert_eq!(inits.last().unwrap().format, TextureSinkFormat::CharBgra);
        assert_eq!(inits.last().unwrap().buffer_dimensions, Dimensions::new(320, 240));
    }

    #[test]
    fn test_unsupported_color_format_falls_back_to_uyvy() {
        let (player, transport) = setup(PlayerConfig::default());
        let sink = Arc::new(RecordingTextureSink::new());
        player.set_video_sink(Some(sink.clone()));
        let source = transport.publish("cam");

        for code in [ColorFormat::RgbxRgba.code(), 99] {
            let options = MediaOptions::new().int(options::COLOR_FORMAT, code);
            player.open("ndi://cam", &options).unwrap();
            source.send_video(video(FourCc::Uyvy, 64, 64, 0));
            player.tick_video(Duration::ZERO);
            assert_eq!(sink.initializations().last().unwrap().format, TextureSinkFormat::CharUyvy);
        }
    }

    #[test]
    fn test_color_format_given_as_text() {
        let (player, transport) = setup(PlayerConfig::default());
        let sink = Arc::new(RecordingTextureSink::new());
        player.set_video_sink(Some(sink.clone()));
        let source = transport.publish("cam");

        let options = MediaOptions::new().string(options::COLOR_FORMAT, " 0 ");
        player.open("ndi://cam", &options).unwrap();
        source.send_video(video(FourCc::Bgra, 32, 32, 0));
        player.tick_video(Duration::ZERO);
        assert_eq!(sink.initializations().last().unwrap().format, TextureSinkFormat::CharBgra);

        // Text that is not a number is an unknown format, not an absent one
        let options = MediaOptions::new().string(options::COLOR_FORMAT, "bgra");
        player.open("ndi://cam", &options).unwrap();
        source.send_video(video(FourCc::Uyvy, 32, 32, 1));
        player.tick_video(Duration::ZERO);
        assert_eq!(sink.initializations().last().unwrap().format, TextureSinkFormat::CharUyvy);
    }

    #[test]
    fn test_unparsable_bandwidth_uses_highest() {
        let (player, transport) = setup(PlayerConfig::default());
        let source = transport.publish("cam");

        let options = MediaOptions::new().string(options::BANDWIDTH, "audio");
        player.open("ndi://cam", &options).unwrap();

        assert_eq!(source.send_video(video(FourCc::Uyvy, 64, 64, 0)), 1);
    }

    #[test]
    fn test_audio_only_bandwidth_filters_video() {
        let (player, transport) = setup(PlayerConfig::default());
        let source = transport.publish("cam");

        let options = MediaOptions::new().int(options::BANDWIDTH, Bandwidth::AudioOnly.code());
        player.open("ndi://cam", &options).unwrap();

        assert_eq!(source.send_video(video(FourCc::Uyvy, 64, 64, 0)), 0);
        assert_eq!(source.send_audio(tone(2, 16, 48000)), 1);
    }

    #[test]
    fn test_unknown_bandwidth_uses_highest() {
        let (player, transport) = setup(PlayerConfig::default());
        let source = transport.publish("cam");

        let options = MediaOptions::new().int(options::BANDWIDTH, 55);
        player.open("ndi://cam", &options).unwrap();

        assert_eq!(source.send_video(video(FourCc::Uyvy, 64, 64, 0)), 1);
    }

    #[test]
    fn test_poll_error_leaves_state_alone() {
        let (player, transport) = setup(PlayerConfig::default());
        let sink = Arc::new(RecordingTextureSink::new());
        player.set_video_sink(Some(sink.clone()));
        let source = open_playing(&player, &transport);

        source.send_video(video(FourCc::Uyvy, 64, 64, 0));
        source.fail_next_capture(FrameKind::Video);

        player.tick_video(Duration::ZERO);
        assert!(sink.updates().is_empty());
        assert_eq!(player.state(), MediaState::Playing);

        player.tick_video(Duration::ZERO);
        assert_eq!(sink.updates().len(), 1);
    }

    #[test]
    fn test_rate_controls_pause() {
        let (player, transport) = setup(PlayerConfig::default());
        let audio_sink = Arc::new(RecordingAudioSink::new());
        let video_sink = Arc::new(RecordingTextureSink::new());
        player.set_audio_sink(Some(audio_sink.clone()));
        player.set_video_sink(Some(video_sink.clone()));
        let source = open_playing(&player, &transport);
        let events = record_events(&player);

        player.set_rate(0.0).unwrap();
        assert_eq!(player.state(), MediaState::Playing);
        assert_eq!(player.rate(), 0.0);
        player.tick_audio_and_metadata(Duration::ZERO);
        assert_eq!(player.state(), MediaState::Paused);
        assert_eq!(player.rate(), 0.0);
        assert_eq!(take(&events), vec![MediaEvent::PlaybackSuspended]);
        assert_eq!(audio_sink.pauses.load(Ordering::SeqCst), 1);
        assert_eq!(audio_sink.flushes.load(Ordering::SeqCst), 1);

        // Paused players leave video queued
        source.send_video(video(FourCc::Uyvy, 64, 64, 0));
        player.tick_video(Duration::ZERO);
        assert!(video_sink.updates().is_empty());
        assert_eq!(player.stats().unwrap().queued.video, 1);

        player.set_rate(1.0).unwrap();
        player.tick_audio_and_metadata(Duration::ZERO);
        assert_eq!(player.state(), MediaState::Playing);
        assert_eq!(take(&events), vec![MediaEvent::PlaybackResumed]);
        assert_eq!(audio_sink.resumes.load(Ordering::SeqCst), 2);

        player.tick_video(Duration::ZERO);
        assert_eq!(video_sink.updates().len(), 1);
    }

    #[test]
    fn test_rate_reflects_pause_before_tick() {
        let (player, transport) = setup(PlayerConfig::default());
        assert_eq!(player.rate(), 0.0);

        let _source = open_playing(&player, &transport);
        assert_eq!(player.rate(), 1.0);

        player.set_rate(0.0).unwrap();
        assert_eq!(player.rate(), 0.0);

        // Resuming waits for the tick to confirm the sender is live
        player.set_rate(1.0).unwrap();
        assert_eq!(player.rate(), 1.0);
        player.set_rate(0.0).unwrap();
        player.tick_audio_and_metadata(Duration::ZERO);
        player.set_rate(1.0).unwrap();
        assert_eq!(player.rate(), 0.0);
        player.tick_audio_and_metadata(Duration::ZERO);
        assert_eq!(player.rate(), 1.0);
    }

    #[test]
    fn test_rate_toggle_keeps_connection_and_formats() {
        let (player, transport) = setup(PlayerConfig::default());
        let source = open_playing(&player, &transport);

        source.send_video(video(FourCc::Uyvy, 1280, 720, 0));
        player.tick_video(Duration::ZERO);
        player.handle_audio_frame(&tone(2, 64, 44100));

        let dimensions = player.video_track_dimensions(0);
        let channels = player.audio_track_channels(0);
        let sample_rate = player.audio_track_sample_rate(0);
        assert_eq!(dimensions, Dimensions::new(1280, 720));
        assert_eq!((channels, sample_rate), (2, 44100));
        assert_eq!(source.receiver_count(), 1);

        player.set_rate(0.0).unwrap();
        player.tick_audio_and_metadata(Duration::ZERO);
        assert_eq!(player.state(), MediaState::Paused);
        player.set_rate(1.0).unwrap();
        player.tick_audio_and_metadata(Duration::ZERO);
        assert_eq!(player.state(), MediaState::Playing);

        assert_eq!(player.video_track_dimensions(0), dimensions);
        assert_eq!(player.audio_track_channels(0), channels);
        assert_eq!(player.audio_track_sample_rate(0), sample_rate);
        assert_eq!(source.receiver_count(), 1);
        assert_eq!(player.url(), "ndi://cam");
        assert!(player.stats().is_some());
    }

    #[test]
    fn test_unsupported_rate_is_rejected() {
        let (player, transport) = setup(PlayerConfig::default());
        let _source = open_playing(&player, &transport);

        assert!(matches!(player.set_rate(2.0), Err(Error::Unsupported(_))));
        assert!(matches!(player.set_rate(-1.0), Err(Error::Unsupported(_))));
        player.tick_audio_and_metadata(Duration::ZERO);
        assert_eq!(player.state(), MediaState::Playing);

        assert!(player.supports_rate(1.0));
        assert!(!player.supports_rate(0.5));
        assert_eq!(player.supported_rates(), 1.0..=1.0);
    }

    #[test]
    fn test_state_updates_without_audio_sink_by_default() {
        let (player, transport) = setup(PlayerConfig::default());
        let events = record_events(&player);
        let _source = open_playing(&player, &transport);

        assert_eq!(player.state(), MediaState::Playing);
        assert!(take(&events).contains(&MediaEvent::PlaybackResumed));
    }

    #[test]
    fn test_state_gated_on_audio_sink() {
        let (player, transport) = setup(PlayerConfig::default().gate_state_on_audio_sink(true));
        let _source = transport.publish("cam");
        player.open("ndi://cam", &MediaOptions::new()).unwrap();
        let events = record_events(&player);

        player.tick_audio_and_metadata(Duration::ZERO);
        assert_eq!(player.state(), MediaState::Closed);
        assert!(take(&events).is_empty());

        let sink = Arc::new(RecordingAudioSink::new());
        player.set_audio_sink(Some(sink.clone()));
        player.tick_audio_and_metadata(Duration::ZERO);
        assert_eq!(player.state(), MediaState::Playing);
        assert_eq!(take(&events), vec![MediaEvent::PlaybackResumed]);
        assert_eq!(sink.resumes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_metadata_tick_forwards_frames() {
        let (player, transport) = setup(PlayerConfig::default());
        let sink = Arc::new(RecordingBinarySink::new());
        let source = open_playing(&player, &transport);

        // Without a sink metadata stays queued
        source.send_metadata(MetadataFrame::text("<a/>", Timecode(5)));
        player.tick_audio_and_metadata(Duration::ZERO);
        assert_eq!(player.stats().unwrap().queued.metadata, 1);

        player.set_metadata_sink(Some(sink.clone()));
        assert_eq!(sink.initializations.load(Ordering::SeqCst), 1);
        source.send_metadata(MetadataFrame::text("<b/>", Timecode(6)));
        player.tick_audio_and_metadata(Duration::ZERO);
        player.tick_audio_and_metadata(Duration::ZERO);
        player.tick_audio_and_metadata(Duration::ZERO);

        let received = sink.received();
        assert_eq!(received.len(), 2);
        assert_eq!(received[0], (b"<a/>".to_vec(), Timecode(5), Duration::ZERO));
        assert_eq!(received[1].0, b"<b/>".to_vec());
        assert_eq!(player.stats().unwrap().session.metadata_frames_processed, 2);
        assert_eq!(transport.outstanding_frames(), 0);
    }

    #[test]
    fn test_metadata_poll_error_is_ignored() {
        let (player, transport) = setup(PlayerConfig::default());
        let sink = Arc::new(RecordingBinarySink::new());
        player.set_metadata_sink(Some(sink.clone()));
        let source = open_playing(&player, &transport);

        source.send_metadata(MetadataFrame::text("<a/>", Timecode(1)));
        source.fail_next_capture(FrameKind::Metadata);
        player.tick_audio_and_metadata(Duration::ZERO);
        assert!(sink.received().is_empty());
        assert_eq!(player.state(), MediaState::Playing);

        player.tick_audio_and_metadata(Duration::ZERO);
        assert_eq!(sink.received().len(), 1);
    }

    #[test]
    fn test_sampler_association_all_combinations() {
        for paused in [false, true] {
            for has_sink in [false, true] {
                for selected in [None, Some(0)] {
                    let (player, transport) = setup(PlayerConfig::default());
                    let _source = open_playing(&player, &transport);

                    player.set_rate(if paused { 0.0 } else { 1.0 }).unwrap();
                    if has_sink {
                        player.set_audio_sink(Some(Arc::new(RecordingAudioSink::new())));
                    }
                    player.select_track(TrackType::Audio, selected).unwrap();

                    let expected = !paused && has_sink && selected == Some(0);
                    assert_eq!(
                        player.is_sampling_audio(),
                        expected,
                        "paused={paused} sink={has_sink} selected={selected:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_sampler_detached_on_close_and_sink_removal() {
        let (player, transport) = setup(PlayerConfig::default());
        let _source = open_playing(&player, &transport);
        player.set_audio_sink(Some(Arc::new(RecordingAudioSink::new())));
        player.select_track(TrackType::Audio, Some(0)).unwrap();
        assert!(player.is_sampling_audio());

        player.set_audio_sink(None);
        assert!(!player.is_sampling_audio());

        player.set_audio_sink(Some(Arc::new(RecordingAudioSink::new())));
        assert!(player.is_sampling_audio());

        player.close();
        assert!(!player.is_sampling_audio());
        assert_eq!(player.track_selection(TrackType::Audio), None);
    }

    #[test]
    fn test_sampled_audio_reaches_sink() {
        let (player, transport) = setup(PlayerConfig::default());
        let sink = Arc::new(RecordingAudioSink::new());
        player.set_audio_sink(Some(sink.clone()));
        let source = open_playing(&player, &transport);
        player.select_track(TrackType::Audio, Some(0)).unwrap();

        source.send_audio(tone(2, 480, 48000));
        source.send_audio(tone(2, 480, 48000));
        assert!(player.sample_audio());
        assert!(player.sample_audio());
        assert!(!player.sample_audio());

        assert_eq!(sink.initializations(), vec![(0, 0), (2, 48000)]);
        let played = sink.played();
        assert_eq!(played.len(), 2);
        assert_eq!(played[0].0.len(), 480 * 2 * 2);
        assert_eq!(played[0].1, Timecode(42));

        assert_eq!(player.audio_track_channels(0), 2);
        assert_eq!(player.audio_track_sample_rate(0), 48000);
        let stats = player.stats().unwrap();
        assert_eq!(stats.session.samples_received, 2 * 480 * 2);
        assert_eq!(stats.session.audio_frames_played, 2);
        assert_eq!(transport.outstanding_frames(), 0);
    }

    #[test]
    fn test_audio_format_change_reinitializes_sink() {
        let (player, transport) = setup(PlayerConfig::default());
        let sink = Arc::new(RecordingAudioSink::new());
        player.set_audio_sink(Some(sink.clone()));
        let _source = open_playing(&player, &transport);

        player.handle_audio_frame(&tone(2, 64, 48000));
        player.handle_audio_frame(&tone(1, 64, 44100));
        player.handle_audio_frame(&tone(1, 64, 44100));

        assert_eq!(sink.initializations(), vec![(0, 0), (2, 48000), (1, 44100)]);
        assert_eq!(sink.played().len(), 3);
        assert_eq!(sink.played()[1].0.len(), 64 * 2);
    }

    #[test]
    fn test_audio_reinit_failure_drops_frame() {
        let (player, transport) = setup(PlayerConfig::default());
        let sink = Arc::new(RecordingAudioSink::new());
        player.set_audio_sink(Some(sink.clone()));
        sink.reject_init(true);
        let _source = open_playing(&player, &transport);

        player.handle_audio_frame(&tone(2, 64, 48000));
        assert!(sink.played().is_empty());
        // Format is cached even though the frame was dropped
        assert_eq!(player.audio_track_channels(0), 2);
        assert_eq!(player.stats().unwrap().session.sink_reinit_failures, 1);
    }

    #[test]
    fn test_truncated_audio_is_dropped() {
        let (player, transport) = setup(PlayerConfig::default());
        let sink = Arc::new(RecordingAudioSink::new());
        player.set_audio_sink(Some(sink.clone()));
        let _source = open_playing(&player, &transport);

        let mut frame = tone(2, 64, 48000);
        frame.data = frame.data.slice(..100);
        player.handle_audio_frame(&frame);

        assert!(sink.played().is_empty());
        assert_eq!(player.stats().unwrap().session.conversion_failures, 1);
    }

    #[test]
    fn test_audio_ignored_while_closed() {
        let (player, _transport) = setup(PlayerConfig::default());
        let sink = Arc::new(RecordingAudioSink::new());
        player.set_audio_sink(Some(sink.clone()));

        player.handle_audio_frame(&tone(2, 64, 48000));
        assert!(sink.played().is_empty());
        assert_eq!(sink.initializations(), vec![(0, 0)]);
    }

    #[test]
    fn test_sink_setters_ignore_same_sink() {
        let (player, _transport) = setup(PlayerConfig::default());

        let audio = Arc::new(RecordingAudioSink::new());
        player.set_audio_sink(Some(audio.clone()));
        player.set_audio_sink(Some(audio.clone()));
        assert_eq!(audio.initializations().len(), 1);
        assert_eq!(audio.shutdowns.load(Ordering::SeqCst), 0);

        let texture = Arc::new(RecordingTextureSink::new());
        player.set_video_sink(Some(texture.clone()));
        player.set_video_sink(Some(texture.clone()));
        assert_eq!(texture.initializations().len(), 1);

        let binary = Arc::new(RecordingBinarySink::new());
        player.set_metadata_sink(Some(binary.clone()));
        player.set_metadata_sink(Some(binary.clone()));
        assert_eq!(binary.initializations.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_replacing_sinks_shuts_down_old() {
        let (player, _transport) = setup(PlayerConfig::default());

        let first = Arc::new(RecordingAudioSink::new());
        let second = Arc::new(RecordingAudioSink::new());
        player.set_audio_sink(Some(first.clone()));
        player.set_audio_sink(Some(second.clone()));
        player.set_audio_sink(None);
        assert_eq!(first.shutdowns.load(Ordering::SeqCst), 1);
        assert_eq!(second.shutdowns.load(Ordering::SeqCst), 1);

        let texture = Arc::new(RecordingTextureSink::new());
        player.set_video_sink(Some(texture.clone()));
        player.set_video_sink(None);
        assert_eq!(texture.shutdowns.load(Ordering::SeqCst), 1);

        let binary = Arc::new(RecordingBinarySink::new());
        player.set_metadata_sink(Some(binary.clone()));
        player.set_metadata_sink(None);
        assert_eq!(binary.shutdowns.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_new_video_sink_gets_cached_format() {
        let (player, transport) = setup(PlayerConfig::default());
        let source = open_playing(&player, &transport);

        source.send_video(video(FourCc::Uyvy, 1280, 720, 0));
        player.tick_video(Duration::ZERO);

        let sink = Arc::new(RecordingTextureSink::new());
        player.set_video_sink(Some(sink.clone()));
        let inits = sink.initializations();
        assert_eq!(inits.len(), 1);
        assert_eq!(inits[0].dimensions, Dimensions::new(1280, 720));
        assert_eq!(inits[0].buffer_dimensions, Dimensions::new(640, 720));
    }

    #[test]
    fn test_tracks_follow_session() {
        let (player, transport) = setup(PlayerConfig::default());
        assert_eq!(player.num_tracks(TrackType::Video), 0);
        assert_eq!(player.selected_track(TrackType::Video), None);

        let _source = open_playing(&player, &transport);
        assert_eq!(player.num_tracks(TrackType::Video), 1);
        assert_eq!(player.num_tracks(TrackType::Subtitle), 0);
        assert_eq!(player.selected_track(TrackType::Audio), Some(0));
        assert_eq!(player.track_display_name(TrackType::Metadata, 0), "Metadata Track");
        assert_eq!(player.track_language(TrackType::Audio, 0), "und");
        assert_eq!(player.track_name(TrackType::Audio, 0), "");
        assert_eq!(player.video_track_bit_rate(0), 0);
        assert!(matches!(
            player.select_track(TrackType::Audio, Some(1)),
            Err(Error::Unsupported(_))
        ));
    }

    #[test]
    fn test_unsupported_controls() {
        let (player, _transport) = setup(PlayerConfig::default());

        assert!(matches!(player.seek(Duration::from_secs(1)), Err(Error::Unsupported(_))));
        assert!(matches!(player.set_looping(true), Err(Error::Unsupported(_))));
        assert!(matches!(
            player.open_archive(Bytes::new(), "ndi://cam", &MediaOptions::new()),
            Err(Error::Unsupported(_))
        ));
        assert!(!player.is_looping());
        assert!(!player.supports_seeking());
        assert!(!player.supports_scrubbing());
        assert_eq!(player.duration(), Duration::ZERO);
        assert_eq!(player.time(), Duration::ZERO);
        assert_eq!(player.name(), "NdiMedia");
    }

    #[test]
    fn test_stats_report() {
        let (player, transport) = setup(PlayerConfig::default());
        assert!(player.stats().is_none());

        let source = open_playing(&player, &transport);
        source.send_video(video(FourCc::Uyvy, 64, 64, 0));
        source.send_audio(tone(2, 16, 48000));

        let stats = player.stats().unwrap();
        assert_eq!(stats.total.video, 1);
        assert_eq!(stats.total.audio, 1);
        assert_eq!(stats.queued.audio, 1);

        let report = stats.to_string();
        assert!(report.starts_with("Total Frames\n    Audio: 1\n    Video: 1\n"));
        assert!(report.contains("Queue Depth\n"));
    }

    #[test]
    fn test_info() {
        let (player, transport) = setup(PlayerConfig::default());
        assert_eq!(player.info(), "");

        let _source = open_playing(&player, &transport);
        let info = player.info();
        assert!(info.contains("Url: ndi://cam"));
        assert!(info.contains("State: Playing"));
        assert!(info.contains("UYVY"));
    }

    #[test]
    fn test_open_source() {
        let (player, transport) = setup(PlayerConfig::default());
        let source = transport.publish("STUDIO (Camera 2)");

        let media = MediaSource::named("STUDIO (Camera 2)").frame_rate(60, 1);
        player.open_source(&media).unwrap();
        assert_eq!(player.url(), "ndi://STUDIO (Camera 2)");
        assert_eq!(source.receiver_count(), 1);

        let sent = source.connection_metadata();
        assert!(sent[1].contains("no_channels=\"2\" sample_rate=\"48000\""));
        assert!(sent[1].contains("frame_rate_d=\"1\" frame_rate_n=\"60\""));

        let empty = MediaSource::default();
        assert!(matches!(player.open_source(&empty), Err(Error::InvalidSource(_))));
    }

    #[test]
    fn test_reopen_closes_previous_stream() {
        let (player, transport) = setup(PlayerConfig::default());
        let first = transport.publish("one");
        let second = transport.publish("two");
        let events = record_events(&player);

        player.open("ndi://one", &MediaOptions::new()).unwrap();
        player.open("ndi://two", &MediaOptions::new()).unwrap();

        assert_eq!(first.receiver_count(), 0);
        assert_eq!(second.receiver_count(), 1);
        assert_eq!(
            take(&events),
            vec![
                MediaEvent::TracksChanged,
                MediaEvent::MediaOpened,
                MediaEvent::TracksChanged,
                MediaEvent::MediaClosed,
                MediaEvent::TracksChanged,
                MediaEvent::MediaOpened,
            ]
        );
    }

    #[test]
    fn test_listener_may_call_back_into_player() {
        let transport = MemoryTransport::new();
        let _source = transport.publish("cam");
        let player = Arc::new(MediaPlayer::new(PlayerConfig::default(), Arc::new(transport)));

        let states = Arc::new(Mutex::new(Vec::new()));
        let weak = Arc::downgrade(&player);
        let log = states.clone();
        player.subscribe(move |_| {
            if let Some(player) = weak.upgrade() {
                log.lock().unwrap().push(player.state());
            }
        });

        player.open("ndi://cam", &MediaOptions::new()).unwrap();
        player.tick_audio_and_metadata(Duration::ZERO);

        assert_eq!(
            *states.lock().unwrap(),
            vec![MediaState::Closed, MediaState::Closed, MediaState::Playing]
        );
    }

    #[test]
    fn test_drop_closes_stream() {
        let (player, transport) = setup(PlayerConfig::default());
        let source = open_playing(&player, &transport);
        let events = record_events(&player);

        drop(player);

        assert_eq!(take(&events), vec![MediaEvent::TracksChanged, MediaEvent::MediaClosed]);
        assert_eq!(source.receiver_count(), 0);
    }

    #[tokio::test]
    async fn test_background_sampler_plays_audio() {
        let (player, transport) = setup(PlayerConfig::default().sampler_interval(Duration::from_millis(1)));
        let sink = Arc::new(RecordingAudioSink::new());
        player.set_audio_sink(Some(sink.clone()));
        let source = open_playing(&player, &transport);
        player.select_track(TrackType::Audio, Some(0)).unwrap();
        player.spawn_audio_sampler();

        for _ in 0..4 {
            source.send_audio(tone(2, 256, 48000));
        }
        for _ in 0..200 {
            if sink.played().len() == 4 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert_eq!(sink.played().len(), 4);
        assert_eq!(transport.outstanding_frames(), 0);
    }
}
