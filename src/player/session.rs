//! Session state guarded by the player lock

use std::sync::Arc;

use super::state::MediaState;
use crate::sink::{AudioSink, BinarySink, Dimensions, TextureSink, TextureSinkFormat};
use crate::stats::SessionCounters;
use crate::transport::{ReceiverHandle, SourceDescriptor};

/// Last-known audio format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AudioFormat {
    pub channels: u32,
    pub sample_rate: u32,
}

/// Last-known video format
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VideoFormat {
    /// Picture size in pixels
    pub dimensions: Dimensions,
    /// Buffer size in texels
    pub buffer_dimensions: Dimensions,
    /// Frames per second, zero if unknown
    pub frame_rate: f32,
}

/// Everything the player lock protects
#[derive(Default)]
pub struct Session {
    /// Receiver for the open stream; the session is its owner of record
    pub receiver: Option<ReceiverHandle>,

    /// Current playback state
    pub state: MediaState,

    /// URL passed to open
    pub url: String,

    /// Parsed source of the open stream
    pub source: Option<SourceDescriptor>,

    /// Selected audio track
    pub selected_audio: Option<usize>,

    /// Selected metadata track
    pub selected_metadata: Option<usize>,

    /// Selected video track
    pub selected_video: Option<usize>,

    pub audio_format: AudioFormat,

    pub video_format: VideoFormat,

    /// Set by rate 0.0, cleared by rate 1.0
    pub paused: bool,

    /// Texture sink format chosen at open
    pub sink_format: TextureSinkFormat,

    pub audio_sink: Option<Arc<dyn AudioSink>>,

    pub video_sink: Option<Arc<dyn TextureSink>>,

    pub metadata_sink: Option<Arc<dyn BinarySink>>,

    /// Per-session diagnostics
    pub counters: SessionCounters,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether a receiver is installed
    pub fn is_open(&self) -> bool {
        self.receiver.is_some()
    }

    /// Zero the cached formats
    pub fn reset_formats(&mut self) {
        self.audio_format = AudioFormat::default();
        self.video_format = VideoFormat::default();
    }

    /// Clear all track selections
    pub fn reset_selections(&mut self) {
        self.selected_audio = None;
        self.selected_metadata = None;
        self.selected_video = None;
    }

    /// Receiver the audio sampler should poll, if any
    ///
    /// Sampling runs only while not paused, with an audio sink attached and
    /// audio track 0 selected.
    pub fn sampler_receiver(&self) -> Option<ReceiverHandle> {
        let sample_audio =
            !self.paused && self.audio_sink.is_some() && self.selected_audio == Some(0);
        if sample_audio {
            self.receiver.clone()
        } else {
            None
        }
    }

    /// Tear down the open stream and return its receiver
    ///
    /// Sinks, the paused flag and the listener list survive a close.
    pub fn close(&mut self) -> Option<ReceiverHandle> {
        let receiver = self.receiver.take();
        self.state = MediaState::Closed;
        self.url.clear();
        self.source = None;
        self.reset_formats();
        self.reset_selections();
        self.counters.reset();
        receiver
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("receiver", &self.receiver)
            .field("state", &self.state)
            .field("url", &self.url)
            .field("selected_audio", &self.selected_audio)
            .field("audio_format", &self.audio_format)
            .field("video_format", &self.video_format)
            .field("paused", &self.paused)
            .field("sink_format", &self.sink_format)
            .field("audio_sink", &self.audio_sink.is_some())
            .field("video_sink", &self.video_sink.is_some())
            .field("metadata_sink", &self.metadata_sink.is_some())
            .finish()
    }
}
