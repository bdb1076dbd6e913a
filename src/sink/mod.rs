//! Presentation sink contracts
//!
//! Sinks are implemented outside this crate. The player only holds shared
//! references to them and drives their lifecycle: it initializes a sink when
//! it is attached or when the stream format changes, pushes frames while
//! playing, and shuts it down when it is replaced.
//!
//! All methods take `&self`; sinks that keep state use interior mutability.
//! Sink methods are called while the player holds its session lock, so a sink
//! must not call back into the player from inside these methods.

use std::time::Duration;

use crate::transport::Timecode;

/// Width and height in pixels (or texels for buffer dimensions)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    /// Zero dimensions
    pub const ZERO: Dimensions = Dimensions {
        width: 0,
        height: 0,
    };

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Check whether either side is zero
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Pixel format of a texture sink buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureSinkFormat {
    /// 8-bit BGRA, one pixel per texel
    CharBgra,
    /// 8-bit UYVY, two pixels per texel
    #[default]
    CharUyvy,
}

impl TextureSinkFormat {
    pub fn name(&self) -> &'static str {
        match self {
            TextureSinkFormat::CharBgra => "BGRA",
            TextureSinkFormat::CharUyvy => "UYVY",
        }
    }
}

/// Texture sink buffering mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureSinkMode {
    /// Double buffered, the sink copies on update
    Buffered,
    /// Frames are displayed straight from the pushed buffer
    #[default]
    Unbuffered,
}

/// Audio output
pub trait AudioSink: Send + Sync {
    /// Prepare for the given format; returns false if unsupported
    fn initialize_audio_sink(&self, channels: u32, sample_rate: u32) -> bool;

    /// Queue interleaved little-endian 16-bit PCM
    fn play_audio_sink(&self, buffer: &[u8], timecode: Timecode);

    fn resume_audio_sink(&self);

    fn pause_audio_sink(&self);

    /// Discard queued samples
    fn flush_audio_sink(&self);

    fn shutdown_audio_sink(&self);

    /// Channel count the sink is currently initialized for
    fn audio_sink_channels(&self) -> u32;

    /// Sample rate the sink is currently initialized for
    fn audio_sink_sample_rate(&self) -> u32;
}

/// Video texture output
pub trait TextureSink: Send + Sync {
    /// Prepare for the given layout; returns false if unsupported
    fn initialize_texture_sink(
        &self,
        dimensions: Dimensions,
        buffer_dimensions: Dimensions,
        format: TextureSinkFormat,
        mode: TextureSinkMode,
    ) -> bool;

    /// Copy in a new frame of packed pixel rows
    fn update_texture_sink_buffer(&self, data: &[u8], stride: u32);

    /// Present the last updated buffer
    fn display_texture_sink_buffer(&self, timecode: Timecode);

    fn shutdown_texture_sink(&self);

    /// Format the sink is currently initialized for
    fn texture_sink_format(&self) -> TextureSinkFormat;

    /// Output dimensions the sink is currently initialized for
    fn texture_sink_dimensions(&self) -> Dimensions;
}

/// Metadata / binary output
pub trait BinarySink: Send + Sync {
    fn initialize_binary_sink(&self) -> bool;

    /// Consume one metadata payload
    fn process_binary_sink_data(&self, data: &[u8], timecode: Timecode, duration: Duration);

    fn shutdown_binary_sink(&self);
}

/// Compare two optional shared references by address
pub(crate) fn same_ref<T: ?Sized>(a: Option<&std::sync::Arc<T>>, b: Option<&std::sync::Arc<T>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => std::ptr::addr_eq(std::sync::Arc::as_ptr(a), std::sync::Arc::as_ptr(b)),
        _ => false,
    }
}
