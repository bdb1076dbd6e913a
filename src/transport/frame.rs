//! Captured frame types
//!
//! Frames are produced by a single capture call and belong to the receiver
//! until they are released back to it. Payloads are `bytes::Bytes`, so a
//! transport can hand out views of its own buffers without copying.

use std::time::Duration;

use bytes::Bytes;

/// Frame timecode in 100 ns ticks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timecode(pub i64);

impl Timecode {
    /// Ticks per second
    pub const TICKS_PER_SECOND: i64 = 10_000_000;

    /// Timecode zero
    pub const ZERO: Timecode = Timecode(0);

    /// Create from raw 100 ns ticks
    pub fn from_ticks(ticks: i64) -> Self {
        Self(ticks)
    }

    /// Raw 100 ns ticks
    pub fn ticks(&self) -> i64 {
        self.0
    }

    /// Convert to a duration; negative timecodes clamp to zero
    pub fn as_duration(&self) -> Duration {
        let ticks = self.0.max(0) as u64;
        Duration::from_nanos(ticks.saturating_mul(100))
    }
}

impl From<Duration> for Timecode {
    fn from(duration: Duration) -> Self {
        Self((duration.as_nanos() / 100).min(i64::MAX as u128) as i64)
    }
}

/// Kind of frame requested from a capture call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    Video,
    Audio,
    Metadata,
}

impl std::fmt::Display for FrameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameKind::Video => write!(f, "video"),
            FrameKind::Audio => write!(f, "audio"),
            FrameKind::Metadata => write!(f, "metadata"),
        }
    }
}

/// Pixel layout of a captured video frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FourCc {
    /// Packed 4:2:2, two pixels per 4-byte macropixel
    Uyvy,
    /// UYVY followed by a planar alpha plane
    Uyva,
    Bgra,
    Bgrx,
    Rgba,
    Rgbx,
}

impl FourCc {
    /// Bytes per pixel in the packed plane
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            FourCc::Uyvy | FourCc::Uyva => 2,
            FourCc::Bgra | FourCc::Bgrx | FourCc::Rgba | FourCc::Rgbx => 4,
        }
    }
}

/// Scan structure of a video frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameFormat {
    #[default]
    Progressive,
    /// Both fields interleaved in one frame
    Interleaved,
    /// Even field only
    Field0,
    /// Odd field only
    Field1,
}

/// A captured video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Width in pixels
    pub xres: u32,
    /// Height in pixels
    pub yres: u32,
    /// Pixel layout
    pub fourcc: FourCc,
    /// Frame rate numerator
    pub frame_rate_n: u32,
    /// Frame rate denominator
    pub frame_rate_d: u32,
    /// Scan structure
    pub frame_format: FrameFormat,
    /// Bytes per row of the packed plane
    pub line_stride: u32,
    /// Sender timecode
    pub timecode: Timecode,
    /// Pixel data
    pub data: Bytes,
}

impl VideoFrame {
    /// Frame rate in frames per second, zero if unknown
    pub fn frame_rate(&self) -> f32 {
        if self.frame_rate_d == 0 {
            0.0
        } else {
            self.frame_rate_n as f32 / self.frame_rate_d as f32
        }
    }
}

/// A captured audio frame in planar 32-bit float layout
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Samples per second
    pub sample_rate: u32,
    /// Number of channels (planes)
    pub channels: u32,
    /// Samples per channel
    pub samples: u32,
    /// Distance in bytes between the starts of consecutive channel planes
    pub channel_stride: u32,
    /// Sender timecode
    pub timecode: Timecode,
    /// Little-endian `f32` planes
    pub data: Bytes,
}

impl AudioFrame {
    /// Build a frame from per-channel sample planes
    ///
    /// All planes must have the same length.
    pub fn from_planes(sample_rate: u32, planes: &[Vec<f32>], timecode: Timecode) -> Self {
        let samples = planes.first().map_or(0, |p| p.len());
        let mut data = Vec::with_capacity(planes.len() * samples * 4);
        for plane in planes {
            for sample in plane.iter().take(samples) {
                data.extend_from_slice(&sample.to_le_bytes());
            }
        }

        Self {
            sample_rate,
            channels: planes.len() as u32,
            samples: samples as u32,
            channel_stride: (samples * 4) as u32,
            timecode,
            data: Bytes::from(data),
        }
    }
}

/// A captured metadata frame
#[derive(Debug, Clone)]
pub struct MetadataFrame {
    /// Sender timecode
    pub timecode: Timecode,
    /// Payload, usually XML text
    pub data: Bytes,
}

impl MetadataFrame {
    /// Create a metadata frame from text
    pub fn text(data: impl Into<String>, timecode: Timecode) -> Self {
        Self {
            timecode,
            data: Bytes::from(data.into()),
        }
    }

    /// Payload as UTF-8 text, if valid
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }
}

/// Result of a single capture call
#[derive(Debug, Clone)]
pub enum Frame {
    /// Nothing arrived within the timeout
    None,
    Video(VideoFrame),
    Audio(AudioFrame),
    Metadata(MetadataFrame),
}

impl Frame {
    /// Kind of the frame, `None` for an empty capture
    pub fn kind(&self) -> Option<FrameKind> {
        match self {
            Frame::None => None,
            Frame::Video(_) => Some(FrameKind::Video),
            Frame::Audio(_) => Some(FrameKind::Audio),
            Frame::Metadata(_) => Some(FrameKind::Metadata),
        }
    }

    /// Whether the frame carries data that must be released
    pub fn is_data(&self) -> bool {
        !matches!(self, Frame::None)
    }
}
