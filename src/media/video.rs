//! Video frame layout conversion
//!
//! Captured frames arrive as a packed plane with a row stride. Texture sinks
//! are initialized with the picture dimensions plus buffer dimensions counted
//! in 4-byte texels, so a UYVY row of `w` pixels (`2w` bytes) spans `w / 2`
//! texels and a BGRA row spans `w` texels.

use crate::sink::{Dimensions, TextureSinkFormat};
use crate::transport::{ColorFormat, VideoFrame};

/// Bytes per texture sink texel
pub const TEXEL_SIZE: u32 = 4;

/// Layout a texture sink needs for a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureLayout {
    /// Picture size in pixels
    pub dimensions: Dimensions,
    /// Buffer size in texels, derived from the row stride
    pub buffer_dimensions: Dimensions,
    /// Sink pixel format
    pub format: TextureSinkFormat,
}

/// Picture dimensions of a frame
pub fn frame_dimensions(frame: &VideoFrame) -> Dimensions {
    Dimensions::new(frame.xres, frame.yres)
}

/// Buffer dimensions of a frame in texels
pub fn buffer_dimensions(frame: &VideoFrame) -> Dimensions {
    Dimensions::new(frame.line_stride / TEXEL_SIZE, frame.yres)
}

/// Sink layout for a frame captured with the session's sink format
pub fn texture_layout(frame: &VideoFrame, format: TextureSinkFormat) -> TextureLayout {
    TextureLayout {
        dimensions: frame_dimensions(frame),
        buffer_dimensions: buffer_dimensions(frame),
        format,
    }
}

/// Sink format for a requested receive color format
///
/// Returns `None` for formats the texture sink cannot display; callers fall
/// back to UYVY.
pub fn sink_format_for(color: ColorFormat) -> Option<TextureSinkFormat> {
    match color {
        ColorFormat::BgrxBgra => Some(TextureSinkFormat::CharBgra),
        ColorFormat::UyvyBgra => Some(TextureSinkFormat::CharUyvy),
        ColorFormat::RgbxRgba | ColorFormat::UyvyRgba => None,
    }
}

/// Check that the frame's buffer holds `stride * yres` bytes
pub fn is_complete(frame: &VideoFrame) -> bool {
    let needed = frame.line_stride as usize * frame.yres as usize;
    frame.data.len() >= needed
}
