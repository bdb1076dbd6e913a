//! Frame format conversion
//!
//! This module provides:
//! - Texture layout and sink format mapping for video frames
//! - Planar float to interleaved 16-bit PCM conversion for audio frames

pub mod audio;
pub mod video;

pub use audio::{interleave_i16, to_pcm_bytes, REFERENCE_LEVEL_DB};
pub use video::{sink_format_for, texture_layout, TextureLayout};
