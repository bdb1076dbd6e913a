//! Side-channel messages sent to a sender after connecting
//!
//! ```text
//! <ndi_product short_name=".." long_name=".." manufacturer=".." version=".."
//!              serial_number=".." session_name=".."/>
//! <ndi_format><audio_format no_channels=".." sample_rate=".."/>
//!             <video_format frame_rate_d=".." frame_rate_n=".." progressive=".."
//!                           yres=".." xres=".."/></ndi_format>
//! ```

use std::fmt::Write;

use super::config::PlayerConfig;
use super::options::{self, MediaOptions};

/// Escape a value for use inside a double-quoted XML attribute
pub fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn push_attr(out: &mut String, name: &str, value: &str) {
    let _ = write!(out, " {}=\"{}\"", name, escape_attr(value));
}

fn push_positive(out: &mut String, opts: &MediaOptions, key: &str, name: &str) {
    let value = opts.get_int(key, 0);
    if value > 0 {
        let _ = write!(out, " {}=\"{}\"", name, value);
    }
}

/// Product identification message
pub fn product_identification(config: &PlayerConfig) -> String {
    let mut out = String::from("<ndi_product");
    push_attr(&mut out, "short_name", &config.product_name);
    push_attr(&mut out, "long_name", &config.product_description);
    push_attr(&mut out, "manufacturer", &config.manufacturer);
    push_attr(&mut out, "version", &config.version);
    push_attr(&mut out, "serial_number", &config.serial_number);
    push_attr(&mut out, "session_name", &config.session_name);
    out.push_str("/>");
    out
}

/// Format preference message, or `None` if the options express no preference
///
/// Integer preferences are included only when positive, the progressive flag
/// only when non-empty.
pub fn format_preference(opts: &MediaOptions) -> Option<String> {
    let mut audio = String::new();
    let mut video = String::new();

    push_positive(&mut audio, opts, options::AUDIO_CHANNELS, "no_channels");
    push_positive(&mut audio, opts, options::AUDIO_SAMPLE_RATE, "sample_rate");

    push_positive(&mut video, opts, options::FRAME_RATE_D, "frame_rate_d");
    push_positive(&mut video, opts, options::FRAME_RATE_N, "frame_rate_n");
    let progressive = opts.get_str(options::PROGRESSIVE, "");
    if !progressive.is_empty() {
        push_attr(&mut video, "progressive", &progressive);
    }
    push_positive(&mut video, opts, options::VIDEO_HEIGHT, "yres");
    push_positive(&mut video, opts, options::VIDEO_WIDTH, "xres");

    if audio.is_empty() && video.is_empty() {
        return None;
    }

    Some(format!(
        "<ndi_format><audio_format{}/><video_format{}/></ndi_format>",
        audio, video
    ))
}

/// Custom metadata to send, trimmed, or `None` if blank
pub fn custom_metadata(config: &PlayerConfig) -> Option<&str> {
    let trimmed = config.custom_metadata.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
