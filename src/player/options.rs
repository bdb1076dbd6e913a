//! Open options and media sources
//!
//! [`MediaOptions`] is the key/value bag passed to
//! [`MediaPlayer::open`](crate::player::MediaPlayer::open). [`MediaSource`] is a
//! typed description of a stream that produces a URL plus the matching
//! options.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::transport::source::URL_SCHEME;
use crate::transport::{Bandwidth, ColorFormat};

/// Receive color format code
pub const COLOR_FORMAT: &str = "ColorFormat";
/// Receive bandwidth code
pub const BANDWIDTH: &str = "Bandwidth";
/// Preferred audio channel count
pub const AUDIO_CHANNELS: &str = "AudioChannels";
/// Preferred audio sample rate
pub const AUDIO_SAMPLE_RATE: &str = "AudioSampleRate";
/// Preferred frame rate numerator
pub const FRAME_RATE_N: &str = "FrameRateN";
/// Preferred frame rate denominator
pub const FRAME_RATE_D: &str = "FrameRateD";
/// Preferred scan structure, `"true"` or `"false"`
pub const PROGRESSIVE: &str = "Progressive";
/// Preferred video width
pub const VIDEO_WIDTH: &str = "VideoWidth";
/// Preferred video height
pub const VIDEO_HEIGHT: &str = "VideoHeight";

/// A single option value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Int(i64),
    Str(String),
}

/// Key/value options for opening a stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaOptions {
    values: HashMap<String, OptionValue>,
}

impl MediaOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an integer option
    pub fn int(mut self, key: impl Into<String>, value: i64) -> Self {
        self.values.insert(key.into(), OptionValue::Int(value));
        self
    }

    /// Set a string option
    pub fn string(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), OptionValue::Str(value.into()));
        self
    }

    /// Insert or replace an option
    pub fn set(&mut self, key: impl Into<String>, value: OptionValue) {
        self.values.insert(key.into(), value);
    }

    /// Check whether an option is present
    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Integer value of an option, `None` if missing or unparsable
    pub fn try_get_int(&self, key: &str) -> Option<i64> {
        match self.values.get(key)? {
            OptionValue::Int(v) => Some(*v),
            OptionValue::Str(s) => s.trim().parse().ok(),
        }
    }

    /// Integer value of an option
    ///
    /// String values are parsed; unparsable or missing options yield `default`.
    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        self.try_get_int(key).unwrap_or(default)
    }

    /// String value of an option
    pub fn get_str(&self, key: &str, default: &str) -> String {
        match self.values.get(key) {
            Some(OptionValue::Str(s)) => s.clone(),
            Some(OptionValue::Int(v)) => v.to_string(),
            None => default.to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Bandwidth a media source asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceBandwidth {
    /// Highest quality audio and video
    #[default]
    Highest,
    /// Lowest quality audio and video
    Lowest,
    /// Audio stream only
    AudioOnly,
}

impl From<SourceBandwidth> for Bandwidth {
    fn from(bandwidth: SourceBandwidth) -> Self {
        match bandwidth {
            SourceBandwidth::Highest => Bandwidth::Highest,
            SourceBandwidth::Lowest => Bandwidth::Lowest,
            SourceBandwidth::AudioOnly => Bandwidth::AudioOnly,
        }
    }
}

/// Color format a media source asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceColorFormat {
    Bgra,
    #[default]
    Uyvy,
}

impl From<SourceColorFormat> for ColorFormat {
    fn from(format: SourceColorFormat) -> Self {
        match format {
            SourceColorFormat::Bgra => ColorFormat::BgrxBgra,
            SourceColorFormat::Uyvy => ColorFormat::UyvyBgra,
        }
    }
}

/// Preferred scan structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameFormatPreference {
    #[default]
    NoPreference,
    Fielded,
    Progressive,
}

/// Typed description of a stream to play
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSource {
    /// Desired bandwidth
    pub bandwidth: SourceBandwidth,

    /// Desired color format of received video
    pub color_format: SourceColorFormat,

    /// `host:port` of the sender; preferred over the name when set
    pub source_endpoint: String,

    /// Sender name, i.e. `"MACHINE (Source)"`
    pub source_name: String,

    /// Preferred channel count (0 = no preference)
    pub preferred_audio_channels: u32,

    /// Preferred sample rate (0 = no preference)
    pub preferred_audio_sample_rate: u32,

    /// Preferred width (0 = no preference)
    pub preferred_video_width: u32,

    /// Preferred height (0 = no preference)
    pub preferred_video_height: u32,

    /// Preferred frame rate numerator (0 = no preference)
    pub preferred_frame_rate_n: u32,

    /// Preferred frame rate denominator (0 = no preference)
    pub preferred_frame_rate_d: u32,

    /// Preferred scan structure
    pub preferred_frame_format: FrameFormatPreference,
}

impl Default for MediaSource {
    fn default() -> Self {
        Self {
            bandwidth: SourceBandwidth::Highest,
            color_format: SourceColorFormat::Uyvy,
            source_endpoint: String::new(),
            source_name: String::new(),
            preferred_audio_channels: 2,
            preferred_audio_sample_rate: 48000,
            preferred_video_width: 0,
            preferred_video_height: 0,
            preferred_frame_rate_n: 0,
            preferred_frame_rate_d: 0,
            preferred_frame_format: FrameFormatPreference::NoPreference,
        }
    }
}

impl MediaSource {
    /// Source addressed by name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            source_name: name.into(),
            ..Default::default()
        }
    }

    /// Source addressed by `host:port`
    pub fn endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            source_endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    pub fn bandwidth(mut self, bandwidth: SourceBandwidth) -> Self {
        self.bandwidth = bandwidth;
        self
    }

    pub fn color_format(mut self, format: SourceColorFormat) -> Self {
        self.color_format = format;
        self
    }

    /// Set preferred audio format
    pub fn audio(mut self, channels: u32, sample_rate: u32) -> Self {
        self.preferred_audio_channels = channels;
        self.preferred_audio_sample_rate = sample_rate;
        self
    }

    /// Set preferred video size
    pub fn video_size(mut self, width: u32, height: u32) -> Self {
        self.preferred_video_width = width;
        self.preferred_video_height = height;
        self
    }

    /// Set preferred frame rate as a fraction
    pub fn frame_rate(mut self, numerator: u32, denominator: u32) -> Self {
        self.preferred_frame_rate_n = numerator;
        self.preferred_frame_rate_d = denominator;
        self
    }

    pub fn frame_format(mut self, preference: FrameFormatPreference) -> Self {
        self.preferred_frame_format = preference;
        self
    }

    /// Stream URL, from the endpoint if set, else from the name
    pub fn url(&self) -> String {
        if self.source_endpoint.is_empty() {
            format!("{}{}", URL_SCHEME, self.source_name)
        } else {
            format!("{}{}", URL_SCHEME, self.source_endpoint)
        }
    }

    /// Check that the source can be opened
    pub fn validate(&self) -> Result<()> {
        if self.source_endpoint.trim().is_empty() && self.source_name.trim().is_empty() {
            return Err(Error::InvalidSource(
                "neither source endpoint nor source name is set".into(),
            ));
        }
        Ok(())
    }

    /// Open options for this source
    pub fn options(&self) -> MediaOptions {
        let mut options = MediaOptions::new()
            .int(COLOR_FORMAT, ColorFormat::from(self.color_format).code())
            .int(BANDWIDTH, Bandwidth::from(self.bandwidth).code())
            .int(AUDIO_CHANNELS, self.preferred_audio_channels as i64)
            .int(AUDIO_SAMPLE_RATE, self.preferred_audio_sample_rate as i64)
            .int(FRAME_RATE_N, self.preferred_frame_rate_n as i64)
            .int(FRAME_RATE_D, self.preferred_frame_rate_d as i64)
            .int(VIDEO_WIDTH, self.preferred_video_width as i64)
            .int(VIDEO_HEIGHT, self.preferred_video_height as i64);

        match self.preferred_frame_format {
            FrameFormatPreference::NoPreference => {}
            FrameFormatPreference::Fielded => options.set(PROGRESSIVE, OptionValue::Str("false".into())),
            FrameFormatPreference::Progressive => options.set(PROGRESSIVE, OptionValue::Str("true".into())),
        }

        options
    }
}
