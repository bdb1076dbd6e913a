//! Source addressing and receiver creation settings

use crate::error::{Error, Result};

/// URL scheme prefix accepted by the player
pub const URL_SCHEME: &str = "ndi://";

/// Default placeholder that is replaced by the local machine name
pub const DEFAULT_LOCAL_HOST_TOKEN: &str = "localhost";

/// Where a receiver should connect to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceDescriptor {
    /// Direct network endpoint, i.e. `"10.0.0.5:5961"`
    Endpoint(String),
    /// Symbolic source name, i.e. `"MACHINE (Camera 1)"`
    Name(String),
}

impl SourceDescriptor {
    /// Parse the part of a media URL that follows the scheme
    ///
    /// Anything containing `:` is a direct endpoint. Otherwise the string is a
    /// source name; a leading `"<local_host_token> "` is replaced by
    /// `computer_name`.
    pub fn parse(source: &str, local_host_token: &str, computer_name: &str) -> Self {
        if source.contains(':') {
            return SourceDescriptor::Endpoint(source.to_string());
        }

        let prefix = format!("{} ", local_host_token);
        if !local_host_token.is_empty() && source.starts_with(&prefix) {
            let rest = &source[local_host_token.len()..];
            return SourceDescriptor::Name(format!("{}{}", computer_name, rest));
        }

        SourceDescriptor::Name(source.to_string())
    }

    /// Endpoint or name as text
    pub fn as_str(&self) -> &str {
        match self {
            SourceDescriptor::Endpoint(s) | SourceDescriptor::Name(s) => s,
        }
    }

    /// Check whether this is a direct endpoint
    pub fn is_endpoint(&self) -> bool {
        matches!(self, SourceDescriptor::Endpoint(_))
    }
}

impl std::fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Split a media URL into its source part
///
/// Fails with [`Error::InvalidUrl`] for empty input, a missing `ndi://`
/// prefix, or an empty source.
pub fn strip_scheme(url: &str) -> Result<&str> {
    match url.strip_prefix(URL_SCHEME) {
        Some(rest) if !rest.is_empty() => Ok(rest),
        _ => Err(Error::InvalidUrl(url.to_string())),
    }
}

/// Pixel format a receiver asks the sender for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorFormat {
    /// BGRX when opaque, BGRA with alpha
    BgrxBgra,
    /// UYVY when opaque, BGRA with alpha
    #[default]
    UyvyBgra,
    /// RGBX when opaque, RGBA with alpha
    RgbxRgba,
    /// UYVY when opaque, RGBA with alpha
    UyvyRgba,
}

impl ColorFormat {
    /// Map an option code to a color format
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(ColorFormat::BgrxBgra),
            1 => Some(ColorFormat::UyvyBgra),
            2 => Some(ColorFormat::RgbxRgba),
            3 => Some(ColorFormat::UyvyRgba),
            _ => None,
        }
    }

    /// Option code for this color format
    pub fn code(&self) -> i64 {
        match self {
            ColorFormat::BgrxBgra => 0,
            ColorFormat::UyvyBgra => 1,
            ColorFormat::RgbxRgba => 2,
            ColorFormat::UyvyRgba => 3,
        }
    }
}

/// Stream quality requested from the sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Bandwidth {
    MetadataOnly,
    AudioOnly,
    Lowest,
    #[default]
    Highest,
}

impl Bandwidth {
    /// Map an option code to a bandwidth
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            -10 => Some(Bandwidth::MetadataOnly),
            10 => Some(Bandwidth::AudioOnly),
            0 => Some(Bandwidth::Lowest),
            100 => Some(Bandwidth::Highest),
            _ => None,
        }
    }

    /// Option code for this bandwidth
    pub fn code(&self) -> i64 {
        match self {
            Bandwidth::MetadataOnly => -10,
            Bandwidth::AudioOnly => 10,
            Bandwidth::Lowest => 0,
            Bandwidth::Highest => 100,
        }
    }

    /// Whether video frames are delivered at this bandwidth
    pub fn carries_video(&self) -> bool {
        matches!(self, Bandwidth::Lowest | Bandwidth::Highest)
    }

    /// Whether audio frames are delivered at this bandwidth
    pub fn carries_audio(&self) -> bool {
        !matches!(self, Bandwidth::MetadataOnly)
    }
}

/// Everything a transport needs to create a receiver
#[derive(Debug, Clone)]
pub struct ReceiverSettings {
    /// Source to connect to
    pub source: SourceDescriptor,
    /// Requested pixel format
    pub color_format: ColorFormat,
    /// Requested stream quality
    pub bandwidth: Bandwidth,
    /// Deliver fielded video as separate fields
    pub allow_video_fields: bool,
    /// Name this receiver announces to the sender
    pub receiver_name: Option<String>,
}

impl ReceiverSettings {
    /// Settings with defaults for the given source
    pub fn new(source: SourceDescriptor) -> Self {
        Self {
            source,
            color_format: ColorFormat::default(),
            bandwidth: Bandwidth::default(),
            allow_video_fields: true,
            receiver_name: None,
        }
    }

    /// Set the requested color format
    pub fn color(mut self, format: ColorFormat) -> Self {
        self.color_format = format;
        self
    }

    /// Set the requested bandwidth
    pub fn bandwidth(mut self, bandwidth: Bandwidth) -> Self {
        self.bandwidth = bandwidth;
        self
    }

    /// Set whether fielded video is allowed
    pub fn allow_video_fields(mut self, allow: bool) -> Self {
        self.allow_video_fields = allow;
        self
    }

    /// Set the receiver name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.receiver_name = Some(name.into());
        self
    }
}
