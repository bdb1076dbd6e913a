//! Player configuration

use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::transport::source::DEFAULT_LOCAL_HOST_TOKEN;

/// Player configuration options
///
/// Loadable from TOML; missing keys take their defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Short product name sent to senders on connect
    pub product_name: String,

    /// Long product name sent to senders on connect
    pub product_description: String,

    /// Manufacturer sent to senders on connect
    pub manufacturer: String,

    /// Product version sent to senders on connect
    pub version: String,

    /// Serial number sent to senders on connect
    pub serial_number: String,

    /// Session name sent to senders on connect
    pub session_name: String,

    /// Extra metadata sent verbatim (after trimming) on connect
    pub custom_metadata: String,

    /// Receiver name announced to the transport (empty = transport default)
    pub receiver_name: String,

    /// Source name prefix replaced by the computer name
    pub local_host_token: String,

    /// Computer name override (empty = resolve from the OS)
    pub computer_name: String,

    /// Capture timeout for tick and sampler polls, in milliseconds
    pub poll_timeout_ms: u64,

    /// Period of the background audio sampler, in milliseconds
    pub sampler_interval_ms: u64,

    /// Audio frames drained per sampler period
    pub max_audio_frames_per_tick: usize,

    /// Skip playback state transitions while no audio sink is attached
    pub gate_state_on_audio_sink: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            product_name: "NdiMedia".into(),
            product_description: "NDI media player".into(),
            manufacturer: String::new(),
            version: env!("CARGO_PKG_VERSION").into(),
            serial_number: String::new(),
            session_name: String::new(),
            custom_metadata: String::new(),
            receiver_name: String::new(),
            local_host_token: DEFAULT_LOCAL_HOST_TOKEN.into(),
            computer_name: String::new(),
            poll_timeout_ms: 0,
            sampler_interval_ms: 5,
            max_audio_frames_per_tick: 4,
            gate_state_on_audio_sink: false,
        }
    }
}

impl PlayerConfig {
    /// Parse a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Set product identification
    pub fn product(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.product_name = name.into();
        self.product_description = description.into();
        self
    }

    /// Set manufacturer
    pub fn manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = manufacturer.into();
        self
    }

    /// Set product version
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Set serial number
    pub fn serial_number(mut self, serial: impl Into<String>) -> Self {
        self.serial_number = serial.into();
        self
    }

    /// Set session name
    pub fn session_name(mut self, name: impl Into<String>) -> Self {
        self.session_name = name.into();
        self
    }

    /// Set custom connection metadata
    pub fn custom_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.custom_metadata = metadata.into();
        self
    }

    /// Set receiver name
    pub fn receiver_name(mut self, name: impl Into<String>) -> Self {
        self.receiver_name = name.into();
        self
    }

    /// Set local host token
    pub fn local_host_token(mut self, token: impl Into<String>) -> Self {
        self.local_host_token = token.into();
        self
    }

    /// Override the computer name
    pub fn computer_name(mut self, name: impl Into<String>) -> Self {
        self.computer_name = name.into();
        self
    }

    /// Set capture timeout
    pub fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set background sampler period
    pub fn sampler_interval(mut self, interval: Duration) -> Self {
        self.sampler_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Set audio frames drained per sampler period
    pub fn max_audio_frames_per_tick(mut self, max: usize) -> Self {
        self.max_audio_frames_per_tick = max.max(1);
        self
    }

    /// Gate state transitions on audio sink presence
    pub fn gate_state_on_audio_sink(mut self, gate: bool) -> Self {
        self.gate_state_on_audio_sink = gate;
        self
    }

    /// Capture timeout
    pub fn poll_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    /// Background sampler period
    pub fn sampler_interval_duration(&self) -> Duration {
        Duration::from_millis(self.sampler_interval_ms.max(1))
    }

    /// Computer name used for local-host substitution
    ///
    /// Falls back to the OS host name, then to `"localhost"`.
    pub fn resolve_computer_name(&self) -> String {
        if !self.computer_name.is_empty() {
            return self.computer_name.clone();
        }
        hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| "localhost".into())
    }
}
