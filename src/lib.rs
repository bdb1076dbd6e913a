//! NDI media player core
//!
//! Receive-side playback of a single network audio/video source: open an
//! `ndi://` URL, poll frames on the caller's schedule and push them into
//! audio, texture and metadata sinks.
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use ndi_media_rs::{MediaOptions, MediaPlayer, MemoryTransport, PlayerConfig};
//!
//! let transport = MemoryTransport::new();
//! let _source = transport.publish("STUDIO (Camera 1)");
//!
//! let player = MediaPlayer::new(PlayerConfig::default(), Arc::new(transport));
//! player.open("ndi://STUDIO (Camera 1)", &MediaOptions::new())?;
//!
//! // Driver loop
//! player.tick_audio_and_metadata(Duration::from_millis(16));
//! player.tick_video(Duration::from_millis(16));
//! # Ok::<(), ndi_media_rs::Error>(())
//! ```
//!
//! # Modules
//!
//! - [`player`]: session lifecycle, state machine, ticks and the audio sampler
//! - [`transport`]: receiver abstraction and the in-process loopback transport
//! - [`sink`]: presentation sink contracts implemented by the host
//! - [`media`]: audio and video frame conversion
//! - [`stats`]: receiver and session counters

pub mod error;
pub mod media;
pub mod player;
pub mod sink;
pub mod stats;
pub mod transport;

#[cfg(test)]
mod testing;

pub use error::{Error, MediaError, Result, TransportError};
pub use player::{
    MediaEvent, MediaOptions, MediaPlayer, MediaSource, MediaState, PlayerConfig, TrackType,
};
pub use sink::{AudioSink, BinarySink, Dimensions, TextureSink, TextureSinkFormat, TextureSinkMode};
pub use stats::PlayerStats;
pub use transport::{MemorySource, MemoryTransport, Receiver, ReceiverHandle, Transport};
