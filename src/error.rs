//! Error types
//!
//! Only connection establishment and invalid input surface as errors from
//! player operations. Per-frame failures (poll errors, conversion errors,
//! sink re-initialization failures) are logged and the frame is dropped.

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Open argument is empty or lacks the `ndi://` scheme
    #[error("invalid media url: {0:?}")]
    InvalidUrl(String),

    /// Transport could not create a receiver for the source
    #[error("failed to connect to source {source_name}: {reason}")]
    ConnectionFailed {
        source_name: String,
        reason: TransportError,
    },

    /// Transport-level failure
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A sink rejected a format change
    #[error("{0} sink rejected format change")]
    SinkReinitFailed(&'static str),

    /// Frame conversion failure
    #[error(transparent)]
    Media(#[from] MediaError),

    /// Seek, scrub, loop, non-unit rate and non-zero track indices
    #[error("operation not supported: {0}")]
    Unsupported(&'static str),

    /// Media source settings are unusable
    #[error("invalid media source: {0}")]
    InvalidSource(String),

    /// Configuration could not be parsed
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Errors reported by a [`Transport`](crate::transport::Transport) or
/// [`Receiver`](crate::transport::Receiver)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Receiver creation was refused
    #[error("receiver creation rejected: {0}")]
    Rejected(String),

    /// A single capture call failed
    #[error("capture failed: {0}")]
    Poll(String),

    /// The side channel refused a metadata message
    #[error("connection metadata rejected: {0}")]
    MetadataRejected(String),

    /// The receiver is no longer usable
    #[error("receiver disconnected")]
    Disconnected,
}

/// Frame conversion errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaError {
    /// Planar audio buffer is smaller than its declared layout
    #[error("audio buffer too short: need {needed} bytes, have {available}")]
    TruncatedAudio { needed: usize, available: usize },

    /// Channel count, sample count or channel stride is unusable
    #[error("invalid audio format: {0}")]
    InvalidAudioFormat(String),
}
