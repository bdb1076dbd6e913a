//! Frame transport binding
//!
//! The player does not implement source discovery or the wire protocol. It
//! talks to a [`Transport`] that creates [`Receiver`]s, and each receiver
//! hands out type-discriminated frames from bounded, non-blocking capture
//! calls.
//!
//! # Frame ownership
//!
//! A captured frame belongs to the receiver until it is released. The
//! [`ReceiverHandle::capture`] wrapper returns a [`FrameLease`] that releases
//! the frame exactly once when it goes out of scope, whatever branch the
//! caller takes.
//!
//! ```text
//!   ReceiverHandle::capture(kind, timeout)
//!          │
//!          ▼
//!     FrameLease ──deref──► Frame::{None, Video, Audio, Metadata}
//!          │
//!          └── drop ──► Receiver::release(&frame)
//! ```

pub mod frame;
pub mod memory;
pub mod source;

use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use crate::error::TransportError;
use crate::stats::{FrameCounts, Performance};

pub use frame::{
    AudioFrame, FourCc, Frame, FrameFormat, FrameKind, MetadataFrame, Timecode, VideoFrame,
};
pub use memory::{MemorySource, MemoryTransport};
pub use source::{Bandwidth, ColorFormat, ReceiverSettings, SourceDescriptor};

/// Factory for receivers
pub trait Transport: Send + Sync {
    /// Create a receiver connected (or connecting) to `settings.source`
    ///
    /// Receivers may be created before the source is reachable; liveness is
    /// reported later through [`Receiver::connection_count`].
    fn connect(&self, settings: &ReceiverSettings) -> Result<Arc<dyn Receiver>, TransportError>;
}

/// A connected receive endpoint
///
/// Implementations must be safe to capture from several threads at once,
/// one frame kind per thread.
pub trait Receiver: Send + Sync {
    /// Capture the next frame of `kind`, waiting at most `timeout`
    ///
    /// Returns `Frame::None` when nothing of that kind is available. Frames of
    /// other kinds stay queued.
    fn capture(&self, kind: FrameKind, timeout: Duration) -> Result<Frame, TransportError>;

    /// Return a captured frame to the receiver
    fn release(&self, frame: &Frame);

    /// Number of active connections to the sender
    fn connection_count(&self) -> u32;

    /// Send an out-of-band metadata message to the sender
    fn add_connection_metadata(&self, metadata: &MetadataFrame) -> Result<(), TransportError>;

    /// Total and dropped frame counters
    fn performance(&self) -> Performance;

    /// Frames currently waiting in the receive queues
    fn queue_depth(&self) -> FrameCounts;
}

/// Shared handle to a receiver
///
/// Cloning is cheap. Two handles are equal if they refer to the same
/// receiver instance.
#[derive(Clone)]
pub struct ReceiverHandle {
    inner: Arc<dyn Receiver>,
}

impl ReceiverHandle {
    /// Wrap a receiver created by a transport
    pub fn new(inner: Arc<dyn Receiver>) -> Self {
        Self { inner }
    }

    /// Capture one frame of `kind` and lease it
    pub fn capture(&self, kind: FrameKind, timeout: Duration) -> Result<FrameLease<'_>, TransportError> {
        let frame = self.inner.capture(kind, timeout)?;
        Ok(FrameLease {
            receiver: self.inner.as_ref(),
            frame,
        })
    }

    /// Check whether the sender is currently connected
    pub fn is_connected(&self) -> bool {
        self.inner.connection_count() > 0
    }

    /// Number of active connections to the sender
    pub fn connection_count(&self) -> u32 {
        self.inner.connection_count()
    }

    /// Send a text message over the side channel
    pub fn send_metadata(&self, metadata: &str, timecode: Timecode) -> Result<(), TransportError> {
        self.inner
            .add_connection_metadata(&MetadataFrame::text(metadata, timecode))
    }

    /// Total and dropped frame counters
    pub fn performance(&self) -> Performance {
        self.inner.performance()
    }

    /// Frames waiting in the receive queues
    pub fn queue_depth(&self) -> FrameCounts {
        self.inner.queue_depth()
    }

    /// Check whether two handles refer to the same receiver
    pub fn ptr_eq(&self, other: &ReceiverHandle) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.inner), Arc::as_ptr(&other.inner))
    }
}

impl std::fmt::Debug for ReceiverHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiverHandle")
            .field("ptr", &Arc::as_ptr(&self.inner).cast::<()>())
            .finish()
    }
}

impl PartialEq for ReceiverHandle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

/// A captured frame that is released back to its receiver on drop
pub struct FrameLease<'a> {
    receiver: &'a dyn Receiver,
    frame: Frame,
}

impl FrameLease<'_> {
    /// The leased frame
    pub fn frame(&self) -> &Frame {
        &self.frame
    }
}

impl Deref for FrameLease<'_> {
    type Target = Frame;

    fn deref(&self) -> &Frame {
        &self.frame
    }
}

impl Drop for FrameLease<'_> {
    fn drop(&mut self) {
        if self.frame.is_data() {
            self.receiver.release(&self.frame);
        }
    }
}

impl std::fmt::Debug for FrameLease<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameLease").field("frame", &self.frame).finish()
    }
}
