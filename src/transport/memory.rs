//! In-process loopback transport
//!
//! `MemoryTransport` routes frames published on named in-process sources to
//! every receiver connected to that name. It is used by the test suite and the
//! demo, and is handy for embedding the player without a network stack.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<Registry>
//!                 ┌──────────────────────────┐
//!                 │ sources: HashMap<Key,    │
//!                 │   SourceEntry {          │
//!                 │     online,              │
//!                 │     receivers: [Weak],   │
//!                 │     side channel inbox,  │
//!                 │   }                      │
//!                 │ >                        │
//!                 └────────────┬─────────────┘
//!                              │
//!        ┌─────────────────────┼─────────────────────┐
//!        ▼                     ▼                     ▼
//!   [MemorySource]      [MemoryReceiver]      [MemoryReceiver]
//!   send_video() ──►    queues per kind       queues per kind
//! ```
//!
//! Receivers may connect before the source is published; they report zero
//! connections until it comes online. Each receiver has a bounded queue per
//! frame kind; when a queue is full the oldest frame is dropped and counted.
//! Payloads are `Bytes`, so fan-out clones share one allocation.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::Duration;

use crate::error::TransportError;
use crate::stats::{FrameCounts, Performance};

use super::frame::{AudioFrame, Frame, FrameKind, MetadataFrame, VideoFrame};
use super::source::ReceiverSettings;
use super::{Receiver, Transport};

/// Default per-kind queue capacity of a receiver
pub const DEFAULT_QUEUE_CAPACITY: usize = 32;

/// In-process transport
#[derive(Clone)]
pub struct MemoryTransport {
    registry: Arc<Registry>,
}

struct Registry {
    sources: RwLock<HashMap<String, Arc<SourceEntry>>>,
    accepting: AtomicBool,
    outstanding: AtomicUsize,
    queue_capacity: usize,
}

struct SourceEntry {
    key: String,
    online: AtomicBool,
    receivers: Mutex<Vec<Weak<ReceiverShared>>>,
    connection_metadata: Mutex<Vec<String>>,
}

impl SourceEntry {
    fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            online: AtomicBool::new(false),
            receivers: Mutex::new(Vec::new()),
            connection_metadata: Mutex::new(Vec::new()),
        }
    }

    /// Live receivers, pruning dropped ones
    fn live_receivers(&self) -> Vec<Arc<ReceiverShared>> {
        let mut receivers = lock(&self.receivers);
        receivers.retain(|r| r.strong_count() > 0);
        receivers.iter().filter_map(Weak::upgrade).collect()
    }
}

#[derive(Default)]
struct Queues {
    video: VecDeque<VideoFrame>,
    audio: VecDeque<AudioFrame>,
    metadata: VecDeque<MetadataFrame>,
    performance: Performance,
    fail_next: Vec<FrameKind>,
}

struct ReceiverShared {
    settings: ReceiverSettings,
    capacity: usize,
    queues: Mutex<Queues>,
}

impl ReceiverShared {
    fn accepts(&self, kind: FrameKind) -> bool {
        match kind {
            FrameKind::Video => self.settings.bandwidth.carries_video(),
            FrameKind::Audio => self.settings.bandwidth.carries_audio(),
            FrameKind::Metadata => true,
        }
    }

    fn push(&self, frame: Frame) -> bool {
        let Some(kind) = frame.kind() else {
            return false;
        };
        if !self.accepts(kind) {
            return false;
        }

        let mut q = lock(&self.queues);
        q.performance.total.add(kind, 1);

        let capacity = self.capacity;
        let dropped = match frame {
            Frame::Video(f) => push_bounded(&mut q.video, f, capacity),
            Frame::Audio(f) => push_bounded(&mut q.audio, f, capacity),
            Frame::Metadata(f) => push_bounded(&mut q.metadata, f, capacity),
            Frame::None => false,
        };
        if dropped {
            q.performance.dropped.add(kind, 1);
        }
        true
    }
}

fn push_bounded<T>(queue: &mut VecDeque<T>, item: T, capacity: usize) -> bool {
    let mut dropped = false;
    if queue.len() >= capacity.max(1) {
        queue.pop_front();
        dropped = true;
    }
    queue.push_back(item);
    dropped
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemoryTransport {
    /// Create a transport with the default queue capacity
    pub fn new() -> Self {
        Self::with_queue_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    /// Create a transport with a custom per-kind queue capacity
    pub fn with_queue_capacity(queue_capacity: usize) -> Self {
        Self {
            registry: Arc::new(Registry {
                sources: RwLock::new(HashMap::new()),
                accepting: AtomicBool::new(true),
                outstanding: AtomicUsize::new(0),
                queue_capacity,
            }),
        }
    }

    /// Publish a source under `key` (a source name or `host:port` endpoint)
    ///
    /// The source is online until the returned handle is dropped.
    pub fn publish(&self, key: impl Into<String>) -> MemorySource {
        let key = key.into();
        let entry = self.entry(&key);
        entry.online.store(true, Ordering::SeqCst);

        tracing::debug!(source = %key, "Memory source published");

        MemorySource { entry }
    }

    /// Refuse (or accept again) new receivers
    pub fn set_accepting(&self, accepting: bool) {
        self.registry.accepting.store(accepting, Ordering::SeqCst);
    }

    /// Frames captured but not yet released, across all receivers
    pub fn outstanding_frames(&self) -> usize {
        self.registry.outstanding.load(Ordering::SeqCst)
    }

    /// Number of known source keys
    pub fn source_count(&self) -> usize {
        self.registry
            .sources
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .len()
    }

    fn entry(&self, key: &str) -> Arc<SourceEntry> {
        if let Some(entry) = self
            .registry
            .sources
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(key)
        {
            return Arc::clone(entry);
        }

        let mut sources = self
            .registry
            .sources
            .write()
            .unwrap_or_else(|p| p.into_inner());
        Arc::clone(
            sources
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(SourceEntry::new(key))),
        )
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MemoryTransport {
    fn connect(&self, settings: &ReceiverSettings) -> Result<Arc<dyn Receiver>, TransportError> {
        if !self.registry.accepting.load(Ordering::SeqCst) {
            return Err(TransportError::Rejected(
                "transport is not accepting receivers".into(),
            ));
        }

        let key = settings.source.as_str();
        if key.trim().is_empty() {
            return Err(TransportError::Rejected("empty source".into()));
        }

        let entry = self.entry(key);
        let shared = Arc::new(ReceiverShared {
            settings: settings.clone(),
            capacity: self.registry.queue_capacity,
            queues: Mutex::new(Queues::default()),
        });
        lock(&entry.receivers).push(Arc::downgrade(&shared));

        tracing::debug!(
            source = %key,
            online = entry.online.load(Ordering::SeqCst),
            "Memory receiver connected"
        );

        Ok(Arc::new(MemoryReceiver {
            shared,
            entry,
            registry: Arc::clone(&self.registry),
        }))
    }
}

/// Receiver created by [`MemoryTransport`]
pub struct MemoryReceiver {
    shared: Arc<ReceiverShared>,
    entry: Arc<SourceEntry>,
    registry: Arc<Registry>,
}

impl Receiver for MemoryReceiver {
    fn capture(&self, kind: FrameKind, _timeout: Duration) -> Result<Frame, TransportError> {
        let mut q = lock(&self.shared.queues);

        if let Some(pos) = q.fail_next.iter().position(|k| *k == kind) {
            q.fail_next.remove(pos);
            return Err(TransportError::Poll(format!("injected {} capture failure", kind)));
        }

        let frame = match kind {
            FrameKind::Video => q.video.pop_front().map(Frame::Video),
            FrameKind::Audio => q.audio.pop_front().map(Frame::Audio),
            FrameKind::Metadata => q.metadata.pop_front().map(Frame::Metadata),
        };

        match frame {
            Some(frame) => {
                self.registry.outstanding.fetch_add(1, Ordering::SeqCst);
                Ok(frame)
            }
            None => Ok(Frame::None),
        }
    }

    fn release(&self, frame: &Frame) {
        if frame.is_data() {
            let _ = self
                .registry
                .outstanding
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        }
    }

    fn connection_count(&self) -> u32 {
        u32::from(self.entry.online.load(Ordering::SeqCst))
    }

    fn add_connection_metadata(&self, metadata: &MetadataFrame) -> Result<(), TransportError> {
        let text = String::from_utf8_lossy(&metadata.data).into_owned();
        lock(&self.entry.connection_metadata).push(text);
        Ok(())
    }

    fn performance(&self) -> Performance {
        lock(&self.shared.queues).performance
    }

    fn queue_depth(&self) -> FrameCounts {
        let q = lock(&self.shared.queues);
        FrameCounts {
            audio: q.audio.len() as u64,
            video: q.video.len() as u64,
            metadata: q.metadata.len() as u64,
        }
    }
}

/// Publishing side of an in-process source
pub struct MemorySource {
    entry: Arc<SourceEntry>,
}

impl MemorySource {
    /// Source key
    pub fn key(&self) -> &str {
        &self.entry.key
    }

    /// Deliver a video frame to all receivers; returns how many accepted it
    pub fn send_video(&self, frame: VideoFrame) -> usize {
        self.fan_out(Frame::Video(frame))
    }

    /// Deliver an audio frame to all receivers; returns how many accepted it
    pub fn send_audio(&self, frame: AudioFrame) -> usize {
        self.fan_out(Frame::Audio(frame))
    }

    /// Deliver a metadata frame to all receivers; returns how many accepted it
    pub fn send_metadata(&self, frame: MetadataFrame) -> usize {
        self.fan_out(Frame::Metadata(frame))
    }

    fn fan_out(&self, frame: Frame) -> usize {
        if !self.is_online() {
            return 0;
        }
        self.entry
            .live_receivers()
            .iter()
            .filter(|r| r.push(frame.clone()))
            .count()
    }

    /// Make the next capture of `kind` fail on every connected receiver
    pub fn fail_next_capture(&self, kind: FrameKind) {
        for receiver in self.entry.live_receivers() {
            lock(&receiver.queues).fail_next.push(kind);
        }
    }

    /// Side-channel messages sent by receivers, oldest first
    pub fn connection_metadata(&self) -> Vec<String> {
        lock(&self.entry.connection_metadata).clone()
    }

    /// Number of live receivers connected to this source
    pub fn receiver_count(&self) -> usize {
        self.entry.live_receivers().len()
    }

    /// Take the source on or off the air
    pub fn set_online(&self, online: bool) {
        self.entry.online.store(online, Ordering::SeqCst);
    }

    /// Check whether the source is on the air
    pub fn is_online(&self) -> bool {
        self.entry.online.load(Ordering::SeqCst)
    }
}

impl Drop for MemorySource {
    fn drop(&mut self) {
        self.entry.online.store(false, Ordering::SeqCst);
        tracing::debug!(source = %self.entry.key, "Memory source withdrawn");
    }
}
