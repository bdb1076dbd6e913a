//! Audio sampler
//!
//! Audio is polled on its own schedule, separate from the video and metadata
//! ticks. The sampler holds an optional association with a receiver and one
//! callback. While associated, each poll captures one audio frame and hands
//! it to the callback; the frame is released as soon as the callback returns.
//!
//! ```text
//!   MediaPlayer ──set_receiver(Some/None)──► watch::Sender<Option<ReceiverHandle>>
//!                                                   │
//!                             ┌─────────────────────┴──────────────┐
//!                             ▼                                    ▼
//!                    sample_once() (manual)             spawn() polling task
//!                             │                         (parks while None)
//!                             └──► capture(Audio) ──► callback(&handle, &frame)
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::transport::{AudioFrame, Frame, FrameKind, ReceiverHandle};

/// Shortest polling interval of a spawned sampler
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Callback invoked for every sampled audio frame
///
/// Receives the handle the frame was captured from so that frames from a
/// receiver that has since been replaced can be told apart.
pub type SampleCallback = Arc<dyn Fn(&ReceiverHandle, &AudioFrame) + Send + Sync>;

/// Independent audio polling context
pub struct AudioSampler {
    association: watch::Sender<Option<ReceiverHandle>>,
    callback: Mutex<Option<SampleCallback>>,
    timeout: Duration,
}

impl AudioSampler {
    /// Create an unassociated sampler that polls with `timeout`
    pub fn new(timeout: Duration) -> Self {
        let (association, _) = watch::channel(None);
        Self {
            association,
            callback: Mutex::new(None),
            timeout,
        }
    }

    /// Swap the receiver this sampler polls; `None` stops polling
    pub fn set_receiver(&self, receiver: Option<ReceiverHandle>) {
        let changed = {
            let current = self.association.borrow();
            *current != receiver
        };
        if changed {
            tracing::trace!(associated = receiver.is_some(), "Audio sampler association changed");
            self.association.send_replace(receiver);
        }
    }

    /// Receiver currently associated, if any
    pub fn receiver(&self) -> Option<ReceiverHandle> {
        self.association.borrow().clone()
    }

    /// Check whether the sampler is polling a receiver
    pub fn is_associated(&self) -> bool {
        self.association.borrow().is_some()
    }

    /// Bind the callback, replacing any previous one
    pub fn on_samples<F>(&self, callback: F)
    where
        F: Fn(&ReceiverHandle, &AudioFrame) + Send + Sync + 'static,
    {
        *self.lock_callback() = Some(Arc::new(callback));
    }

    /// Remove the callback
    pub fn unbind(&self) {
        *self.lock_callback() = None;
    }

    /// Poll one audio frame and deliver it
    ///
    /// Returns true if a frame was captured. Without an association nothing is
    /// polled.
    pub fn sample_once(&self) -> bool {
        let Some(receiver) = self.receiver() else {
            return false;
        };

        let lease = match receiver.capture(FrameKind::Audio, self.timeout) {
            Ok(lease) => lease,
            Err(e) => {
                tracing::debug!(error = %e, "Failed to receive audio frame");
                return false;
            }
        };

        let Frame::Audio(frame) = lease.frame() else {
            return false;
        };

        // Clone out so the callback runs without the callback lock held
        let callback = self.lock_callback().clone();
        if let Some(callback) = callback {
            callback(&receiver, frame);
        }
        true
    }

    /// Run the polling loop as a background task
    ///
    /// Every `interval` (at least [`MIN_INTERVAL`]) the task drains up to
    /// `max_per_tick` frames. It parks while unassociated and exits once the
    /// sampler is dropped.
    pub fn spawn(self: &Arc<Self>, interval: Duration, max_per_tick: usize) -> JoinHandle<()> {
        let sampler = Arc::downgrade(self);
        let mut association = self.association.subscribe();
        let max_per_tick = max_per_tick.max(1);
        let interval = interval.max(MIN_INTERVAL);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                if association.borrow_and_update().is_none() {
                    // Sender lives in the sampler, so an error means it was dropped
                    if association.changed().await.is_err() {
                        break;
                    }
                    continue;
                }

                ticker.tick().await;

                let Some(sampler) = sampler.upgrade() else {
                    break;
                };
                for _ in 0..max_per_tick {
                    if !sampler.sample_once() {
                        break;
                    }
                }
            }

            tracing::trace!("Audio sampler task stopped");
        })
    }

    fn lock_callback(&self) -> std::sync::MutexGuard<'_, Option<SampleCallback>> {
        self.callback.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for AudioSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioSampler")
            .field("associated", &self.is_associated())
            .field("timeout", &self.timeout)
            .finish()
    }
}
