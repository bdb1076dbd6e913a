//! Player event notification
//!
//! Listeners are invoked synchronously on the thread that caused the event,
//! in registration order. The player never holds its session lock while
//! broadcasting, so a listener may call back into the player.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Events raised by a [`MediaPlayer`](crate::player::MediaPlayer)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaEvent {
    /// The set of available tracks changed
    TracksChanged,
    /// A stream was opened
    MediaOpened,
    /// The open stream was closed
    MediaClosed,
    /// Playback entered the playing state
    PlaybackResumed,
    /// Playback left the playing state
    PlaybackSuspended,
}

impl std::fmt::Display for MediaEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MediaEvent::TracksChanged => "TracksChanged",
            MediaEvent::MediaOpened => "MediaOpened",
            MediaEvent::MediaClosed => "MediaClosed",
            MediaEvent::PlaybackResumed => "PlaybackResumed",
            MediaEvent::PlaybackSuspended => "PlaybackSuspended",
        };
        f.write_str(name)
    }
}

/// Handle returned by [`EventListeners::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(MediaEvent) + Send + Sync>;

/// Ordered list of event listeners
#[derive(Default)]
pub struct EventListeners {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
}

impl EventListeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(MediaEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener; returns false if it was not registered
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.lock();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    /// Deliver an event to every listener registered at the time of the call
    pub fn broadcast(&self, event: MediaEvent) {
        // Snapshot so listeners may subscribe or unsubscribe while running
        let snapshot: Vec<Listener> = self.lock().iter().map(|(_, l)| l.clone()).collect();

        tracing::trace!(event = %event, listeners = snapshot.len(), "Broadcasting media event");
        for listener in snapshot {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(ListenerId, Listener)>> {
        self.listeners.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for EventListeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventListeners")
            .field("listeners", &self.len())
            .finish()
    }
}
