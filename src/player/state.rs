//! Playback state machine
//!
//! ```text
//!   open ──► Closed ──tick──► Preparing ◄──────► Playing
//!              ▲                 │    no sender     │
//!              │                 ▼                  ▼
//!            close ◄──────── Paused  ◄── set_rate(0.0)
//! ```
//!
//! The state is derived on every audio/metadata tick from two inputs: the
//! paused flag (set through the playback rate) and sender liveness.

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaState {
    /// No stream open, or opened and not ticked yet
    #[default]
    Closed,
    /// Receiver created, waiting for a sender
    Preparing,
    /// Sender connected and frames are being delivered
    Playing,
    /// Paused by rate 0.0
    Paused,
}

impl MediaState {
    /// Check whether frames are being delivered
    pub fn is_playing(&self) -> bool {
        matches!(self, MediaState::Playing)
    }

    pub fn name(&self) -> &'static str {
        match self {
            MediaState::Closed => "Closed",
            MediaState::Preparing => "Preparing",
            MediaState::Playing => "Playing",
            MediaState::Paused => "Paused",
        }
    }
}

impl std::fmt::Display for MediaState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// State a tick should move to
pub fn target_state(paused: bool, live: bool) -> MediaState {
    if paused {
        MediaState::Paused
    } else if live {
        MediaState::Playing
    } else {
        MediaState::Preparing
    }
}
