//! Statistics and metrics for player sessions

use std::fmt;

use crate::transport::FrameKind;

/// Per-kind frame counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameCounts {
    /// Audio frames
    pub audio: u64,
    /// Video frames
    pub video: u64,
    /// Metadata frames
    pub metadata: u64,
}

impl FrameCounts {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter for one frame kind
    pub fn get(&self, kind: FrameKind) -> u64 {
        match kind {
            FrameKind::Audio => self.audio,
            FrameKind::Video => self.video,
            FrameKind::Metadata => self.metadata,
        }
    }

    /// Increment the counter for one frame kind
    pub fn add(&mut self, kind: FrameKind, n: u64) {
        match kind {
            FrameKind::Audio => self.audio += n,
            FrameKind::Video => self.video += n,
            FrameKind::Metadata => self.metadata += n,
        }
    }

    /// Sum over all kinds
    pub fn total(&self) -> u64 {
        self.audio + self.video + self.metadata
    }
}

/// Receiver performance counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Performance {
    /// Frames received from the sender
    pub total: FrameCounts,
    /// Frames the receiver discarded
    pub dropped: FrameCounts,
}

/// Counters kept by the player session itself
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionCounters {
    /// Interleaved audio samples forwarded to the audio sink
    pub samples_received: u64,
    /// Audio frames forwarded to the audio sink
    pub audio_frames_played: u64,
    /// Video frames pushed to the texture sink
    pub video_frames_displayed: u64,
    /// Metadata frames forwarded to the binary sink
    pub metadata_frames_processed: u64,
    /// Frames dropped because a sink rejected a format change
    pub sink_reinit_failures: u64,
    /// Frames dropped because they could not be converted
    pub conversion_failures: u64,
}

impl SessionCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all counters
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Snapshot returned by the diagnostics query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerStats {
    /// Frames received per kind
    pub total: FrameCounts,
    /// Frames dropped by the receiver per kind
    pub dropped: FrameCounts,
    /// Frames waiting in the receive queues per kind
    pub queued: FrameCounts,
    /// Counters kept by the session
    pub session: SessionCounters,
}

impl PlayerStats {
    /// Fraction of received video frames the receiver dropped
    pub fn video_drop_ratio(&self) -> f64 {
        let seen = self.total.video + self.dropped.video;
        if seen > 0 {
            self.dropped.video as f64 / seen as f64
        } else {
            0.0
        }
    }
}

fn write_counts(f: &mut fmt::Formatter<'_>, title: &str, counts: &FrameCounts) -> fmt::Result {
    writeln!(f, "{}", title)?;
    writeln!(f, "    Audio: {}", counts.audio)?;
    writeln!(f, "    Video: {}", counts.video)?;
    writeln!(f, "    Metadata: {}", counts.metadata)?;
    writeln!(f)
}

impl fmt::Display for PlayerStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_counts(f, "Total Frames", &self.total)?;
        write_counts(f, "Dropped Frames", &self.dropped)?;
        write_counts(f, "Queue Depth", &self.queued)?;
        writeln!(f, "Session")?;
        writeln!(f, "    Samples: {}", self.session.samples_received)?;
        writeln!(f, "    Displayed: {}", self.session.video_frames_displayed)?;
        writeln!(f, "    Sink Failures: {}", self.session.sink_reinit_failures)
    }
}
