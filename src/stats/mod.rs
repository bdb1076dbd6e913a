//! Diagnostics counters
//!
//! Receiver-side counters come from the transport; session-side counters are
//! owned by the player session and reset on close.

pub mod metrics;

pub use metrics::{FrameCounts, Performance, PlayerStats, SessionCounters};
