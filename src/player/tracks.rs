//! Track enumeration
//!
//! An open stream exposes exactly one audio, one metadata and one video
//! track, all at index 0. Every other track type is empty.

use super::session::Session;
use crate::error::{Error, Result};
use crate::sink::Dimensions;

/// Kind of media track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackType {
    Audio,
    Caption,
    Metadata,
    Subtitle,
    Text,
    Video,
}

impl TrackType {
    /// Check whether streams carry a track of this type
    pub fn is_supported(&self) -> bool {
        matches!(self, TrackType::Audio | TrackType::Metadata | TrackType::Video)
    }
}

impl Session {
    fn has_track(&self, track_type: TrackType, index: usize) -> bool {
        self.is_open() && track_type.is_supported() && index == 0
    }

    pub fn num_tracks(&self, track_type: TrackType) -> usize {
        if self.is_open() && track_type.is_supported() {
            1
        } else {
            0
        }
    }

    /// Selected track as reported to callers
    ///
    /// Open streams always report track 0 for supported types, whatever was
    /// passed to [`select_track`](Self::select_track).
    pub fn selected_track(&self, track_type: TrackType) -> Option<usize> {
        self.has_track(track_type, 0).then_some(0)
    }

    /// Raw selection state that drives delivery
    pub fn track_selection(&self, track_type: TrackType) -> Option<usize> {
        match track_type {
            TrackType::Audio => self.selected_audio,
            TrackType::Metadata => self.selected_metadata,
            TrackType::Video => self.selected_video,
            _ => None,
        }
    }

    /// Select track 0 or deselect with `None`
    pub fn select_track(&mut self, track_type: TrackType, index: Option<usize>) -> Result<()> {
        if index.is_some_and(|i| i != 0) {
            return Err(Error::Unsupported("track index other than 0"));
        }

        match track_type {
            TrackType::Audio => self.selected_audio = index,
            TrackType::Metadata => self.selected_metadata = index,
            TrackType::Video => self.selected_video = index,
            _ => return Err(Error::Unsupported("track type")),
        }
        Ok(())
    }

    pub fn track_display_name(&self, track_type: TrackType, index: usize) -> &'static str {
        if !self.has_track(track_type, index) {
            return "";
        }
        match track_type {
            TrackType::Audio => "Audio Track",
            TrackType::Metadata => "Metadata Track",
            TrackType::Video => "Video Track",
            _ => "",
        }
    }

    pub fn track_language(&self, track_type: TrackType, index: usize) -> &'static str {
        if self.has_track(track_type, index) {
            "und"
        } else {
            ""
        }
    }

    pub fn audio_track_channels(&self, index: usize) -> u32 {
        if self.has_track(TrackType::Audio, index) {
            self.audio_format.channels
        } else {
            0
        }
    }

    pub fn audio_track_sample_rate(&self, index: usize) -> u32 {
        if self.has_track(TrackType::Audio, index) {
            self.audio_format.sample_rate
        } else {
            0
        }
    }

    pub fn video_track_dimensions(&self, index: usize) -> Dimensions {
        if self.has_track(TrackType::Video, index) {
            self.video_format.dimensions
        } else {
            Dimensions::ZERO
        }
    }

    pub fn video_track_frame_rate(&self, index: usize) -> f32 {
        if self.has_track(TrackType::Video, index) {
            self.video_format.frame_rate
        } else {
            0.0
        }
    }
}
