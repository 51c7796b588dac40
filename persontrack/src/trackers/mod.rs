//! Multi-object trackers and their configuration

mod bytetrack;

pub use bytetrack::ByteTracker;

use serde::{Deserialize, Serialize};

/// Configuration for the three-stage IoU tracker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Confidence splitting high from low detections
    pub track_thresh: f32,
    /// Minimum IoU for stage-1 association
    pub match_thresh: f32,
    /// Misses after which a track is removed for good
    pub track_buffer: u32,
    /// Detections smaller than this many square pixels are discarded
    pub min_box_area: f32,
    /// Hits needed to promote a New track
    pub confirm_hits: u32,
    /// Misses after which a confirmed track becomes Lost
    pub lost_after: u32,
    /// Capacity of the per-track history windows
    pub history_len: usize,
    /// Stage-2 threshold as a fraction of `match_thresh`
    pub low_match_ratio: f32,
    /// Stage-3 threshold as a fraction of `match_thresh`
    pub recovery_match_ratio: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            track_thresh: 0.6,
            match_thresh: 0.5,
            track_buffer: 10,
            min_box_area: 100.0,
            confirm_hits: 3,
            lost_after: 3,
            history_len: 30,
            low_match_ratio: 0.8,
            recovery_match_ratio: 0.7,
        }
    }
}

impl TrackerConfig {
    #[inline]
    pub fn low_match_thresh(&self) -> f32 {
        self.match_thresh * self.low_match_ratio
    }

    #[inline]
    pub fn recovery_match_thresh(&self) -> f32 {
        self.match_thresh * self.recovery_match_ratio
    }
}
