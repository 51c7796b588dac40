//! Track entity and its lifecycle state machine

use serde::{Deserialize, Serialize};

use crate::bbox::Bbox;
use crate::detection::Detection;
use crate::history::History;

/// Lifecycle of a track
///
/// `New -> Tracked` after enough hits, `Tracked -> Lost` after a short miss streak,
/// `Lost -> Tracked` on any match, and everything ends in `Removed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackState {
    New,
    Tracked,
    Lost,
    Removed,
}

impl TrackState {
    /// New or Tracked, i.e. part of the live set
    #[inline]
    pub fn is_live(self) -> bool {
        matches!(self, TrackState::New | TrackState::Tracked)
    }

    #[inline]
    pub fn is_confirmed(self) -> bool {
        self == TrackState::Tracked
    }
}

#[derive(Debug, Clone)]
pub struct Track {
    /// Camera-local id, never reused
    pub track_id: u64,
    pub state: TrackState,
    /// Latest matched box
    pub bbox: Bbox,
    /// Latest matched confidence
    pub confidence: f32,
    /// Frame of the latest match
    pub frame_id: u64,
    /// Number of tracker updates this track has lived through, starting at 1
    pub age: u32,
    /// Number of matched detections, starting at 1
    pub hits: u32,
    /// Consecutive updates without a match
    pub time_since_update: u32,
    bbox_history: History<Bbox>,
    confidence_history: History<f32>,
    frame_history: History<u64>,
    /// Lifetime sum of matched confidences, not bounded by the history window
    confidence_sum: f64,
}

impl Track {
    /// Spawn a tentative track from an unmatched detection
    pub fn new(track_id: u64, det: &Detection, history_len: usize) -> Self {
        let mut track = Track {
            track_id,
            state: TrackState::New,
            bbox: det.bbox,
            confidence: det.confidence,
            frame_id: det.frame_id,
            age: 1,
            hits: 1,
            time_since_update: 0,
            bbox_history: History::with_capacity(history_len),
            confidence_history: History::with_capacity(history_len),
            frame_history: History::with_capacity(history_len),
            confidence_sum: det.confidence as f64,
        };
        track.record(det);
        track
    }

    fn record(&mut self, det: &Detection) {
        self.bbox_history.push(det.bbox);
        self.confidence_history.push(det.confidence);
        self.frame_history.push(det.frame_id);
    }

    /// Advance one tracker update
    #[inline]
    pub fn tick(&mut self) {
        self.age += 1;
    }

    /// Apply a matched detection
    ///
    /// Panics if the track has already been removed.
    pub fn update(&mut self, det: &Detection, confirm_hits: u32) {
        assert!(
            self.state != TrackState::Removed,
            "track {} updated after removal",
            self.track_id
        );

        self.bbox = det.bbox;
        self.confidence = det.confidence;
        self.frame_id = det.frame_id;
        self.hits += 1;
        self.time_since_update = 0;
        self.confidence_sum += det.confidence as f64;
        self.record(det);

        match self.state {
            TrackState::Lost => self.state = TrackState::Tracked,
            TrackState::New if self.hits >= confirm_hits => self.state = TrackState::Tracked,
            _ => {}
        }
    }

    /// Register a frame without a match and apply the miss transitions
    pub fn mark_missed(&mut self, lost_after: u32, track_buffer: u32) {
        self.time_since_update += 1;

        self.state = match self.state {
            TrackState::New if self.time_since_update > lost_after => TrackState::Removed,
            TrackState::Tracked | TrackState::Lost if self.time_since_update > track_buffer => {
                TrackState::Removed
            }
            TrackState::Tracked if self.time_since_update > lost_after => TrackState::Lost,
            state => state,
        };
    }

    #[inline]
    pub fn mark_removed(&mut self) {
        self.state = TrackState::Removed;
    }

    /// Matched in the most recent tracker update
    #[inline]
    pub fn is_fresh(&self) -> bool {
        self.time_since_update == 0
    }

    /// Mean matched confidence over the whole lifetime
    pub fn average_confidence(&self) -> f32 {
        (self.confidence_sum / self.hits.max(1) as f64) as f32
    }

    /// Mean box over the retained history window
    pub fn average_bbox(&self) -> Bbox {
        Bbox::mean(self.bbox_history.iter()).unwrap_or(self.bbox)
    }

    /// Fraction of updates that carried a match, in (0, 1]
    pub fn stability(&self) -> f32 {
        (self.hits as f32 / self.age.max(1) as f32).min(1.0)
    }

    pub fn bbox_history(&self) -> &History<Bbox> {
        &self.bbox_history
    }

    pub fn confidence_history(&self) -> &History<f32> {
        &self.confidence_history
    }

    pub fn frame_history(&self) -> &History<u64> {
        &self.frame_history
    }
}
