//! ByteTrack-style association without a motion model
//!
//! Boxes are matched on raw IoU against the last observed position, which suits
//! footage sampled at around 1 FPS where a velocity estimate is mostly noise.

use log::{debug, info, trace, warn};

use crate::bbox::{ious, Bbox};
use crate::detection::Detection;
use crate::hungarian::{iou_cost_matrix, AssignmentResult, HungarianSolver};
use crate::track::{Track, TrackState};
use crate::trackers::TrackerConfig;

#[derive(Debug, Clone)]
pub struct ByteTracker {
    config: TrackerConfig,
    /// New and Tracked tracks
    tracked: Vec<Track>,
    lost: Vec<Track>,
    /// Retired since the last `take_removed`
    removed: Vec<Track>,
    next_id: u64,
    frame_id: u64,
}

/// Minimum `1 - IoU` assignment between two box sets, keeping pairs with IoU >= `iou_threshold`
fn associate(det_boxes: &[Bbox], track_boxes: &[Bbox], iou_threshold: f32) -> AssignmentResult {
    let cost = iou_cost_matrix(ious(det_boxes, track_boxes).view());
    HungarianSolver::solve(cost.view(), 1.0 - iou_threshold)
}

impl ByteTracker {
    pub fn new(config: TrackerConfig) -> Self {
        ByteTracker {
            config,
            tracked: Vec::new(),
            lost: Vec::new(),
            removed: Vec::new(),
            next_id: 1,
            frame_id: 0,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    fn advance_frame(&mut self) -> u64 {
        self.frame_id += 1;
        self.frame_id
    }

    fn allocate_track_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;

        assert!(
            !self
                .tracked
                .iter()
                .chain(&self.lost)
                .any(|t| t.track_id == id),
            "duplicate track id {id}"
        );

        id
    }

    /// Validate, drop small boxes and split by confidence
    fn split_detections(&self, detections: &[Detection]) -> (Vec<Detection>, Vec<Detection>) {
        let mut high = Vec::new();
        let mut low = Vec::new();

        for det in detections {
            if let Err(e) = det.validate() {
                warn!("Skipping detection: {}", e);
                continue;
            }

            if det.area() < self.config.min_box_area {
                trace!(
                    "Dropping detection {} with area {:.1} below {:.1}",
                    det.bbox,
                    det.area(),
                    self.config.min_box_area
                );
                continue;
            }

            if det.confidence >= self.config.track_thresh {
                high.push(*det);
            } else {
                low.push(*det);
            }
        }

        (high, low)
    }

    /// Process one frame of detections
    ///
    /// Returns the confirmed tracks after association. Tracks retired during this
    /// update are collected for [`ByteTracker::take_removed`].
    pub fn update(&mut self, detections: &[Detection]) -> Vec<&Track> {
        let frame_id = self.advance_frame();
        let (high, low) = self.split_detections(detections);

        for track in self.tracked.iter_mut().chain(self.lost.iter_mut()) {
            track.tick();
        }

        let confirm_hits = self.config.confirm_hits;
        let mut high_used = vec![false; high.len()];
        let mut low_used = vec![false; low.len()];
        let mut tracked_matched = vec![false; self.tracked.len()];
        let mut lost_matched = vec![false; self.lost.len()];

        // Stage 1: high-confidence detections against New and Tracked tracks
        let high_boxes: Vec<Bbox> = high.iter().map(|d| d.bbox).collect();
        let track_boxes: Vec<Bbox> = self.tracked.iter().map(|t| t.bbox).collect();
        let stage1 = associate(&high_boxes, &track_boxes, self.config.match_thresh);
        for &(d, t) in &stage1.assignments {
            assert!(!high_used[d], "detection {d} matched twice in frame {frame_id}");
            assert!(!tracked_matched[t], "track matched twice in frame {frame_id}");
            high_used[d] = true;
            tracked_matched[t] = true;
            self.tracked[t].update(&high[d], confirm_hits);
        }

        // Stage 2: low-confidence detections keep confirmed tracks alive
        let pool: Vec<usize> = (0..self.tracked.len())
            .filter(|&t| !tracked_matched[t] && self.tracked[t].state.is_confirmed())
            .collect();
        let low_boxes: Vec<Bbox> = low.iter().map(|d| d.bbox).collect();
        let pool_boxes: Vec<Bbox> = pool.iter().map(|&t| self.tracked[t].bbox).collect();
        let stage2 = associate(&low_boxes, &pool_boxes, self.config.low_match_thresh());
        for &(d, p) in &stage2.assignments {
            let t = pool[p];
            assert!(!low_used[d], "detection {d} matched twice in frame {frame_id}");
            assert!(!tracked_matched[t], "track matched twice in frame {frame_id}");
            low_used[d] = true;
            tracked_matched[t] = true;
            self.tracked[t].update(&low[d], confirm_hits);
        }

        // Stage 3: leftover high-confidence detections recover lost tracks
        let remaining: Vec<usize> = (0..high.len()).filter(|&d| !high_used[d]).collect();
        let remaining_boxes: Vec<Bbox> = remaining.iter().map(|&d| high[d].bbox).collect();
        let lost_boxes: Vec<Bbox> = self.lost.iter().map(|t| t.bbox).collect();
        let stage3 = associate(
            &remaining_boxes,
            &lost_boxes,
            self.config.recovery_match_thresh(),
        );
        for &(r, t) in &stage3.assignments {
            let d = remaining[r];
            assert!(!high_used[d], "detection {d} matched twice in frame {frame_id}");
            assert!(!lost_matched[t], "track matched twice in frame {frame_id}");
            high_used[d] = true;
            lost_matched[t] = true;
            let track = &mut self.lost[t];
            track.update(&high[d], confirm_hits);
            debug!("Recovered track {} in frame {}", track.track_id, frame_id);
        }

        let (lost_after, track_buffer) = (self.config.lost_after, self.config.track_buffer);
        for (track, matched) in self.tracked.iter_mut().zip(&tracked_matched) {
            if !matched {
                track.mark_missed(lost_after, track_buffer);
            }
        }
        for (track, matched) in self.lost.iter_mut().zip(&lost_matched) {
            if !matched {
                track.mark_missed(lost_after, track_buffer);
            }
        }

        let mut spawned = 0;
        for (d, det) in high.iter().enumerate() {
            if high_used[d] {
                continue;
            }
            let id = self.allocate_track_id();
            debug!("New track {} at {} in frame {}", id, det.bbox, frame_id);
            self.tracked
                .push(Track::new(id, det, self.config.history_len));
            spawned += 1;
        }

        self.repartition();

        debug!(
            "Frame {}: {} high / {} low detections, matched {}+{}+{}, {} new, {} live, {} lost",
            frame_id,
            high.len(),
            low.len(),
            stage1.assignments.len(),
            stage2.assignments.len(),
            stage3.assignments.len(),
            spawned,
            self.tracked.len(),
            self.lost.len()
        );

        self.active_tracks().collect()
    }

    /// Move tracks between the live, lost and removed sets according to their state
    fn repartition(&mut self) {
        let mut still_lost = Vec::with_capacity(self.lost.len());

        for track in self.tracked.drain(..).chain(self.lost.drain(..)).collect::<Vec<_>>() {
            match track.state {
                TrackState::New | TrackState::Tracked => self.tracked.push(track),
                TrackState::Lost => {
                    if track.time_since_update == self.config.lost_after + 1 {
                        debug!("Track {} lost", track.track_id);
                    }
                    still_lost.push(track)
                }
                TrackState::Removed => {
                    debug!(
                        "Track {} removed after {} hits over {} frames",
                        track.track_id, track.hits, track.age
                    );
                    self.removed.push(track)
                }
            }
        }

        self.lost = still_lost;
    }

    /// Hand over tracks retired since the previous call
    pub fn take_removed(&mut self) -> Vec<Track> {
        std::mem::take(&mut self.removed)
    }

    /// Force every remaining track to Removed and hand all of them over
    pub fn drain_all(&mut self) -> Vec<Track> {
        let mut drained = self.take_removed();

        for mut track in self.tracked.drain(..).chain(self.lost.drain(..)) {
            track.mark_removed();
            drained.push(track);
        }

        drained
    }

    /// Forget all tracks and restart id and frame counters
    pub fn reset(&mut self) {
        self.tracked.clear();
        self.lost.clear();
        self.removed.clear();
        self.next_id = 1;
        self.frame_id = 0;
        info!("Tracker reset");
    }

    /// New and Tracked tracks
    pub fn live_tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracked.iter()
    }

    /// Confirmed tracks only
    pub fn active_tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracked.iter().filter(|t| t.state.is_confirmed())
    }

    pub fn lost_tracks(&self) -> impl Iterator<Item = &Track> {
        self.lost.iter()
    }

    /// Live and lost tracks
    pub fn all_tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracked.iter().chain(self.lost.iter())
    }

    pub fn num_active(&self) -> usize {
        self.active_tracks().count()
    }

    /// Number of updates processed since creation or the last reset
    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn person(x: f32, confidence: f32, frame_id: u64) -> Detection {
        Detection::new(Bbox::new(x, 50.0, x + 100.0, 250.0), confidence, frame_id)
    }

    #[test]
    fn test_confirmation_after_three_hits() {
        let mut tracker = ByteTracker::new(TrackerConfig::default());

        assert!(tracker.update(&[person(100.0, 0.9, 1)]).is_empty());
        assert!(tracker.update(&[person(102.0, 0.9, 2)]).is_empty());
        let confirmed = tracker.update(&[person(104.0, 0.9, 3)]);

        assert_eq!(confirmed.len(), 1);
        assert_eq!(confirmed[0].track_id, 1);
        assert_eq!(confirmed[0].hits, 3);
        assert_eq!(tracker.frame_id(), 3);
    }

    #[test]
    fn test_small_and_invalid_detections_are_skipped() {
        let mut tracker = ByteTracker::new(TrackerConfig::default());
        let tiny = Detection::new(Bbox::new(0.0, 0.0, 5.0, 5.0), 0.9, 1);
        let inverted = Detection::new(Bbox::new(50.0, 50.0, 10.0, 10.0), 0.9, 1);

        tracker.update(&[tiny, inverted]);
        assert_eq!(tracker.all_tracks().count(), 0);
    }

    #[test]
    fn test_low_confidence_never_spawns() {
        let mut tracker = ByteTracker::new(TrackerConfig::default());
        tracker.update(&[person(100.0, 0.4, 1)]);
        assert_eq!(tracker.live_tracks().count(), 0);
    }

    #[test]
    fn test_low_confidence_keeps_confirmed_track_alive() {
        let mut tracker = ByteTracker::new(TrackerConfig::default());
        for f in 1..=3 {
            tracker.update(&[person(100.0, 0.9, f)]);
        }
        for f in 4..=10 {
            tracker.update(&[person(100.0, 0.3, f)]);
        }

        let track = tracker.live_tracks().next().unwrap();
        assert_eq!(track.state, TrackState::Tracked);
        assert_eq!(track.hits, 10);
        assert_eq!(track.time_since_update, 0);
    }

    #[test]
    fn test_lost_and_recovered() {
        let mut tracker = ByteTracker::new(TrackerConfig::default());
        for f in 1..=5 {
            tracker.update(&[person(100.0, 0.9, f)]);
        }
        for _ in 0..4 {
            tracker.update(&[]);
        }
        assert_eq!(tracker.lost_tracks().count(), 1);
        assert_eq!(tracker.live_tracks().count(), 0);

        // IoU against the last box is 80/120
        let confirmed = tracker.update(&[person(120.0, 0.9, 10)]);
        assert_eq!(confirmed.len(), 1);
        assert_eq!(confirmed[0].track_id, 1);
        assert_eq!(tracker.lost_tracks().count(), 0);
        assert!(tracker.take_removed().is_empty());
    }

    /// Track 1 confirmed at x = 100, then lost after four empty frames
    fn lost_after_occlusion() -> ByteTracker {
        let mut tracker = ByteTracker::new(TrackerConfig::default());
        for f in 1..=5 {
            tracker.update(&[person(100.0, 0.9, f)]);
        }
        for _ in 0..4 {
            tracker.update(&[]);
        }
        assert_eq!(tracker.lost_tracks().count(), 1);
        tracker
    }

    #[test]
    fn test_recovery_below_primary_threshold() {
        let mut tracker = lost_after_occlusion();

        // IoU 60/140 = 0.43: under match_thresh, over the 0.35 recovery threshold
        let confirmed = tracker.update(&[person(140.0, 0.9, 10)]);
        assert_eq!(confirmed.len(), 1);
        assert_eq!(confirmed[0].track_id, 1);
        assert_eq!(confirmed[0].time_since_update, 0);
        assert_eq!(tracker.lost_tracks().count(), 0);
    }

    #[test]
    fn test_recovery_threshold_is_respected() {
        let mut tracker = lost_after_occlusion();

        // IoU 50/150 = 0.33 spawns a new identity
        tracker.update(&[person(150.0, 0.9, 10)]);
        let new_track = tracker.live_tracks().next().unwrap();
        assert_eq!(new_track.track_id, 2);
        assert_eq!(new_track.state, TrackState::New);

        let lost = tracker.lost_tracks().next().unwrap();
        assert_eq!(lost.track_id, 1);
        assert_eq!(lost.time_since_update, 5);
    }

    #[test]
    fn test_low_confidence_relaxed_threshold() {
        let mut tracker = ByteTracker::new(TrackerConfig::default());
        for f in 1..=3 {
            tracker.update(&[person(100.0, 0.9, f)]);
        }

        // IoU 65/135 = 0.48 with a low-confidence box still matches
        tracker.update(&[person(135.0, 0.3, 4)]);
        let track = tracker.live_tracks().next().unwrap();
        assert_eq!(track.hits, 4);
        assert_eq!(track.time_since_update, 0);
        assert_eq!(track.bbox.xmin, 135.0);

        // IoU 56/144 = 0.39 against the updated box does not
        tracker.update(&[person(179.0, 0.3, 5)]);
        let track = tracker.live_tracks().next().unwrap();
        assert_eq!(track.hits, 4);
        assert_eq!(track.time_since_update, 1);
        assert_eq!(tracker.all_tracks().count(), 1);
    }

    #[test]
    fn test_removal_after_buffer() {
        let mut tracker = ByteTracker::new(TrackerConfig::default());
        for f in 1..=5 {
            tracker.update(&[person(100.0, 0.9, f)]);
        }
        for _ in 0..10 {
            tracker.update(&[]);
            assert!(tracker.take_removed().is_empty());
        }
        tracker.update(&[]);

        let removed = tracker.take_removed();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].state, TrackState::Removed);
        assert_eq!(removed[0].time_since_update, 11);

        tracker.update(&[person(100.0, 0.9, 17)]);
        assert_eq!(tracker.live_tracks().next().unwrap().track_id, 2);
    }

    #[test]
    fn test_unconfirmed_track_removed_directly() {
        let mut tracker = ByteTracker::new(TrackerConfig::default());
        tracker.update(&[person(100.0, 0.9, 1)]);
        for _ in 0..3 {
            tracker.update(&[]);
        }
        assert_eq!(tracker.live_tracks().count(), 1);

        tracker.update(&[]);
        assert_eq!(tracker.lost_tracks().count(), 0);
        assert_eq!(tracker.take_removed().len(), 1);
    }

    #[test]
    fn test_matching_is_one_to_one() {
        let mut tracker = ByteTracker::new(TrackerConfig::default());
        let crowd = |f| {
            vec![
                person(0.0, 0.9, f),
                person(60.0, 0.9, f),
                person(400.0, 0.8, f),
                person(410.0, 0.7, f),
            ]
        };

        for f in 1..=20 {
            tracker.update(&crowd(f));
            let ids: HashSet<u64> = tracker.all_tracks().map(|t| t.track_id).collect();
            assert_eq!(ids.len(), tracker.all_tracks().count());
            for track in tracker.live_tracks() {
                assert!(track.hits <= f as u32);
            }
        }
        assert_eq!(tracker.live_tracks().count(), 4);
        assert!(tracker.live_tracks().all(|t| t.hits == 20));
    }

    #[test]
    fn test_ids_never_reused() {
        let mut tracker = ByteTracker::new(TrackerConfig::default());
        let mut seen = HashSet::new();

        for f in 1..=60u64 {
            // alternate between two far-apart positions so tracks keep spawning
            let x = (f % 2) as f32 * 500.0;
            tracker.update(&[person(x + f as f32 * 3.0, 0.9, f)]);
            for track in tracker.all_tracks() {
                seen.insert(track.track_id);
            }
            for track in tracker.take_removed() {
                seen.insert(track.track_id);
            }
        }

        let max_id = seen.iter().copied().max().unwrap();
        assert_eq!(seen.len() as u64, max_id);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut tracker = ByteTracker::new(TrackerConfig::default());
        for f in 1..=100 {
            tracker.update(&[person(100.0, 0.9, f)]);
        }
        let track = tracker.live_tracks().next().unwrap();
        assert_eq!(track.bbox_history().len(), 30);
        assert_eq!(track.frame_history().iter().next(), Some(&71));
    }

    #[test]
    fn test_drain_and_reset() {
        let mut tracker = ByteTracker::new(TrackerConfig::default());
        for f in 1..=5 {
            tracker.update(&[person(100.0, 0.9, f), person(400.0, 0.9, f)]);
        }
        tracker.update(&[person(100.0, 0.9, 6)]);

        let drained = tracker.drain_all();
        assert_eq!(drained.len(), 2);
        assert!(drained.iter().all(|t| t.state == TrackState::Removed));
        assert_eq!(tracker.all_tracks().count(), 0);

        tracker.reset();
        assert_eq!(tracker.frame_id(), 0);
        tracker.update(&[person(100.0, 0.9, 1)]);
        assert_eq!(tracker.live_tracks().next().unwrap().track_id, 1);
    }
}
