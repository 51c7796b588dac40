//! IoU-based person tracking for low frame rate CCTV footage
//!
//! This crate turns per-frame person detections into persistent track identities
//! for a single camera. It is Kalman-free: association relies purely on box overlap,
//! which holds up at 1 FPS where motion models have little to predict from.
//!
//! # Three-stage association
//!
//! 1. High-confidence detections are matched against live tracks.
//! 2. Low-confidence detections keep already confirmed tracks alive.
//! 3. Remaining high-confidence detections recover recently lost tracks.
//!
//! ```rust,ignore
//! use persontrack::{Bbox, ByteTracker, Detection, TrackerConfig};
//!
//! let mut tracker = ByteTracker::new(TrackerConfig::default());
//! let detections = vec![Detection::new(Bbox::new(10.0, 10.0, 110.0, 210.0), 0.9, 1)];
//! let confirmed = tracker.update(&detections);
//! for track in tracker.take_removed() {
//!     // hand the retired track over for tracklet assembly
//! }
//! ```

pub mod bbox;
pub mod detection;
pub mod error;
pub mod history;
pub mod hungarian; // Hungarian algorithm for optimal assignment
pub mod track;
pub mod trackers;

pub use bbox::{calculate_iou, ious, Bbox};
pub use detection::Detection;
pub use error::TrackError;
pub use history::History;
pub use hungarian::{iou_cost_matrix, AssignmentResult, HungarianSolver};
pub use track::{Track, TrackState};
pub use trackers::{ByteTracker, TrackerConfig};
