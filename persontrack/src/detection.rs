use serde::{Deserialize, Serialize};

use crate::bbox::Bbox;
use crate::error::TrackError;

/// One person observation in one camera frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Box in image pixel coordinates [x1, y1, x2, y2]
    pub bbox: Bbox,
    #[serde(alias = "p")]
    pub confidence: f32,
    /// Caller-assigned, monotonic frame number
    pub frame_id: u64,
}

impl Detection {
    pub fn new(bbox: Bbox, confidence: f32, frame_id: u64) -> Self {
        Self {
            bbox,
            confidence,
            frame_id,
        }
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.bbox.area()
    }

    /// Check the detector contract: finite, non-degenerate box and confidence in [0, 1]
    pub fn validate(&self) -> Result<(), TrackError> {
        if !self.bbox.is_valid() {
            return Err(TrackError::invalid_detection(format!(
                "malformed box {} in frame {}",
                self.bbox, self.frame_id
            )));
        }

        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(TrackError::invalid_detection(format!(
                "confidence {} outside [0, 1] in frame {}",
                self.confidence, self.frame_id
            )));
        }

        Ok(())
    }
}
