//! Capability traits for the external models the pipeline consumes
//!
//! The pipeline never looks inside these collaborators; any implementation that
//! honours the contracts below can be plugged in, from ONNX models to heuristics.
use image::RgbImage;
use persontrack::Bbox;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackletError};
use crate::types::OutfitDescriptor;

/// Raw detector output for class "person"
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PersonDetection {
    pub bbox: Bbox,
    pub confidence: f32,
}

/// Finds people in a full frame
pub trait PersonDetector: Send + Sync {
    fn detect(&self, frame: &RgbImage) -> Result<Vec<PersonDetection>>;

    /// Get the detector name (for logging/debugging)
    fn name(&self) -> &str {
        "person-detector"
    }
}

/// Describes the outfit visible in a person crop
///
/// Undersized crops should degrade to a low-confidence descriptor; errors are
/// reserved for structurally invalid input.
pub trait GarmentAnalyzer: Send + Sync {
    fn analyze(&self, crop: &RgbImage) -> Result<OutfitDescriptor>;
}

/// Produces an L2-normalized appearance vector for a person crop
pub trait EmbeddingExtractor: Send + Sync {
    fn extract(&self, crop: &RgbImage) -> Result<Vec<f32>>;
}

/// Reject embeddings containing NaN/Inf or with zero norm
pub fn validate_embedding(embedding: &[f32]) -> Result<()> {
    if embedding.is_empty() {
        return Err(TrackletError::invalid_embedding("empty vector"));
    }

    if let Some(pos) = embedding.iter().position(|v| !v.is_finite()) {
        return Err(TrackletError::invalid_embedding(format!(
            "non-finite value at index {}",
            pos
        )));
    }

    let norm_sq: f32 = embedding.iter().map(|v| v * v).sum();
    if norm_sq <= f32::EPSILON {
        return Err(TrackletError::invalid_embedding("zero norm"));
    }

    Ok(())
}
