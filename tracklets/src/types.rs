//! Appearance descriptors and the tracklet output record

use chrono::{DateTime, Utc};
use persontrack::Bbox;
use serde::{Deserialize, Serialize};

/// Type and colour of one garment region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GarmentDescriptor {
    #[serde(rename = "type")]
    pub garment_type: String,
    pub color: String,
    /// Dominant colour in CIELAB
    pub lab: [f32; 3],
    /// Normalized per-channel LAB histogram
    pub histogram: Vec<f32>,
    pub confidence: f32,
}

impl GarmentDescriptor {
    pub fn new<S: Into<String>>(garment_type: S, color: S, confidence: f32) -> Self {
        Self {
            garment_type: garment_type.into(),
            color: color.into(),
            lab: [50.0, 0.0, 0.0],
            histogram: Vec::new(),
            confidence,
        }
    }

    pub fn summary(&self) -> GarmentSummary {
        GarmentSummary {
            garment_type: self.garment_type.clone(),
            color: self.color.clone(),
        }
    }
}

/// Outfit split into top, bottom and shoes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutfitDescriptor {
    pub top: GarmentDescriptor,
    pub bottom: GarmentDescriptor,
    pub shoes: GarmentDescriptor,
    /// Overall analysis quality in [0, 1]
    pub overall_quality: f32,
}

impl OutfitDescriptor {
    pub fn summary(&self) -> OutfitSummary {
        OutfitSummary {
            top: self.top.summary(),
            bottom: self.bottom.summary(),
            shoes: self.shoes.summary(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GarmentSummary {
    #[serde(rename = "type")]
    pub garment_type: String,
    pub color: String,
}

/// Categorical outfit view used in flat records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutfitSummary {
    pub top: GarmentSummary,
    pub bottom: GarmentSummary,
    pub shoes: GarmentSummary,
}

/// Coarse, uncalibrated height class from pixel box height
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeightCategory {
    Short,
    Medium,
    Tall,
}

impl HeightCategory {
    pub fn from_height(mean_height: f32, short_below: f32, tall_above: f32) -> Self {
        if mean_height < short_below {
            HeightCategory::Short
        } else if mean_height > tall_above {
            HeightCategory::Tall
        } else {
            HeightCategory::Medium
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HeightCategory::Short => "short",
            HeightCategory::Medium => "medium",
            HeightCategory::Tall => "tall",
        }
    }
}

/// One person's continuous presence in one camera
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tracklet {
    pub track_id: u64,
    pub camera_id: String,
    pub mall_id: String,

    /// Timestamp of the first appearance sample
    pub t_in: DateTime<Utc>,
    /// Timestamp of the last appearance sample
    pub t_out: DateTime<Utc>,
    pub duration_seconds: f64,

    pub bbox_sequence: Vec<Bbox>,
    pub frame_sequence: Vec<u64>,
    pub avg_bbox: Bbox,

    pub outfit: OutfitDescriptor,
    /// Unit-norm mean of the sampled embeddings
    pub visual_embedding: Option<Vec<f32>>,

    pub height_category: HeightCategory,
    pub aspect_ratio: f32,

    /// Mean detection confidence over the track's lifetime
    pub confidence: f32,
    pub quality: f32,
    pub num_observations: usize,

    pub created_at: DateTime<Utc>,
}

impl Tracklet {
    /// Flatten into the export record
    pub fn to_record(&self) -> TrackletRecord {
        TrackletRecord {
            track_id: self.track_id,
            camera_id: self.camera_id.clone(),
            mall_id: self.mall_id.clone(),
            t_in: self.t_in,
            t_out: self.t_out,
            duration_seconds: self.duration_seconds,
            avg_bbox: self.avg_bbox.to_bounds(),
            outfit: self.outfit.summary(),
            visual_embedding: self.visual_embedding.clone().unwrap_or_default(),
            height_category: self.height_category,
            aspect_ratio: self.aspect_ratio,
            confidence: self.confidence,
            quality: self.quality,
            num_observations: self.num_observations,
            created_at: self.created_at,
        }
    }
}

/// Flat serialization form of a [`Tracklet`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackletRecord {
    pub track_id: u64,
    pub camera_id: String,
    pub mall_id: String,
    pub t_in: DateTime<Utc>,
    pub t_out: DateTime<Utc>,
    pub duration_seconds: f64,
    pub avg_bbox: [f32; 4],
    pub outfit: OutfitSummary,
    /// Empty when no embedding was sampled
    pub visual_embedding: Vec<f32>,
    pub height_category: HeightCategory,
    pub aspect_ratio: f32,
    pub confidence: f32,
    pub quality: f32,
    pub num_observations: usize,
    pub created_at: DateTime<Utc>,
}

/// Telemetry for the surrounding job tracker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Tracks in state Tracked
    pub active_tracks: usize,
    /// Tracks waiting to be recovered
    pub lost_tracks: usize,
    /// Tracklets produced so far, taken or not
    pub finalized_tracklets: usize,
    pub frames_processed: u64,
}
