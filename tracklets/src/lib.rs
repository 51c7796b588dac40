//! Tracklet generation for single-camera CCTV footage
//!
//! Turns a camera's frame sequence into tracklets: quality-scored records of one
//! person's continuous presence, carrying an aggregated outfit description, a
//! mean-pooled appearance embedding and coarse physique estimates. Detection,
//! garment analysis and embedding extraction are pluggable collaborators.

pub mod assembler;
pub mod cache;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod garment;
pub mod generator;
pub mod storage;
pub mod streams;
pub mod types;

pub use assembler::TrackletAssembler;
pub use cache::{AppearanceCache, AppearanceSample, TrackAppearance};
pub use collaborators::{
    validate_embedding, EmbeddingExtractor, GarmentAnalyzer, PersonDetection, PersonDetector,
};
pub use config::PipelineConfig;
pub use error::{Result, TrackletError};
pub use garment::HeuristicGarmentAnalyzer;
pub use generator::TrackletGenerator;
pub use storage::{
    pack_embedding, unpack_embedding, JsonLinesSink, MemorySink, TrackletRow, TrackletSink,
};
pub use streams::{run_camera, run_cameras, CameraJob, CameraStats, Frame, FrameSource};
pub use types::{
    GarmentDescriptor, HeightCategory, OutfitDescriptor, Progress, Tracklet, TrackletRecord,
};

/// Get library version information
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
