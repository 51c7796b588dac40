//! Error types for the tracklet pipeline

use thiserror::Error;

/// Result type alias for the tracklet pipeline
pub type Result<T> = std::result::Result<T, TrackletError>;

/// Errors that can occur while generating tracklets
#[derive(Error, Debug)]
pub enum TrackletError {
    #[error("Person detection failed: {0}")]
    Detector(String),

    #[error("Invalid crop: {0}")]
    InvalidCrop(String),

    #[error("Garment analysis failed: {0}")]
    Garment(String),

    #[error("Embedding extraction failed: {0}")]
    Embedding(String),

    #[error("Invalid embedding: {0}")]
    InvalidEmbedding(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid packed buffer of {len} bytes")]
    InvalidBuffer { len: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Other error: {0}")]
    Other(String),
}

impl TrackletError {
    pub fn detector<S: Into<String>>(msg: S) -> Self {
        Self::Detector(msg.into())
    }

    pub fn invalid_crop<S: Into<String>>(msg: S) -> Self {
        Self::InvalidCrop(msg.into())
    }

    pub fn garment<S: Into<String>>(msg: S) -> Self {
        Self::Garment(msg.into())
    }

    pub fn embedding<S: Into<String>>(msg: S) -> Self {
        Self::Embedding(msg.into())
    }

    pub fn invalid_embedding<S: Into<String>>(msg: S) -> Self {
        Self::InvalidEmbedding(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    pub fn other<S: Into<String>>(msg: S) -> Self {
        Self::Other(msg.into())
    }
}
