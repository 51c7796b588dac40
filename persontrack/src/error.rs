//! Error types for the tracker core

use thiserror::Error;

/// Errors raised while validating tracker input
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackError {
    #[error("Invalid detection: {reason}")]
    InvalidDetection { reason: String },
}

impl TrackError {
    pub fn invalid_detection<S: Into<String>>(reason: S) -> Self {
        Self::InvalidDetection {
            reason: reason.into(),
        }
    }
}
