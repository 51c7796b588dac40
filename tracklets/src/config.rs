//! Pipeline configuration

use std::path::Path;

use persontrack::TrackerConfig;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackletError};

/// Configuration for one camera's tracklet pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Camera identifier stamped on every tracklet
    pub camera_id: String,
    /// Mall identifier stamped on every tracklet
    pub mall_id: String,
    pub tracker: TrackerConfig,
    /// Minimum frame gap between two appearance samples of one track
    pub sample_stride: u64,
    /// Tracks with fewer appearance samples produce no tracklet
    pub min_observations: usize,
    /// Run the embedding extractor on sampled crops
    pub extract_embeddings: bool,
    /// Mean box height (px) below which a person is reported short
    pub short_height_below: f32,
    /// Mean box height (px) above which a person is reported tall
    pub tall_height_above: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            camera_id: "camera".to_string(),
            mall_id: "mall".to_string(),
            tracker: TrackerConfig::default(),
            sample_stride: 3,
            min_observations: 2,
            extract_embeddings: true,
            short_height_below: 100.0,
            tall_height_above: 200.0,
        }
    }
}

impl PipelineConfig {
    pub fn new<S: Into<String>>(camera_id: S, mall_id: S) -> Self {
        Self {
            camera_id: camera_id.into(),
            mall_id: mall_id.into(),
            ..Default::default()
        }
    }

    /// Load and validate a configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_stride == 0 {
            return Err(TrackletError::config("sample_stride must be at least 1"));
        }

        if self.min_observations < 2 {
            return Err(TrackletError::config(format!(
                "min_observations must be at least 2, got {}",
                self.min_observations
            )));
        }

        let t = &self.tracker;
        let unit_fields = [
            ("track_thresh", t.track_thresh),
            ("match_thresh", t.match_thresh),
            ("low_match_ratio", t.low_match_ratio),
            ("recovery_match_ratio", t.recovery_match_ratio),
        ];
        for (name, value) in unit_fields {
            if !(0.0..=1.0).contains(&value) {
                return Err(TrackletError::config(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        if t.confirm_hits == 0 || t.history_len == 0 {
            return Err(TrackletError::config(
                "confirm_hits and history_len must be positive",
            ));
        }

        if self.short_height_below > self.tall_height_above {
            return Err(TrackletError::config(format!(
                "short_height_below ({}) exceeds tall_height_above ({})",
                self.short_height_below, self.tall_height_above
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::new("cam-1", "mall-1");
        assert!(config.validate().is_ok());
        assert_eq!(config.sample_stride, 3);
        assert_eq!(config.tracker.track_buffer, 10);
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = PipelineConfig::default();
        config.sample_stride = 0;
        assert!(matches!(config.validate(), Err(TrackletError::Config(_))));

        let mut config = PipelineConfig::default();
        config.min_observations = 1;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.tracker.match_thresh = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{"camera_id":"entrance","tracker":{"track_buffer":20}}"#,
        )
        .unwrap();
        assert_eq!(config.camera_id, "entrance");
        assert_eq!(config.mall_id, "mall");
        assert_eq!(config.tracker.track_buffer, 20);
        assert_eq!(config.tracker.match_thresh, 0.5);
    }

    #[test]
    fn test_from_json_file() {
        let path = std::env::temp_dir().join("tracklets_config_test.json");
        std::fs::write(&path, r#"{"camera_id":"c9","sample_stride":5}"#).unwrap();
        let config = PipelineConfig::from_json_file(&path).unwrap();
        assert_eq!(config.sample_stride, 5);
        std::fs::remove_file(&path).ok();
    }
}
