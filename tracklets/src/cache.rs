//! Per-track appearance samples kept while a track is alive

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use log::warn;
use persontrack::Bbox;

use crate::error::{Result, TrackletError};
use crate::types::OutfitDescriptor;

/// One sampling event: everything observed for a track at one frame
#[derive(Debug, Clone, PartialEq)]
pub struct AppearanceSample {
    pub outfit: OutfitDescriptor,
    /// Missing when extraction is disabled or failed for this crop
    pub embedding: Option<Vec<f32>>,
    pub frame_id: u64,
    pub timestamp: DateTime<Utc>,
    pub bbox: Bbox,
}

/// Samples of one track in sampling order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackAppearance {
    samples: Vec<AppearanceSample>,
}

impl TrackAppearance {
    pub fn samples(&self) -> &[AppearanceSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn last_frame_id(&self) -> Option<u64> {
        self.samples.last().map(|s| s.frame_id)
    }

    pub fn embeddings(&self) -> impl Iterator<Item = &[f32]> {
        self.samples.iter().filter_map(|s| s.embedding.as_deref())
    }
}

impl FromIterator<AppearanceSample> for TrackAppearance {
    fn from_iter<I: IntoIterator<Item = AppearanceSample>>(iter: I) -> Self {
        Self {
            samples: iter.into_iter().collect(),
        }
    }
}

/// Appearance samples keyed by live track id
#[derive(Debug, Clone)]
pub struct AppearanceCache {
    entries: HashMap<u64, TrackAppearance>,
    sample_stride: u64,
    /// Dimensionality fixed by the first embedding seen
    embedding_dim: Option<usize>,
}

impl AppearanceCache {
    pub fn new(sample_stride: u64) -> Self {
        Self {
            entries: HashMap::new(),
            sample_stride: sample_stride.max(1),
            embedding_dim: None,
        }
    }

    /// First sample of a track, or at least `sample_stride` frames since the last one
    pub fn is_due(&self, track_id: u64, frame_id: u64) -> bool {
        match self.entries.get(&track_id).and_then(|e| e.last_frame_id()) {
            None => true,
            Some(last) => frame_id.saturating_sub(last) >= self.sample_stride,
        }
    }

    fn check_dimension(&mut self, embedding: &[f32]) -> Result<()> {
        match self.embedding_dim {
            None => {
                self.embedding_dim = Some(embedding.len());
                Ok(())
            }
            Some(expected) if expected != embedding.len() => {
                Err(TrackletError::DimensionMismatch {
                    expected,
                    actual: embedding.len(),
                })
            }
            Some(_) => Ok(()),
        }
    }

    /// Append a sample, creating the entry on first use
    ///
    /// An embedding whose length differs from previously recorded ones is dropped
    /// and the rest of the sample kept.
    pub fn record(&mut self, track_id: u64, mut sample: AppearanceSample) {
        if let Some(embedding) = sample.embedding.as_deref() {
            if let Err(e) = self.check_dimension(embedding) {
                warn!("Dropping embedding for track {}: {}", track_id, e);
                sample.embedding = None;
            }
        }

        self.entries.entry(track_id).or_default().samples.push(sample);
    }

    pub fn get(&self, track_id: u64) -> Option<&TrackAppearance> {
        self.entries.get(&track_id)
    }

    /// Remove and return a track's samples
    pub fn take(&mut self, track_id: u64) -> Option<TrackAppearance> {
        self.entries.remove(&track_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.embedding_dim = None;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::GarmentDescriptor;
    use chrono::TimeZone;

    pub(crate) fn outfit(top_color: &str) -> OutfitDescriptor {
        OutfitDescriptor {
            top: GarmentDescriptor::new("shirt", top_color, 0.8),
            bottom: GarmentDescriptor::new("jeans", "blue", 0.7),
            shoes: GarmentDescriptor::new("sneakers", "white", 0.7),
            overall_quality: 0.8,
        }
    }

    pub(crate) fn sample(frame_id: u64, embedding: Option<Vec<f32>>) -> AppearanceSample {
        AppearanceSample {
            outfit: outfit("red"),
            embedding,
            frame_id,
            timestamp: Utc.timestamp_opt(1_700_000_000 + frame_id as i64, 0).unwrap(),
            bbox: Bbox::new(0.0, 0.0, 100.0, 200.0),
        }
    }

    #[test]
    fn test_sampling_stride() {
        let mut cache = AppearanceCache::new(3);
        assert!(cache.is_due(7, 1));
        cache.record(7, sample(1, None));
        assert!(!cache.is_due(7, 2));
        assert!(!cache.is_due(7, 3));
        assert!(cache.is_due(7, 4));
        assert!(cache.is_due(8, 2));
    }

    #[test]
    fn test_dimension_mismatch_drops_embedding_only() {
        let mut cache = AppearanceCache::new(3);
        cache.record(1, sample(1, Some(vec![1.0, 0.0])));
        cache.record(1, sample(4, Some(vec![1.0, 0.0, 0.0])));

        let entry = cache.get(1).unwrap();
        assert_eq!(entry.len(), 2);
        assert_eq!(entry.embeddings().count(), 1);
        assert_eq!(entry.last_frame_id(), Some(4));
    }

    #[test]
    fn test_take_removes_entry() {
        let mut cache = AppearanceCache::new(3);
        cache.record(1, sample(1, None));
        assert_eq!(cache.take(1).map(|e| e.len()), Some(1));
        assert!(cache.take(1).is_none());
        assert!(cache.is_empty());
    }
}
