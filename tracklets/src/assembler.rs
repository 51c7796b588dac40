//! Aggregation of a retired track and its appearance samples into a [`Tracklet`]

use chrono::Utc;
use log::{debug, info, warn};
use ndarray::{Array1, Array2};
use persontrack::Track;

use crate::cache::{AppearanceSample, TrackAppearance};
use crate::config::PipelineConfig;
use crate::types::{GarmentDescriptor, HeightCategory, OutfitDescriptor, Tracklet};

/// Number of samples at which the observation score saturates
const SATURATING_OBSERVATIONS: f32 = 10.0;

#[derive(Debug, Clone)]
pub struct TrackletAssembler {
    camera_id: String,
    mall_id: String,
    min_observations: usize,
    extract_embeddings: bool,
    short_height_below: f32,
    tall_height_above: f32,
}

impl TrackletAssembler {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            camera_id: config.camera_id.clone(),
            mall_id: config.mall_id.clone(),
            min_observations: config.min_observations.max(2),
            extract_embeddings: config.extract_embeddings,
            short_height_below: config.short_height_below,
            tall_height_above: config.tall_height_above,
        }
    }

    /// Build the tracklet for a retired track
    ///
    /// Returns `None` when the track has fewer than `min_observations` samples.
    pub fn assemble(&self, track: &Track, appearance: &TrackAppearance) -> Option<Tracklet> {
        let samples = appearance.samples();
        if samples.len() < self.min_observations {
            debug!(
                "Track {} has insufficient observations ({}), skipping",
                track.track_id,
                samples.len()
            );
            return None;
        }

        let first = samples.first()?;
        let last = samples.last()?;

        let outfit = aggregate_outfits(samples)?;
        let visual_embedding = if self.extract_embeddings {
            mean_embedding(appearance)
        } else {
            None
        };
        let (height_category, aspect_ratio) = self.estimate_physique(samples);
        let quality = quality_score(track, samples.len());

        let duration_seconds = (last.timestamp - first.timestamp)
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);

        let tracklet = Tracklet {
            track_id: track.track_id,
            camera_id: self.camera_id.clone(),
            mall_id: self.mall_id.clone(),
            t_in: first.timestamp,
            t_out: last.timestamp,
            duration_seconds,
            bbox_sequence: track.bbox_history().to_vec(),
            frame_sequence: track.frame_history().to_vec(),
            avg_bbox: track.average_bbox(),
            outfit,
            visual_embedding,
            height_category,
            aspect_ratio,
            confidence: track.average_confidence(),
            quality,
            num_observations: samples.len(),
            created_at: Utc::now(),
        };

        info!(
            "Created tracklet: track_id={}, observations={}, quality={:.2}",
            tracklet.track_id, tracklet.num_observations, tracklet.quality
        );

        Some(tracklet)
    }

    fn estimate_physique(&self, samples: &[AppearanceSample]) -> (HeightCategory, f32) {
        let n = samples.len().max(1) as f32;
        let mean_height = samples.iter().map(|s| s.bbox.height()).sum::<f32>() / n;

        let ratios: Vec<f32> = samples
            .iter()
            .filter_map(|s| s.bbox.aspect_ratio())
            .collect();
        let aspect_ratio = if ratios.is_empty() {
            0.5
        } else {
            ratios.iter().sum::<f32>() / ratios.len() as f32
        };

        (
            HeightCategory::from_height(
                mean_height,
                self.short_height_below,
                self.tall_height_above,
            ),
            aspect_ratio,
        )
    }
}

/// Most frequent value, ties going to whichever was seen first
pub fn stable_mode<'a, I>(values: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for value in values {
        match counts.iter_mut().find(|(v, _)| *v == value) {
            Some((_, count)) => *count += 1,
            None => counts.push((value, 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (value, count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value)
}

fn vote_garment<F>(
    samples: &[AppearanceSample],
    template: &GarmentDescriptor,
    part: F,
) -> GarmentDescriptor
where
    F: Fn(&OutfitDescriptor) -> &GarmentDescriptor,
{
    let garment_type =
        stable_mode(samples.iter().map(|s| part(&s.outfit).garment_type.as_str()));
    let color = stable_mode(samples.iter().map(|s| part(&s.outfit).color.as_str()));

    GarmentDescriptor {
        garment_type: garment_type.unwrap_or("unknown").to_string(),
        color: color.unwrap_or("unknown").to_string(),
        ..template.clone()
    }
}

/// Mode-vote type and colour per region; the remaining fields come from the first sample
pub fn aggregate_outfits(samples: &[AppearanceSample]) -> Option<OutfitDescriptor> {
    let template = &samples.first()?.outfit;

    Some(OutfitDescriptor {
        top: vote_garment(samples, &template.top, |o| &o.top),
        bottom: vote_garment(samples, &template.bottom, |o| &o.bottom),
        shoes: vote_garment(samples, &template.shoes, |o| &o.shoes),
        overall_quality: template.overall_quality,
    })
}

/// Mean of the sampled embeddings re-normalized to unit L2 norm
pub fn mean_embedding(appearance: &TrackAppearance) -> Option<Vec<f32>> {
    let embeddings: Vec<&[f32]> = appearance.embeddings().collect();
    let dim = embeddings.first()?.len();
    if dim == 0 || embeddings.iter().any(|e| e.len() != dim) {
        warn!("Inconsistent embedding dimensions, skipping aggregation");
        return None;
    }

    let flat: Vec<f32> = embeddings.iter().flat_map(|e| e.iter().copied()).collect();
    let matrix = Array2::from_shape_vec((embeddings.len(), dim), flat).ok()?;
    let mean: Array1<f32> = matrix.mean_axis(ndarray::Axis(0))?;

    let norm = mean.dot(&mean).sqrt();
    if !norm.is_finite() || norm <= f32::EPSILON {
        warn!("Mean embedding has zero norm, dropping it");
        return None;
    }

    Some((mean / norm).to_vec())
}

/// `0.4 * obs + 0.4 * lifetime confidence + 0.2 * stability`, clamped to [0, 1]
pub fn quality_score(track: &Track, num_samples: usize) -> f32 {
    let obs_score = (num_samples as f32 / SATURATING_OBSERVATIONS).min(1.0);
    let conf_score = track.average_confidence();
    let stability_score = track.stability();

    (0.4 * obs_score + 0.4 * conf_score + 0.2 * stability_score).clamp(0.0, 1.0)
}
