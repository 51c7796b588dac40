//! Per-camera tracklet generation loop
//!
//! Each frame: detect people, update the tracker, sample appearance for freshly
//! matched tracks that are due, and assemble tracklets for retired tracks.
//! Frames must be fed in order; one generator serves exactly one camera.

use chrono::{DateTime, Utc};
use image::{imageops, RgbImage};
use log::{debug, info, warn};
use persontrack::{Bbox, ByteTracker, Detection, Track};
use rayon::prelude::*;

use crate::assembler::TrackletAssembler;
use crate::cache::{AppearanceCache, AppearanceSample};
use crate::collaborators::{
    validate_embedding, EmbeddingExtractor, GarmentAnalyzer, PersonDetection, PersonDetector,
};
use crate::config::PipelineConfig;
use crate::error::{Result, TrackletError};
use crate::types::{Progress, Tracklet};

/// A track due for an appearance sample this frame
#[derive(Debug, Clone, Copy)]
struct SampleJob {
    track_id: u64,
    bbox: Bbox,
    frame_id: u64,
}

/// Cut the person out of the frame, clipping the box to the image
pub fn crop_person(frame: &RgbImage, bbox: &Bbox) -> Result<RgbImage> {
    let (w, h) = frame.dimensions();
    let x1 = bbox.xmin.max(0.0) as u32;
    let y1 = bbox.ymin.max(0.0) as u32;
    let x2 = (bbox.xmax.max(0.0) as u32).min(w);
    let y2 = (bbox.ymax.max(0.0) as u32).min(h);

    if x2 <= x1 || y2 <= y1 {
        return Err(TrackletError::invalid_crop(format!(
            "box {} outside {}x{} frame",
            bbox, w, h
        )));
    }

    Ok(imageops::crop_imm(frame, x1, y1, x2 - x1, y2 - y1).to_image())
}

/// Run the appearance collaborators on one crop
///
/// A garment failure yields no sample; an embedding failure keeps the sample
/// without an embedding.
fn observe(
    garment: &dyn GarmentAnalyzer,
    embedder: Option<&dyn EmbeddingExtractor>,
    frame: &RgbImage,
    job: &SampleJob,
    timestamp: DateTime<Utc>,
) -> Option<AppearanceSample> {
    let crop = match crop_person(frame, &job.bbox) {
        Ok(crop) => crop,
        Err(e) => {
            warn!("Skipping sample for track {}: {}", job.track_id, e);
            return None;
        }
    };

    let outfit = match garment.analyze(&crop) {
        Ok(outfit) => outfit,
        Err(e) => {
            warn!("Failed to analyze outfit for track {}: {}", job.track_id, e);
            return None;
        }
    };

    let embedding = embedder.and_then(|extractor| {
        let result = extractor.extract(&crop).and_then(|embedding| {
            validate_embedding(&embedding)?;
            Ok(embedding)
        });
        match result {
            Ok(embedding) => Some(embedding),
            Err(e) => {
                warn!("Embedding extraction failed for track {}: {}", job.track_id, e);
                None
            }
        }
    });

    Some(AppearanceSample {
        outfit,
        embedding,
        frame_id: job.frame_id,
        timestamp,
        bbox: job.bbox,
    })
}

pub struct TrackletGenerator {
    config: PipelineConfig,
    detector: Option<Box<dyn PersonDetector>>,
    garment: Box<dyn GarmentAnalyzer>,
    embedder: Option<Box<dyn EmbeddingExtractor>>,
    tracker: ByteTracker,
    cache: AppearanceCache,
    assembler: TrackletAssembler,
    /// Produced but not yet taken
    completed: Vec<Tracklet>,
    finalized: usize,
    frames_processed: u64,
}

impl TrackletGenerator {
    pub fn new(config: PipelineConfig, garment: Box<dyn GarmentAnalyzer>) -> Result<Self> {
        config.validate()?;

        info!(
            "TrackletGenerator initialized for camera={}, mall={}, embeddings={}",
            config.camera_id, config.mall_id, config.extract_embeddings
        );

        Ok(Self {
            tracker: ByteTracker::new(config.tracker.clone()),
            cache: AppearanceCache::new(config.sample_stride),
            assembler: TrackletAssembler::new(&config),
            config,
            detector: None,
            garment,
            embedder: None,
            completed: Vec::new(),
            finalized: 0,
            frames_processed: 0,
        })
    }

    pub fn with_detector(mut self, detector: Box<dyn PersonDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn with_embedder(mut self, embedder: Box<dyn EmbeddingExtractor>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn camera_id(&self) -> &str {
        &self.config.camera_id
    }

    pub fn tracker(&self) -> &ByteTracker {
        &self.tracker
    }

    pub fn cache(&self) -> &AppearanceCache {
        &self.cache
    }

    /// Detect people in `frame` and process the result
    pub fn process_frame(
        &mut self,
        frame: &RgbImage,
        timestamp: DateTime<Utc>,
        frame_id: u64,
    ) -> Result<Vec<&Track>> {
        let detector = self
            .detector
            .as_deref()
            .ok_or_else(|| TrackletError::config("no person detector configured"))?;

        let detections = detector
            .detect(frame)
            .map_err(|e| TrackletError::detector(format!("{}: {}", detector.name(), e)))?;

        Ok(self.process_detections(frame, &detections, timestamp, frame_id))
    }

    /// Process one frame whose people have already been detected
    ///
    /// Returns the confirmed tracks after this frame.
    pub fn process_detections(
        &mut self,
        frame: &RgbImage,
        detections: &[PersonDetection],
        timestamp: DateTime<Utc>,
        frame_id: u64,
    ) -> Vec<&Track> {
        self.frames_processed += 1;

        let detections: Vec<Detection> = detections
            .iter()
            .map(|d| Detection::new(d.bbox, d.confidence, frame_id))
            .collect();
        self.tracker.update(&detections);

        self.sample_appearance(frame, timestamp);

        for track in self.tracker.take_removed() {
            self.finalize(&track);
        }

        self.tracker.active_tracks().collect()
    }

    fn sample_appearance(&mut self, frame: &RgbImage, timestamp: DateTime<Utc>) {
        let jobs: Vec<SampleJob> = self
            .tracker
            .live_tracks()
            .filter(|t| t.is_fresh() && self.cache.is_due(t.track_id, t.frame_id))
            .map(|t| SampleJob {
                track_id: t.track_id,
                bbox: t.bbox,
                frame_id: t.frame_id,
            })
            .collect();

        if jobs.is_empty() {
            return;
        }

        let garment = self.garment.as_ref();
        let embedder = if self.config.extract_embeddings {
            self.embedder.as_deref()
        } else {
            None
        };

        let samples: Vec<(u64, Option<AppearanceSample>)> = jobs
            .par_iter()
            .map(|job| {
                (
                    job.track_id,
                    observe(garment, embedder, frame, job, timestamp),
                )
            })
            .collect();

        for (track_id, sample) in samples {
            if let Some(sample) = sample {
                self.cache.record(track_id, sample);
            }
        }
    }

    fn finalize(&mut self, track: &Track) {
        let Some(appearance) = self.cache.take(track.track_id) else {
            debug!(
                "Track {} has no appearance data, skipping tracklet",
                track.track_id
            );
            return;
        };

        if let Some(tracklet) = self.assembler.assemble(track, &appearance) {
            self.completed.push(tracklet);
            self.finalized += 1;
        }
    }

    /// End of stream: retire every remaining track and hand over all tracklets
    ///
    /// Leaves the generator empty; calling it again returns nothing.
    pub fn finalize_all_tracks(&mut self) -> Vec<Tracklet> {
        let remaining = self.tracker.drain_all();
        let count = remaining.len();
        for track in &remaining {
            self.finalize(track);
        }

        self.cache.clear();
        self.tracker.reset();

        let tracklets = std::mem::take(&mut self.completed);
        info!(
            "Camera {}: flushed {} tracks, {} tracklets handed over",
            self.config.camera_id,
            count,
            tracklets.len()
        );
        tracklets
    }

    /// Tracklets produced so far and not yet taken
    pub fn completed_tracklets(&self) -> &[Tracklet] {
        &self.completed
    }

    pub fn take_completed(&mut self) -> Vec<Tracklet> {
        std::mem::take(&mut self.completed)
    }

    pub fn progress(&self) -> Progress {
        Progress {
            active_tracks: self.tracker.num_active(),
            lost_tracks: self.tracker.lost_tracks().count(),
            finalized_tracklets: self.finalized,
            frames_processed: self.frames_processed,
        }
    }

    pub fn reset(&mut self) {
        self.tracker.reset();
        self.cache.clear();
        self.completed.clear();
        self.finalized = 0;
        self.frames_processed = 0;
        info!("TrackletGenerator reset");
    }
}
