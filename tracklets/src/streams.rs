//! Driving generators from frame sources
//!
//! A camera is processed strictly in frame order on one thread. Independent
//! cameras share nothing and run in parallel on the rayon pool.

use chrono::{DateTime, Utc};
use image::RgbImage;
use log::{error, info};
use rayon::prelude::*;
use serde::Serialize;

use crate::collaborators::PersonDetection;
use crate::error::Result;
use crate::generator::TrackletGenerator;
use crate::storage::TrackletSink;

/// Frame with metadata
#[derive(Clone)]
pub struct Frame {
    pub frame_id: u64,
    pub timestamp: DateTime<Utc>,
    pub image: RgbImage,
    /// Precomputed detections; when absent the generator's detector runs
    pub detections: Option<Vec<PersonDetection>>,
}

/// Ordered frames of one camera
pub trait FrameSource: Send {
    /// Next frame, or `None` at end of stream
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

impl<I> FrameSource for I
where
    I: Iterator<Item = Result<Frame>> + Send,
{
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        self.next().transpose()
    }
}

/// Per-camera processing statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CameraStats {
    pub camera_id: String,
    pub frames: u64,
    pub tracklets: usize,
}

/// Feed every frame of `source` through `generator`, then flush
///
/// Tracklets are written to `sink` as soon as their track retires.
pub fn run_camera(
    generator: &mut TrackletGenerator,
    source: &mut dyn FrameSource,
    sink: &mut dyn TrackletSink,
) -> Result<CameraStats> {
    let mut stats = CameraStats {
        camera_id: generator.camera_id().to_string(),
        ..Default::default()
    };

    while let Some(frame) = source.next_frame()? {
        match &frame.detections {
            Some(detections) => {
                generator.process_detections(
                    &frame.image,
                    detections,
                    frame.timestamp,
                    frame.frame_id,
                );
            }
            None => {
                generator.process_frame(&frame.image, frame.timestamp, frame.frame_id)?;
            }
        }
        stats.frames += 1;

        for tracklet in generator.take_completed() {
            sink.write(&tracklet)?;
            stats.tracklets += 1;
        }
    }

    for tracklet in generator.finalize_all_tracks() {
        sink.write(&tracklet)?;
        stats.tracklets += 1;
    }
    sink.flush()?;

    info!(
        "Camera {}: {} frames, {} tracklets",
        stats.camera_id, stats.frames, stats.tracklets
    );

    Ok(stats)
}

/// Everything one camera needs to run on its own
pub struct CameraJob {
    pub generator: TrackletGenerator,
    pub source: Box<dyn FrameSource>,
    pub sink: Box<dyn TrackletSink>,
}

impl CameraJob {
    pub fn new(
        generator: TrackletGenerator,
        source: Box<dyn FrameSource>,
        sink: Box<dyn TrackletSink>,
    ) -> Self {
        Self {
            generator,
            source,
            sink,
        }
    }
}

/// Run independent cameras in parallel; results come back in input order
pub fn run_cameras(jobs: Vec<CameraJob>) -> Vec<Result<CameraStats>> {
    jobs.into_par_iter()
        .map(|mut job| {
            let result = run_camera(&mut job.generator, job.source.as_mut(), job.sink.as_mut());
            if let Err(e) = &result {
                error!("Camera {} failed: {}", job.generator.camera_id(), e);
            }
            result
        })
        .collect()
}
