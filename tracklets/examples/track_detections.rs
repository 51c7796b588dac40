/// Offline tracklet generation from precomputed detections
///
/// Reads one JSON object per line:
///   {"frame_id": 1, "timestamp": "2024-05-01T10:00:00Z",
///    "image": "frames/000001.jpg",
///    "detections": [{"bbox": {"xmin": 10, "ymin": 20, "xmax": 90, "ymax": 220}, "confidence": 0.9}]}
/// `image` is optional; without it the heuristic garment analyzer sees a blank canvas.
/// Tracklets are written to stdout as JSON lines.
///
/// Usage:
///   cargo run --example track_detections -- detections.jsonl [pipeline.json]
use std::env;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Lines};

use chrono::{DateTime, Utc};
use image::{Rgb, RgbImage};
use serde::Deserialize;
use tracklets::{
    run_camera, Frame, HeuristicGarmentAnalyzer, JsonLinesSink, PersonDetection,
    PipelineConfig, TrackletError, TrackletGenerator,
};

const CANVAS: (u32, u32) = (1920, 1080);

#[derive(Deserialize)]
struct FrameLine {
    frame_id: u64,
    timestamp: DateTime<Utc>,
    #[serde(default)]
    image: Option<String>,
    detections: Vec<PersonDetection>,
}

struct JsonLinesFrames {
    lines: Lines<BufReader<File>>,
}

impl JsonLinesFrames {
    fn parse(line: &str) -> tracklets::Result<Frame> {
        let parsed: FrameLine = serde_json::from_str(line)?;
        let image = match &parsed.image {
            Some(path) => image::open(path)
                .map_err(|e| TrackletError::other(format!("{}: {}", path, e)))?
                .to_rgb8(),
            None => RgbImage::from_pixel(CANVAS.0, CANVAS.1, Rgb([128, 128, 128])),
        };

        Ok(Frame {
            frame_id: parsed.frame_id,
            timestamp: parsed.timestamp,
            image,
            detections: Some(parsed.detections),
        })
    }
}

impl Iterator for JsonLinesFrames {
    type Item = tracklets::Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            if !line.trim().is_empty() {
                return Some(Self::parse(&line));
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let Some(input) = args.get(1) else {
        anyhow::bail!("usage: track_detections <detections.jsonl> [pipeline.json]");
    };

    let config = match args.get(2) {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };

    let mut generator = TrackletGenerator::new(config, Box::new(HeuristicGarmentAnalyzer::new()))?;
    let mut source = JsonLinesFrames {
        lines: BufReader::new(File::open(input)?).lines(),
    };
    let mut sink = JsonLinesSink::new(BufWriter::new(std::io::stdout()));

    let stats = run_camera(&mut generator, &mut source, &mut sink)?;
    log::info!(
        "Processed {} frames into {} tracklets",
        stats.frames,
        stats.tracklets
    );

    Ok(())
}
