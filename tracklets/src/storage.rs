//! Persisted-row mapping and tracklet sinks

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{Result, TrackletError};
use crate::types::Tracklet;

/// Pack an embedding as a little-endian IEEE-754 `f32` array
pub fn pack_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Inverse of [`pack_embedding`]
///
/// The dimensionality is recovered from the buffer length and, when given, checked
/// against `expected_dim`.
pub fn unpack_embedding(bytes: &[u8], expected_dim: Option<usize>) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(TrackletError::InvalidBuffer { len: bytes.len() });
    }

    let dim = bytes.len() / 4;
    if let Some(expected) = expected_dim {
        if expected != dim {
            return Err(TrackletError::DimensionMismatch {
                expected,
                actual: dim,
            });
        }
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// One row of the tracklets table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackletRow {
    pub mall_id: String,
    pub pin_id: String,
    pub video_id: String,
    pub track_id: u64,
    pub t_in: DateTime<Utc>,
    pub t_out: DateTime<Utc>,
    pub duration_seconds: f64,
    /// Packed visual embedding, empty when none was sampled
    pub outfit_vec: Vec<u8>,
    pub outfit_json: serde_json::Value,
    pub physique: serde_json::Value,
    pub box_stats: serde_json::Value,
    pub quality: f32,
}

impl TrackletRow {
    pub fn from_tracklet<S: Into<String>>(tracklet: &Tracklet, pin_id: S, video_id: S) -> Self {
        let outfit_vec = tracklet
            .visual_embedding
            .as_deref()
            .map(pack_embedding)
            .unwrap_or_default();

        Self {
            mall_id: tracklet.mall_id.clone(),
            pin_id: pin_id.into(),
            video_id: video_id.into(),
            track_id: tracklet.track_id,
            t_in: tracklet.t_in,
            t_out: tracklet.t_out,
            duration_seconds: tracklet.duration_seconds,
            outfit_vec,
            outfit_json: json!(tracklet.outfit.summary()),
            physique: json!({
                "height_category": tracklet.height_category,
                "aspect_ratio": tracklet.aspect_ratio,
            }),
            box_stats: json!({
                "avg_bbox": tracklet.avg_bbox.to_bounds(),
                "confidence": tracklet.confidence,
            }),
            quality: tracklet.quality,
        }
    }

    pub fn embedding(&self) -> Result<Option<Vec<f32>>> {
        if self.outfit_vec.is_empty() {
            return Ok(None);
        }
        unpack_embedding(&self.outfit_vec, None).map(Some)
    }
}

/// Destination for finalized tracklets
pub trait TrackletSink: Send {
    fn write(&mut self, tracklet: &Tracklet) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Writes one flat JSON record per line
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
    written: usize,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> TrackletSink for JsonLinesSink<W> {
    fn write(&mut self, tracklet: &Tracklet) -> Result<()> {
        serde_json::to_writer(&mut self.writer, &tracklet.to_record())?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Collects tracklets in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    pub tracklets: Vec<Tracklet>,
}

impl TrackletSink for MemorySink {
    fn write(&mut self, tracklet: &Tracklet) -> Result<()> {
        self.tracklets.push(tracklet.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_is_little_endian() {
        let bytes = pack_embedding(&[1.0, -2.5]);
        assert_eq!(bytes.len(), 8);
        assert_eq!(&bytes[..4], &[0x00, 0x00, 0x80, 0x3f]);
        assert_eq!(unpack_embedding(&bytes, Some(2)).unwrap(), vec![1.0, -2.5]);
    }

    #[test]
    fn test_unpack_rejects_bad_buffers() {
        assert!(matches!(
            unpack_embedding(&[0u8; 7], None),
            Err(TrackletError::InvalidBuffer { len: 7 })
        ));
        assert!(matches!(
            unpack_embedding(&[0u8; 8], Some(4)),
            Err(TrackletError::DimensionMismatch {
                expected: 4,
                actual: 2
            })
        ));
        assert_eq!(unpack_embedding(&[], None).unwrap(), Vec::<f32>::new());
    }
}
