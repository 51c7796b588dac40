//! Heuristic garment analysis on person crops
//!
//! The crop is split into fixed horizontal bands (top, bottom, shoes), each band's
//! dominant CIELAB colour is named from a range table, and a coarse garment type is
//! guessed from colour and lightness. Cheap enough to run on every sampled crop
//! and a drop-in [`GarmentAnalyzer`] until a learned model is wired in.

use image::{imageops, RgbImage};
use log::{debug, warn};
use ndarray::{Array2, ArrayView1, Axis};
use palette::{IntoColor, Lab, Srgb};

use crate::collaborators::GarmentAnalyzer;
use crate::error::{Result, TrackletError};
use crate::types::{GarmentDescriptor, OutfitDescriptor};

/// Top band ends at this fraction of the crop height
const TOP_RATIO: f32 = 0.4;
/// Bottom band ends at this fraction of the crop height
const BOTTOM_RATIO: f32 = 0.8;
/// Band height (px) at which the segmentation size score saturates
const MIN_REGION_HEIGHT: f32 = 20.0;
/// Bands with fewer pixels get a neutral low-confidence colour
const MIN_REGION_PIXELS: u32 = 10;
const HISTOGRAM_BINS: usize = 10;

/// Named colour as inclusive (min, max) ranges of L, a and b
struct ColorRange {
    name: &'static str,
    l: (f32, f32),
    a: (f32, f32),
    b: (f32, f32),
}

const fn range(name: &'static str, l: (f32, f32), a: (f32, f32), b: (f32, f32)) -> ColorRange {
    ColorRange { name, l, a, b }
}

/// First match wins
const COLOR_RANGES: [ColorRange; 11] = [
    range("white", (80.0, 100.0), (-10.0, 10.0), (-10.0, 10.0)),
    range("black", (0.0, 30.0), (-10.0, 10.0), (-10.0, 10.0)),
    range("gray", (30.0, 80.0), (-10.0, 10.0), (-10.0, 10.0)),
    range("red", (20.0, 80.0), (20.0, 127.0), (-20.0, 50.0)),
    range("orange", (40.0, 85.0), (10.0, 60.0), (30.0, 80.0)),
    range("yellow", (60.0, 100.0), (-20.0, 20.0), (30.0, 127.0)),
    range("green", (30.0, 80.0), (-60.0, -10.0), (-20.0, 40.0)),
    range("blue", (20.0, 70.0), (-20.0, 20.0), (-80.0, -10.0)),
    range("purple", (20.0, 60.0), (10.0, 60.0), (-50.0, -10.0)),
    range("pink", (50.0, 90.0), (20.0, 60.0), (-10.0, 20.0)),
    range("brown", (20.0, 60.0), (5.0, 40.0), (10.0, 50.0)),
];

#[inline]
fn within(v: f32, (lo, hi): (f32, f32)) -> bool {
    v >= lo && v <= hi
}

/// Map a CIELAB colour to a clothing colour name
pub fn color_name(lab: [f32; 3]) -> &'static str {
    let [l, a, b] = lab;

    COLOR_RANGES
        .iter()
        .find(|r| within(l, r.l) && within(a, r.a) && within(b, r.b))
        .map(|r| r.name)
        .unwrap_or(if l > 70.0 {
            "white"
        } else if l < 35.0 {
            "black"
        } else {
            "gray"
        })
}

/// sRGB (D65) to CIELAB with L in [0, 100]
pub fn rgb_to_lab([r, g, b]: [u8; 3]) -> [f32; 3] {
    let lab: Lab = Srgb::new(r, g, b).into_format::<f32>().into_linear().into_color();
    [lab.l, lab.a, lab.b]
}

/// Pixels as rows of L, a and b
fn lab_pixels(region: &RgbImage) -> Array2<f32> {
    let mut lab = Array2::zeros(((region.width() * region.height()) as usize, 3));
    for (mut row, px) in lab.rows_mut().into_iter().zip(region.pixels()) {
        row.assign(&ArrayView1::from(&rgb_to_lab(px.0)));
    }
    lab
}

fn median(column: ArrayView1<f32>) -> f32 {
    let mut values = column.to_vec();
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}

/// Colour statistics of one garment band
#[derive(Debug, Clone, PartialEq)]
pub struct RegionColor {
    pub name: &'static str,
    pub lab: [f32; 3],
    /// `HISTOGRAM_BINS` bins for each of L, a and b, summing to 1
    pub histogram: Vec<f32>,
    pub confidence: f32,
}

impl RegionColor {
    fn degraded() -> Self {
        Self {
            name: "gray",
            lab: [50.0, 0.0, 0.0],
            histogram: vec![0.1; HISTOGRAM_BINS * 3],
            confidence: 0.1,
        }
    }
}

/// Dominant colour, histogram and uniformity of a region
pub fn extract_color(region: &RgbImage) -> RegionColor {
    if region.width() * region.height() < MIN_REGION_PIXELS {
        debug!(
            "Region too small for colour extraction: {}x{}",
            region.width(),
            region.height()
        );
        return RegionColor::degraded();
    }

    let pixels = lab_pixels(region);

    // L spans [0, 100], a and b span [-128, 128)
    let spans = [(0.0f32, 100.0f32), (-128.0, 128.0), (-128.0, 128.0)];
    let mut histogram = vec![0.0f32; HISTOGRAM_BINS * 3];
    for (c, (channel, (lo, hi))) in pixels.columns().into_iter().zip(spans).enumerate() {
        for &v in channel {
            let bin = (((v - lo) / (hi - lo)) * HISTOGRAM_BINS as f32) as isize;
            let bin = bin.clamp(0, HISTOGRAM_BINS as isize - 1) as usize;
            histogram[c * HISTOGRAM_BINS + bin] += 1.0;
        }
    }
    let total: f32 = histogram.iter().sum::<f32>() + 1e-10;
    histogram.iter_mut().for_each(|h| *h /= total);

    let mean_std = pixels.std_axis(Axis(0), 0.0).mean().unwrap_or(0.0);
    let confidence = (1.0 - mean_std / 50.0).clamp(0.3, 1.0);

    let lab = [
        median(pixels.column(0)),
        median(pixels.column(1)),
        median(pixels.column(2)),
    ];

    RegionColor {
        name: color_name(lab),
        lab,
        histogram,
        confidence,
    }
}

/// Top garment type and confidence from colour name and lightness
pub fn classify_top(color: &str, lightness: f32) -> (&'static str, f32) {
    if matches!(color, "white" | "black" | "gray" | "blue") && lightness < 60.0 {
        ("shirt", 0.65)
    } else if matches!(color, "red" | "orange" | "yellow" | "green") && lightness > 50.0 {
        ("tee", 0.60)
    } else if lightness < 40.0 && matches!(color, "black" | "blue" | "gray" | "brown") {
        ("jacket", 0.55)
    } else {
        ("top", 0.50)
    }
}

pub fn classify_bottom(color: &str, lightness: f32) -> (&'static str, f32) {
    if color == "blue" && lightness < 50.0 {
        ("jeans", 0.70)
    } else if matches!(color, "black" | "brown" | "gray") && lightness < 60.0 {
        ("pants", 0.65)
    } else if lightness > 60.0 {
        ("shorts", 0.55)
    } else {
        ("bottom", 0.50)
    }
}

pub fn classify_shoes(color: &str, lightness: f32) -> (&'static str, f32) {
    if color == "white" && lightness > 70.0 {
        ("sneakers", 0.70)
    } else if color == "black" && lightness < 40.0 {
        ("loafers", 0.60)
    } else if color == "brown" {
        ("boots", 0.55)
    } else {
        ("shoes", 0.50)
    }
}

/// Score of the band split: band sizes, texture and crop proportions
fn segmentation_quality(regions: &[RgbImage; 3], crop: &RgbImage) -> f32 {
    let size_score = regions
        .iter()
        .map(|r| (r.height() as f32 / MIN_REGION_HEIGHT).min(1.0))
        .sum::<f32>()
        / 3.0;

    let texture: f32 = regions
        .iter()
        .map(|r| {
            if r.as_raw().is_empty() {
                0.0
            } else {
                ArrayView1::from(r.as_raw().as_slice()).mapv(f32::from).std(0.0) / 255.0
            }
        })
        .sum();
    let texture_score = (texture / 0.35).min(1.0);

    let proportions = crop.height() as f32 / crop.width().max(1) as f32;
    let aspect_score = if (1.5..=5.0).contains(&proportions) {
        1.0
    } else if (1.0..1.5).contains(&proportions) {
        0.7
    } else {
        0.5
    };

    0.4 * size_score + 0.4 * texture_score + 0.2 * aspect_score
}

/// Band-split colour and type heuristics
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicGarmentAnalyzer;

impl HeuristicGarmentAnalyzer {
    pub fn new() -> Self {
        Self
    }

    fn split(crop: &RgbImage) -> [RgbImage; 3] {
        let (w, h) = crop.dimensions();
        let top_end = (h as f32 * TOP_RATIO) as u32;
        let bottom_end = (h as f32 * BOTTOM_RATIO) as u32;

        [
            imageops::crop_imm(crop, 0, 0, w, top_end).to_image(),
            imageops::crop_imm(crop, 0, top_end, w, bottom_end - top_end).to_image(),
            imageops::crop_imm(crop, 0, bottom_end, w, h - bottom_end).to_image(),
        ]
    }
}

fn describe(color: RegionColor, (garment_type, type_confidence): (&str, f32)) -> GarmentDescriptor {
    GarmentDescriptor {
        garment_type: garment_type.to_string(),
        color: color.name.to_string(),
        lab: color.lab,
        histogram: color.histogram,
        confidence: (color.confidence * type_confidence).min(1.0),
    }
}

impl GarmentAnalyzer for HeuristicGarmentAnalyzer {
    fn analyze(&self, crop: &RgbImage) -> Result<OutfitDescriptor> {
        let (w, h) = crop.dimensions();
        if w == 0 || h == 0 {
            return Err(TrackletError::invalid_crop(format!("empty crop {}x{}", w, h)));
        }
        if h < 10 || w < 5 {
            warn!("Person crop very small: {}x{}, quality will be minimal", w, h);
        }

        let regions = Self::split(crop);
        let seg_quality = segmentation_quality(&regions, crop);
        let [top, bottom, shoes] = regions.each_ref().map(extract_color);

        let color_confidence = (top.confidence + bottom.confidence + shoes.confidence) / 3.0;
        let overall_quality = (0.6 * seg_quality + 0.4 * color_confidence).clamp(0.0, 1.0);

        let top_type = classify_top(top.name, top.lab[0]);
        let bottom_type = classify_bottom(bottom.name, bottom.lab[0]);
        let shoes_type = classify_shoes(shoes.name, shoes.lab[0]);

        Ok(OutfitDescriptor {
            top: describe(top, top_type),
            bottom: describe(bottom, bottom_type),
            shoes: describe(shoes, shoes_type),
            overall_quality,
        })
    }
}
