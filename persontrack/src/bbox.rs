//! Bounding box operations and IoU calculations

use ndarray::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Axis-aligned bounding box in image pixel coordinates `(x1, y1, x2, y2)`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bbox {
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
}

impl Bbox {
    pub fn new(xmin: f32, ymin: f32, xmax: f32, ymax: f32) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    pub fn width(&self) -> f32 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f32 {
        self.ymax - self.ymin
    }

    /// Box area, zero for degenerate or inverted boxes
    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    pub fn center_x(&self) -> f32 {
        (self.xmin + self.xmax) / 2.0
    }

    pub fn center_y(&self) -> f32 {
        (self.ymin + self.ymax) / 2.0
    }

    /// Width over height, `None` for boxes without positive height
    pub fn aspect_ratio(&self) -> Option<f32> {
        let h = self.height();
        (h > 0.0).then(|| self.width() / h)
    }

    /// All coordinates finite and `x2 > x1`, `y2 > y1`
    pub fn is_valid(&self) -> bool {
        self.to_bounds().iter().all(|v| v.is_finite())
            && self.xmax > self.xmin
            && self.ymax > self.ymin
    }

    /// Convert to bounds array [xmin, ymin, xmax, ymax]
    pub fn to_bounds(&self) -> [f32; 4] {
        [self.xmin, self.ymin, self.xmax, self.ymax]
    }

    /// Component-wise mean of a set of boxes
    pub fn mean<'a, I>(boxes: I) -> Option<Bbox>
    where
        I: IntoIterator<Item = &'a Bbox>,
    {
        let mut sum = [0.0f64; 4];
        let mut n = 0usize;
        for b in boxes {
            for (acc, v) in sum.iter_mut().zip(b.to_bounds()) {
                *acc += v as f64;
            }
            n += 1;
        }

        if n == 0 {
            return None;
        }

        let n = n as f64;
        Some(Bbox::new(
            (sum[0] / n) as f32,
            (sum[1] / n) as f32,
            (sum[2] / n) as f32,
            (sum[3] / n) as f32,
        ))
    }
}

impl fmt::Display for Bbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Bbox({}, {}, {}, {})",
            self.xmin, self.ymin, self.xmax, self.ymax
        )
    }
}

/// Calculate IoU between two bounding boxes
///
/// Non-overlapping and zero-area boxes yield 0.0.
pub fn calculate_iou(bbox1: &Bbox, bbox2: &Bbox) -> f32 {
    let x1 = bbox1.xmin.max(bbox2.xmin);
    let y1 = bbox1.ymin.max(bbox2.ymin);
    let x2 = bbox1.xmax.min(bbox2.xmax);
    let y2 = bbox1.ymax.min(bbox2.ymax);

    if x2 <= x1 || y2 <= y1 {
        return 0.0;
    }

    let intersection = (x2 - x1) * (y2 - y1);
    let union = bbox1.area() + bbox2.area() - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

/// Compute IoU matrix between detections and tracks with parallel processing
/// Returns: (n_detections, n_tracks) IoU matrix
pub fn ious(detections: &[Bbox], tracks: &[Bbox]) -> Array2<f32> {
    let n_dets = detections.len();
    let n_tracks = tracks.len();

    if n_dets == 0 || n_tracks == 0 {
        return Array2::zeros((n_dets, n_tracks));
    }

    let iou_data: Vec<f32> = detections
        .par_iter()
        .flat_map_iter(|det| tracks.iter().map(move |track| calculate_iou(det, track)))
        .collect();

    Array2::from_shape_vec((n_dets, n_tracks), iou_data)
        .unwrap_or_else(|_| Array2::zeros((n_dets, n_tracks)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_bbox_properties() {
        let bbox = Bbox::new(0.0, 0.0, 10.0, 5.0);
        assert_eq!(bbox.width(), 10.0);
        assert_eq!(bbox.height(), 5.0);
        assert_eq!(bbox.area(), 50.0);
        assert_eq!(bbox.center_x(), 5.0);
        assert_eq!(bbox.center_y(), 2.5);
        assert_eq!(bbox.aspect_ratio(), Some(2.0));
    }

    #[test]
    fn test_iou_calculation() {
        let bbox1 = Bbox::new(0.0, 0.0, 10.0, 10.0);
        let bbox2 = Bbox::new(5.0, 5.0, 15.0, 15.0);
        let iou = calculate_iou(&bbox1, &bbox2);
        assert_abs_diff_eq!(iou, 25.0 / 175.0, epsilon = 0.001);
    }

    #[test]
    fn test_iou_identity_and_symmetry() {
        let a = Bbox::new(3.0, 4.0, 40.0, 90.0);
        let b = Bbox::new(20.0, 10.0, 70.0, 120.0);
        assert_eq!(calculate_iou(&a, &a), 1.0);
        assert_eq!(calculate_iou(&a, &b), calculate_iou(&b, &a));
    }

    #[test]
    fn test_iou_disjoint_and_degenerate() {
        let a = Bbox::new(0.0, 0.0, 10.0, 10.0);
        let far = Bbox::new(20.0, 20.0, 30.0, 30.0);
        let touching = Bbox::new(10.0, 0.0, 20.0, 10.0);
        let flat = Bbox::new(2.0, 2.0, 8.0, 2.0);
        assert_eq!(calculate_iou(&a, &far), 0.0);
        assert_eq!(calculate_iou(&a, &touching), 0.0);
        assert_eq!(calculate_iou(&a, &flat), 0.0);
        assert_eq!(calculate_iou(&flat, &flat), 0.0);
    }

    #[test]
    fn test_iou_contained_box() {
        let outer = Bbox::new(0.0, 0.0, 100.0, 200.0);
        let inner = Bbox::new(25.0, 50.0, 75.0, 150.0);
        assert_eq!(
            calculate_iou(&outer, &inner),
            inner.area() / outer.area()
        );
    }

    #[test]
    fn test_iou_matrix_shape() {
        let dets = vec![
            Bbox::new(0.0, 0.0, 10.0, 10.0),
            Bbox::new(50.0, 50.0, 60.0, 60.0),
        ];
        let tracks = vec![Bbox::new(0.0, 0.0, 10.0, 10.0)];

        let m = ious(&dets, &tracks);
        assert_eq!(m.shape(), &[2, 1]);
        assert_abs_diff_eq!(m[[0, 0]], 1.0);
        assert_abs_diff_eq!(m[[1, 0]], 0.0);

        assert_eq!(ious(&[], &tracks).shape(), &[0, 1]);
    }

    #[test]
    fn test_mean_bbox() {
        let boxes = [
            Bbox::new(0.0, 0.0, 10.0, 10.0),
            Bbox::new(10.0, 10.0, 30.0, 30.0),
        ];
        let mean = Bbox::mean(boxes.iter()).unwrap();
        assert_abs_diff_eq!(mean.xmin, 5.0);
        assert_abs_diff_eq!(mean.xmax, 20.0);
        assert!(Bbox::mean(&[] as &[Bbox]).is_none());
    }
}
