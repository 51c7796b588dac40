//! Hungarian algorithm implementation for optimal assignment
//!
//! This module provides the optimal detection-to-track assignment used by every
//! association stage of the tracker. The solver always computes the globally optimal
//! bipartite matching; gating by threshold happens afterwards, so a pair proposed by
//! the solver but above the cost limit leaves both members unmatched.
use ndarray::{Array2, ArrayView2};
use pathfinding::prelude::{kuhn_munkres, Matrix};

/// Fixed-point scale used to feed float scores into the integer solver
const WEIGHT_SCALE: f32 = 1_000_000.0;

/// Result of Hungarian assignment algorithm
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignmentResult {
    /// Assignments as (detection_idx, track_idx) pairs
    pub assignments: Vec<(usize, usize)>,
    /// Indices of unassigned detections
    pub unassigned_detections: Vec<usize>,
    /// Indices of unassigned tracks
    pub unassigned_tracks: Vec<usize>,
}

/// Hungarian assignment solver
pub struct HungarianSolver;

impl HungarianSolver {
    /// Solve a minimum-cost assignment problem
    ///
    /// The padded square matrix always pairs `min(rows, cols)` real entries, so the
    /// optimum over negated costs is the minimum total cost. Pairs costing more than
    /// `max_cost` are dropped after solving and leave both sides unassigned.
    ///
    /// # Arguments
    /// * `cost_matrix` - cost_matrix\[i\]\[j\] is the cost of assigning detection i to track j
    /// * `max_cost` - Maximum allowed cost for a kept assignment
    pub fn solve(cost_matrix: ArrayView2<f32>, max_cost: f32) -> AssignmentResult {
        let num_detections = cost_matrix.nrows();
        let num_tracks = cost_matrix.ncols();

        if num_detections == 0 || num_tracks == 0 {
            return AssignmentResult {
                assignments: Vec::new(),
                unassigned_detections: (0..num_detections).collect(),
                unassigned_tracks: (0..num_tracks).collect(),
            };
        }

        // kuhn_munkres maximizes, so negate costs; padding stays neutral
        let size = num_detections.max(num_tracks);
        let mut weights = Matrix::new(size, size, 0i64);
        for ((i, j), cost) in cost_matrix.indexed_iter() {
            weights[(i, j)] = to_fixed_point(-cost);
        }

        let (_total, raw_assignments) = kuhn_munkres(&weights);

        let mut assigned_detections = vec![false; num_detections];
        let mut assigned_tracks = vec![false; num_tracks];
        let mut assignments = Vec::new();

        for (det_idx, &track_idx) in raw_assignments.iter().enumerate() {
            if det_idx < num_detections
                && track_idx < num_tracks
                && cost_matrix[[det_idx, track_idx]] <= max_cost
            {
                assigned_detections[det_idx] = true;
                assigned_tracks[track_idx] = true;
                assignments.push((det_idx, track_idx));
            }
        }

        AssignmentResult {
            assignments,
            unassigned_detections: (0..num_detections)
                .filter(|&i| !assigned_detections[i])
                .collect(),
            unassigned_tracks: (0..num_tracks)
                .filter(|&i| !assigned_tracks[i])
                .collect(),
        }
    }
}

fn to_fixed_point(value: f32) -> i64 {
    if value.is_finite() {
        (value * WEIGHT_SCALE).round() as i64
    } else {
        0
    }
}

/// Build a cost matrix `1 - IoU` from an IoU matrix
pub fn iou_cost_matrix(iou_matrix: ArrayView2<f32>) -> Array2<f32> {
    iou_matrix.mapv(|iou| 1.0 - iou)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    /// Gate on IoU the way the tracker does
    fn solve_iou(iou: ArrayView2<f32>, thresh: f32) -> AssignmentResult {
        HungarianSolver::solve(iou_cost_matrix(iou).view(), 1.0 - thresh)
    }

    #[test]
    fn test_empty_inputs() {
        let m = Array2::<f32>::zeros((0, 3));
        let result = HungarianSolver::solve(m.view(), 0.5);
        assert!(result.assignments.is_empty());
        assert_eq!(result.unassigned_tracks, vec![0, 1, 2]);
        assert!(result.unassigned_detections.is_empty());
    }

    #[test]
    fn test_optimal_rather_than_greedy() {
        // Greedy would take (0, 0) = 0.1 and be left with (1, 1) = 1.0;
        // the optimum pairs (0, 1) and (1, 0) for a total of 0.4.
        let cost = array![[0.1, 0.2], [0.2, 1.0]];
        let result = HungarianSolver::solve(cost.view(), 0.5);
        let mut pairs = result.assignments.clone();
        pairs.sort();
        assert_eq!(pairs, vec![(0, 1), (1, 0)]);
    }

    #[test]
    fn test_cost_limit_filters_solver_output() {
        let result = solve_iou(array![[0.3]].view(), 0.5);
        assert!(result.assignments.is_empty());
        assert_eq!(result.unassigned_detections, vec![0]);
        assert_eq!(result.unassigned_tracks, vec![0]);

        let result = solve_iou(array![[0.43]].view(), 0.35);
        assert_eq!(result.assignments, vec![(0, 0)]);
    }

    #[test]
    fn test_rectangular_matrices() {
        // More detections than tracks
        let result = solve_iou(array![[0.1], [0.7], [0.6]].view(), 0.5);
        assert_eq!(result.assignments, vec![(1, 0)]);
        assert_eq!(result.unassigned_detections, vec![0, 2]);

        // More tracks than detections
        let result = solve_iou(array![[0.2, 0.9, 0.4]].view(), 0.5);
        assert_eq!(result.assignments, vec![(0, 1)]);
        assert_eq!(result.unassigned_tracks, vec![0, 2]);
    }

    #[test]
    fn test_assignment_is_bipartite() {
        let cost = Array2::from_elem((4, 3), 0.1f32);
        let result = HungarianSolver::solve(cost.view(), 0.5);
        assert_eq!(result.assignments.len(), 3);

        let mut dets: Vec<_> = result.assignments.iter().map(|a| a.0).collect();
        let mut tracks: Vec<_> = result.assignments.iter().map(|a| a.1).collect();
        dets.dedup();
        tracks.sort();
        tracks.dedup();
        assert_eq!(dets.len(), 3);
        assert_eq!(tracks.len(), 3);
        assert_eq!(result.unassigned_detections.len(), 1);
    }

    #[test]
    fn test_iou_cost_matrix() {
        let cost = iou_cost_matrix(array![[1.0, 0.25], [0.0, 0.5]].view());
        assert_eq!(cost, array![[0.0, 0.75], [1.0, 0.5]]);
    }
}
