//! Defines the point-set view and the pair loop that feeds the accumulators.
//!
//! The per-pair quantity is produced in two steps: a [`PairOperation`]
//! combines the two points' value channels into a vector, and a
//! [`ScalarizeOp`] collapses that vector to the accumulated scalar. Keeping
//! the second step a type parameter lets callers plug in scalarizations this
//! crate can't provide itself (taking a Euclidean norm needs `sqrt`, which
//! isn't available without the standard library).

use crate::bins::SquaredDistanceBins;
use crate::collection::AccumCollection;
use crate::misc::squared_diff_norm;
use crate::partition::StatTask;
use ndarray::{ArrayView2, s};

/// Specifies how a pair of per-point measurements combine into the value
/// vector handed to the scalarization.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PairOperation {
    /// component-wise difference of the two vector measurements (used for
    /// structure functions)
    ElementwiseSub,
    /// component-wise product of the two measurements (used for correlation
    /// functions)
    ElementwiseMultiply,
}

/// Collapses a pair's combined value vector to the scalar that actually
/// gets accumulated.
pub trait ScalarizeOp: Copy {
    fn scalarized_value(value: [f64; 3]) -> f64;
}

/// Keep only the first component (the scalar channel of a correlation).
#[derive(Clone, Copy)]
pub struct TakeComp0;

impl ScalarizeOp for TakeComp0 {
    #[inline(always)]
    fn scalarized_value(value: [f64; 3]) -> f64 {
        value[0]
    }
}

/// Collection of point properties.
///
/// We place the following constraints on the contained arrays:
/// - axis 0 is the slow axis. For `positions` it holds the 3 spatial
///   components; for `values` it holds either 3 vector components or a
///   single scalar channel.
/// - axis 1 is the fast axis. Its length is the number of points and it must
///   be contiguous (i.e. the stride is unity).
///
/// The caller owns the memory; we only ever read it.
#[derive(Clone)]
pub struct UnstructuredPoints<'a> {
    positions: ArrayView2<'a, f64>,
    values: ArrayView2<'a, f64>,
    n_points: usize,
    n_value_comps: usize,
}

impl<'a> UnstructuredPoints<'a> {
    pub fn new(
        positions: ArrayView2<'a, f64>,
        values: ArrayView2<'a, f64>,
    ) -> Result<UnstructuredPoints<'a>, &'static str> {
        let n_points = positions.shape()[1];
        let n_value_comps = values.shape()[0];
        if positions.is_empty() {
            Err("positions must hold at least 1 point")
        } else if positions.shape()[0] != 3 {
            Err("positions must have exactly 3 spatial dimensions")
        } else if positions.strides()[1] != 1 {
            Err("positions must be contiguous along the fast axis")
        } else if !(n_value_comps == 1 || n_value_comps == 3) {
            Err("values must hold either 1 scalar or 3 vector components per point")
        } else if values.shape()[1] != n_points {
            Err("values must have the same number of points as positions")
        } else if values.strides()[1] != 1 {
            Err("values must be contiguous along the fast axis")
        } else {
            Ok(Self {
                positions,
                values,
                n_points,
                n_value_comps,
            })
        }
    }

    pub fn n_points(&self) -> usize {
        self.n_points
    }

    /// 1 when the per-point measurement is a scalar, 3 when it's a vector
    pub fn n_value_comps(&self) -> usize {
        self.n_value_comps
    }

    /// a view restricted to the points in `[start, stop)`
    pub fn sliced(&self, start: usize, stop: usize) -> UnstructuredPoints<'a> {
        UnstructuredPoints {
            positions: self.positions.clone().slice_move(s![.., start..stop]),
            values: self.values.clone().slice_move(s![.., start..stop]),
            n_points: stop - start,
            n_value_comps: self.n_value_comps,
        }
    }
}

/// Feed the accumulators with contributions from every pair of points
/// belonging to one task.
///
/// `points_b` must be the same set as `points_a` for tasks produced by an
/// auto partitioning (rectangle tasks index into both halves of the same
/// set).
///
/// For each pair the squared distance between the points selects the
/// distance bin (out-of-range pairs contribute nothing); `pair_op` and the
/// scalarization `S` turn the two measurements into the accumulated scalar.
pub fn process_task<A: AccumCollection, S: ScalarizeOp>(
    accumulators: &mut A,
    task: &StatTask,
    points_a: &UnstructuredPoints,
    points_b: &UnstructuredPoints,
    squared_distance_bins: &SquaredDistanceBins,
    pair_op: PairOperation,
) {
    let task_points_a = points_a.sliced(task.start_a, task.stop_a);
    if task.is_auto() {
        match pair_op {
            PairOperation::ElementwiseSub => apply_accum_helper::<A, S, true, true>(
                accumulators,
                &task_points_a,
                &task_points_a,
                squared_distance_bins,
            ),
            PairOperation::ElementwiseMultiply => apply_accum_helper::<A, S, true, false>(
                accumulators,
                &task_points_a,
                &task_points_a,
                squared_distance_bins,
            ),
        }
    } else {
        let task_points_b = points_b.sliced(task.start_b, task.stop_b);
        match pair_op {
            PairOperation::ElementwiseSub => apply_accum_helper::<A, S, false, true>(
                accumulators,
                &task_points_a,
                &task_points_b,
                squared_distance_bins,
            ),
            PairOperation::ElementwiseMultiply => apply_accum_helper::<A, S, false, false>(
                accumulators,
                &task_points_a,
                &task_points_b,
                squared_distance_bins,
            ),
        }
    }
}

fn apply_accum_helper<A: AccumCollection, S: ScalarizeOp, const AUTO: bool, const SUBTRACT: bool>(
    accumulators: &mut A,
    points_a: &UnstructuredPoints,
    points_b: &UnstructuredPoints,
    squared_distance_bins: &SquaredDistanceBins,
) {
    let n_value_comps = points_a.n_value_comps;
    for i_a in 0..points_a.n_points {
        let i_b_start = if AUTO { i_a + 1 } else { 0 };
        for i_b in i_b_start..points_b.n_points {
            let distance_squared =
                squared_diff_norm(points_a.positions, points_b.positions, i_a, i_b, 3);
            if let Some(distance_bin) = squared_distance_bins.bin_index(distance_squared) {
                // unused components stay zero, which every ScalarizeOp
                // tolerates
                let mut value = [0.0; 3];
                for comp in 0..n_value_comps {
                    value[comp] = if SUBTRACT {
                        points_b.values[[comp, i_b]] - points_a.values[[comp, i_a]]
                    } else {
                        points_b.values[[comp, i_b]] * points_a.values[[comp, i_a]]
                    };
                }
                accumulators.add_entry(distance_bin, S::scalarized_value(value));
            }
        }
    }
}
