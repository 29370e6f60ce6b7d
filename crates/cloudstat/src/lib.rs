//! Binned pairwise statistics over 3D point clouds.
//!
//! Given one or two sets of points (each with positions and per-point
//! values), this crate enumerates pairs, bins each pair by its spatial
//! separation, and streams a per-pair quantity into a configurable family of
//! accumulators (moments, histograms). The canonical applications are
//! velocity structure functions and two-point correlation statistics over
//! irregularly distributed points.
//!
//! The accumulators are mergeable online algorithms, which is what makes
//! the parallelism model work: the pair matrix is tiled, workers fill
//! private accumulator clones, and the clones are merged at the end. The
//! same property lets callers combine results computed on different
//! machines by round-tripping the raw accumulator state.
//!
//! ```
//! use cloudstat::{ParallelSpec, StatRequest, UnstructuredPoints, calc_pairwise_stat_outputs};
//! use ndarray::ArrayView2;
//!
//! // 2 points separated by a distance of 1, with a velocity difference of
//! // magnitude 5
//! let positions = [0.0, 1.0, 0.0, 0.0, 0.0, 0.0];
//! let velocities = [0.0, 3.0, 0.0, 4.0, 0.0, 0.0];
//! let points = UnstructuredPoints::new(
//!     ArrayView2::from_shape((3, 2), &positions).unwrap(),
//!     ArrayView2::from_shape((3, 2), &velocities).unwrap(),
//! )
//! .unwrap();
//!
//! let outputs = calc_pairwise_stat_outputs(
//!     &points,
//!     None,
//!     "sf",
//!     &[StatRequest::new("mean")],
//!     &[0.0, 10.0],
//!     &ParallelSpec::serial(),
//! )
//! .unwrap();
//! assert_eq!(outputs[0].flt_vals["mean"], vec![5.0]);
//! assert_eq!(outputs[0].i64_vals["count"], vec![1]);
//! ```

mod error;
mod func;
mod ops;
mod parallel;
mod stats;

pub use error::Error;
pub use func::{calc_pairwise_stat_outputs, calc_pairwise_stats};
pub use ops::EuclideanNorm;
pub use parallel::{NPROC_ENV_VAR, ParallelSpec};
pub use stats::{StatOutput, StatRequest, output_props};

// re-export the pieces of the internal crate that appear in this crate's
// signatures (plus the accumulator machinery itself, for callers that feed
// entries directly, e.g. when distributing work across machines)
pub use cloudstat_nostd_internal::{
    AccumColVariant, AccumCollection, CentralMoment, CompoundAccumCollection,
    HistogramAccumCollection, OriginMoment, ScalarAccum, ScalarAccumCollection, ScalarizeOp,
    TakeComp0, UnstructuredPoints, WeightedCentralMoment, WeightedHistogramAccumCollection,
    WeightedOriginMoment,
};
