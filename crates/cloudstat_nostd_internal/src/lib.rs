//! Core machinery for binned pairwise statistics over 3D point clouds.
//!
//! This crate is an implementation detail of the `cloudstat` crate and makes
//! no stability guarantees. It is `no_std` (alloc-only): anything that needs
//! the standard library, like the thread-based driver or the sqrt-taking
//! scalarization ops, lives in `cloudstat` itself. Fallible operations
//! report `&'static str` errors; the public crate wraps them in its proper
//! error type.

#![no_std]
extern crate alloc;

#[cfg(test)]
extern crate std;

mod accumulator;
mod apply_points;
mod bins;
mod collection;
mod compound;
mod misc;
mod partition;

pub use accumulator::{
    CentralMoment, OriginMoment, ScalarAccum, WeightedCentralMoment, WeightedOriginMoment,
};
pub use apply_points::{PairOperation, ScalarizeOp, TakeComp0, UnstructuredPoints, process_task};
pub use bins::{SquaredDistanceBins, identify_bin_index, validate_bin_edges};
pub use collection::{
    AccumCollection, HistogramAccumCollection, ScalarAccumCollection,
    WeightedHistogramAccumCollection,
};
pub use compound::{AccumColVariant, CompoundAccumCollection};
pub use partition::{AutoPartition, CrossPartition, PartitionPlan, StatTask, TaskIter, chunk_slice};
