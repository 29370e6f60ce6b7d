//! Runs a binned pairwise reduction, optionally across worker threads.
//!
//! The threading model is deliberately simple: the tiling of the pair matrix
//! is fixed up front, each worker gets a statically-assigned contiguous run
//! of tiles and a private clone of the accumulator, and the clones are
//! merged in worker order once every thread has joined. There is no work
//! stealing; the partitioner over-decomposes instead (a few tiles per
//! worker) to absorb the load imbalance between tile shapes.
//!
//! Merging reorders floating-point additions, so results are deterministic
//! for a fixed worker count but may differ in the last few ulps across
//! worker counts.

use crate::Error;
use cloudstat_nostd_internal::{
    AccumCollection, PairOperation, PartitionPlan, ScalarizeOp, SquaredDistanceBins, StatTask,
    UnstructuredPoints, process_task,
};
use log::debug;

/// the environment variable consulted when [`ParallelSpec::nproc`] is 0
pub const NPROC_ENV_VAR: &str = "CLOUDSTAT_NPROC";

/// Specifies how a calculation should be parallelized.
#[derive(Clone, Copy, Debug)]
pub struct ParallelSpec {
    /// the number of workers. 0 means "read [`NPROC_ENV_VAR`] from the
    /// environment" (falling back to 1 when it's absent or unusable)
    pub nproc: usize,
    /// keep the worker decomposition (and therefore the exact output
    /// values) but run every worker's share on the calling thread
    pub force_sequential: bool,
}

impl ParallelSpec {
    pub fn serial() -> Self {
        Self {
            nproc: 1,
            force_sequential: false,
        }
    }
}

/// resolve the requested worker count (the environment is consulted once,
/// at entry)
fn nominal_nproc(parallel_spec: &ParallelSpec) -> usize {
    if parallel_spec.nproc != 0 {
        return parallel_spec.nproc;
    }
    match std::env::var(NPROC_ENV_VAR) {
        Ok(text) => match text.trim().parse::<i64>() {
            Ok(n) if n > 0 => n as usize,
            _ => 1,
        },
        Err(_) => 1,
    }
}

/// Update `accumulators` with the contributions from every pair of points.
///
/// `accumulators` must be freshly purged: each worker starts from a clone
/// of it, and the merged result overwrites it.
pub(crate) fn exec_binned_reduction<'a, A, S>(
    accumulators: &mut A,
    points_a: &UnstructuredPoints<'a>,
    points_b: Option<&UnstructuredPoints<'a>>,
    squared_distance_bins: &SquaredDistanceBins,
    pair_op: PairOperation,
    parallel_spec: &ParallelSpec,
) -> Result<(), Error>
where
    A: AccumCollection + Send,
    S: ScalarizeOp,
{
    if parallel_spec.nproc == 1 {
        // a single task covering the whole pair matrix
        let full_task = match points_b {
            None => StatTask {
                start_a: 0,
                stop_a: points_a.n_points(),
                start_b: 0,
                stop_b: 0,
            },
            Some(points_b) => StatTask {
                start_a: 0,
                stop_a: points_a.n_points(),
                start_b: 0,
                stop_b: points_b.n_points(),
            },
        };
        process_task::<A, S>(
            accumulators,
            &full_task,
            points_a,
            points_b.unwrap_or(points_a),
            squared_distance_bins,
            pair_op,
        );
        return Ok(());
    }

    let nominal_nproc = nominal_nproc(parallel_spec);
    if points_b.is_none() && nominal_nproc > 60 {
        // the tiling strategy should be rethought before throwing this many
        // workers at one triangular matrix
        return Err(Error::param_range("nproc", nominal_nproc as i64, 1, 60));
    }

    let plan = PartitionPlan::new(
        nominal_nproc,
        points_a.n_points(),
        points_b.map(|p| p.n_points()),
        false,
    )
    .map_err(Error::invalid_input)?;
    let effective_nproc = plan.effective_nproc();
    debug!(
        "pairwise reduction: nominal_nproc={}, n_partitions={}, effective_nproc={}",
        nominal_nproc,
        plan.n_partitions(),
        effective_nproc,
    );

    let points_b_or_a = points_b.unwrap_or(points_a);
    let mut worker_accums = vec![accumulators.clone(); effective_nproc];

    let run_worker = |worker_id: usize, local_accums: &mut A| {
        for task in plan.task_iter(worker_id) {
            process_task::<A, S>(
                local_accums,
                &task,
                points_a,
                points_b_or_a,
                squared_distance_bins,
                pair_op,
            );
        }
    };

    if parallel_spec.force_sequential || effective_nproc == 1 {
        for (worker_id, local_accums) in worker_accums.iter_mut().enumerate() {
            run_worker(worker_id, local_accums);
        }
    } else {
        let run_worker = &run_worker;
        std::thread::scope(|s| {
            for (worker_id, local_accums) in worker_accums.iter_mut().enumerate() {
                s.spawn(move || run_worker(worker_id, local_accums));
            }
        });
    }

    // deterministic left-fold in worker-id order
    for local_accums in &worker_accums {
        accumulators.merge(local_accums);
    }
    Ok(())
}
