//! The top-level calculation entry points.

use crate::Error;
use crate::ops::EuclideanNorm;
use crate::parallel::{ParallelSpec, exec_binned_reduction};
use crate::stats::{ResolvedAccums, StatOutput, StatRequest, collect_outputs, resolve_stat_list};
use cloudstat_nostd_internal::{
    PairOperation, ScalarizeOp, SquaredDistanceBins, TakeComp0, UnstructuredPoints,
    dispatch_accum_variant,
};

/// run a calculation and return the finished accumulator
fn run_calculation<'a>(
    points_a: &UnstructuredPoints<'a>,
    points_b: Option<&UnstructuredPoints<'a>>,
    pairwise_op: &str,
    stat_list: &[StatRequest],
    bin_edges: &[f64],
    parallel_spec: &ParallelSpec,
) -> Result<ResolvedAccums, Error> {
    // check that the value channels suit the requested operation
    let check_comps = |required: usize, message: &'static str| {
        let mismatched = points_a.n_value_comps() != required
            || points_b.is_some_and(|p| p.n_value_comps() != required);
        if mismatched {
            Err(Error::invalid_input(message))
        } else {
            Ok(())
        }
    };

    // the operation name picks both the component-wise combination and the
    // scalarization that collapses it
    match pairwise_op {
        "sf" => {
            check_comps(3, "the \"sf\" operation requires 3 vector components per point")?;
            run_resolved::<EuclideanNorm>(
                points_a,
                points_b,
                PairOperation::ElementwiseSub,
                stat_list,
                bin_edges,
                parallel_spec,
            )
        }
        "correlate" => {
            check_comps(
                1,
                "the \"correlate\" operation requires a single scalar channel per point",
            )?;
            run_resolved::<TakeComp0>(
                points_a,
                points_b,
                PairOperation::ElementwiseMultiply,
                stat_list,
                bin_edges,
                parallel_spec,
            )
        }
        _ => Err(Error::invalid_input(
            "pairwise_op must be \"sf\" or \"correlate\"",
        )),
    }
}

fn run_resolved<'a, S: ScalarizeOp>(
    points_a: &UnstructuredPoints<'a>,
    points_b: Option<&UnstructuredPoints<'a>>,
    pair_op: PairOperation,
    stat_list: &[StatRequest],
    bin_edges: &[f64],
    parallel_spec: &ParallelSpec,
) -> Result<ResolvedAccums, Error> {
    let squared_distance_bins =
        SquaredDistanceBins::from_unsquared(bin_edges).map_err(Error::invalid_input)?;

    let mut resolved = resolve_stat_list(stat_list, squared_distance_bins.n_bins())?;
    if resolved.requires_weight() {
        // per-pair weights aren't currently threaded through the pair loop;
        // the weighted accumulators remain usable through their own
        // interface
        return Err(Error::invalid_input(
            "weighted statistics require per-pair weights, which pairwise \
             calculations don't currently supply",
        ));
    }

    match &mut resolved {
        ResolvedAccums::Single(variant) => {
            // pick the concrete collection kind once, so the pair loop is
            // compiled (and optimized) separately for each statistic
            dispatch_accum_variant!(variant, collection => exec_binned_reduction::<_, S>(
                collection,
                points_a,
                points_b,
                &squared_distance_bins,
                pair_op,
                parallel_spec,
            ))?
        }
        ResolvedAccums::Compound(compound) => exec_binned_reduction::<_, S>(
            compound,
            points_a,
            points_b,
            &squared_distance_bins,
            pair_op,
            parallel_spec,
        )?,
    }
    Ok(resolved)
}

/// Compute binned pairwise statistics over one or two point clouds.
///
/// Pairs of points are binned by their spatial separation according to
/// `bin_edges` (pairs separated by more than the last edge, or less than the
/// first, contribute nothing). For each pair inside a bin, `pairwise_op`
/// determines the accumulated quantity:
/// - `"sf"`: the magnitude of the difference between the two vector values
///   (the first-order structure function integrand)
/// - `"correlate"`: the product of the two scalar values
///
/// When `points_b` is `None`, every unique pair within `points_a` is
/// considered; otherwise every pair between the two sets is.
///
/// The finished state of every requested statistic is written to the output
/// buffers, which the caller must size according to [`crate::output_props`]:
/// for each component of each statistic (in declared order) a contiguous
/// block of `n_distance_bins * entries_per_bin` values.
#[allow(clippy::too_many_arguments)]
pub fn calc_pairwise_stats<'a>(
    points_a: &UnstructuredPoints<'a>,
    points_b: Option<&UnstructuredPoints<'a>>,
    pairwise_op: &str,
    stat_list: &[StatRequest],
    bin_edges: &[f64],
    parallel_spec: &ParallelSpec,
    out_flt_vals: &mut [f64],
    out_i64_vals: &mut [i64],
) -> Result<(), Error> {
    // reject bad edges and buffer sizes before doing any real work
    let n_distance_bins = SquaredDistanceBins::from_unsquared(bin_edges)
        .map_err(Error::invalid_input)?
        .n_bins();
    let resolved = resolve_stat_list(stat_list, n_distance_bins)?;
    if out_flt_vals.len() != resolved.total_flt_vals() {
        return Err(Error::buffer_size(
            "the real-valued output buffer",
            out_flt_vals.len(),
            resolved.total_flt_vals(),
        ));
    }
    if out_i64_vals.len() != resolved.total_i64_vals() {
        return Err(Error::buffer_size(
            "the integer-valued output buffer",
            out_i64_vals.len(),
            resolved.total_i64_vals(),
        ));
    }

    let finished = run_calculation(
        points_a,
        points_b,
        pairwise_op,
        stat_list,
        bin_edges,
        parallel_spec,
    )?;
    finished.copy_flt_vals(out_flt_vals);
    finished.copy_i64_vals(out_i64_vals);
    Ok(())
}

/// Like [`calc_pairwise_stats`], but unpacks the outputs of each requested
/// statistic into named per-component vectors instead of writing to flat
/// caller-provided buffers.
pub fn calc_pairwise_stat_outputs<'a>(
    points_a: &UnstructuredPoints<'a>,
    points_b: Option<&UnstructuredPoints<'a>>,
    pairwise_op: &str,
    stat_list: &[StatRequest],
    bin_edges: &[f64],
    parallel_spec: &ParallelSpec,
) -> Result<Vec<StatOutput>, Error> {
    let finished = run_calculation(
        points_a,
        points_b,
        pairwise_op,
        stat_list,
        bin_edges,
        parallel_spec,
    )?;
    Ok(collect_outputs(&finished))
}
