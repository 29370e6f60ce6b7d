#![allow(dead_code)]

// the reason this is named mod.rs has to do with some complexities of how
// testing is handled
//
// we are following the advice of the rust book
// https://doc.rust-lang.org/book/ch11-03-test-organization.html#submodules-in-integration-tests

use std::collections::HashMap;

// based on numpy!
// https://numpy.org/doc/stable/reference/generated/numpy.isclose.html
pub fn isclose(actual: f64, ref_val: f64, rtol: f64, atol: f64) -> bool {
    let actual_nan = actual.is_nan();
    let ref_nan = ref_val.is_nan();
    if actual_nan || ref_nan {
        actual_nan && ref_nan
    } else {
        (actual - ref_val).abs() <= (atol + rtol * ref_val.abs())
    }
}

/// assert that the named float vectors in `actual` match `expected` to the
/// specified per-name `[rtol, atol]` tolerances
pub fn assert_consistent_results(
    actual: &HashMap<String, Vec<f64>>,
    expected: &HashMap<&'static str, Vec<f64>>,
    rtol_atol_vals: &HashMap<&'static str, [f64; 2]>,
) {
    for (key, [rtol, atol]) in rtol_atol_vals {
        let actual_vec = actual
            .get(*key)
            .unwrap_or_else(|| panic!("`actual` is missing the '{key}' entry"));
        let expected_vec = &expected[key];
        assert_eq!(
            actual_vec.len(),
            expected_vec.len(),
            "the lengths of the '{key}' entry in actual and expected are unequal",
        );

        for i in 0..expected_vec.len() {
            let actual_val = actual_vec[i];
            let ref_val = expected_vec[i];
            assert!(
                isclose(actual_val, ref_val, *rtol, *atol),
                "map[\"{key}\"][{i}] values aren't equal to within rtol={rtol}, atol={atol}\
                \n  actual   = {actual_val}\
                \n  expected = {ref_val}",
            );
        }
    }
}

/// A naive reference implementation of the binned pairwise reduction: a
/// plain double loop that tracks the per-bin sum and count.
///
/// `positions` and `values` are flat `(3, n)`-shaped (or `(1, n)` for
/// scalar values) buffers; pass `values_b`/`positions_b` as `None` for an
/// auto calculation.
pub struct NaiveBinnedSums {
    pub counts: Vec<i64>,
    pub sums: Vec<f64>,
}

pub fn naive_binned_sums(
    positions_a: &ndarray::Array2<f64>,
    values_a: &ndarray::Array2<f64>,
    points_b: Option<(&ndarray::Array2<f64>, &ndarray::Array2<f64>)>,
    bin_edges: &[f64],
    vec_diff: bool,
) -> NaiveBinnedSums {
    let n_bins = bin_edges.len() - 1;
    let mut counts = vec![0_i64; n_bins];
    let mut sums = vec![0.0; n_bins];

    let (positions_b, values_b) = match points_b {
        Some((p, v)) => (p, v),
        None => (positions_a, values_a),
    };
    let auto = points_b.is_none();

    // bin in squared-distance space (negative edges kept as-is), matching
    // the production code exactly so that count comparisons can be strict
    let squared_edges: Vec<f64> = bin_edges
        .iter()
        .map(|&e| if e < 0.0 { e } else { e * e })
        .collect();

    let n_a = positions_a.shape()[1];
    let n_b = positions_b.shape()[1];
    for i_a in 0..n_a {
        let i_b_start = if auto { i_a + 1 } else { 0 };
        for i_b in i_b_start..n_b {
            let mut dist_sqr = 0.0;
            for dim in 0..3 {
                let diff = positions_a[[dim, i_a]] - positions_b[[dim, i_b]];
                dist_sqr += diff * diff;
            }
            if dist_sqr < squared_edges[0] || dist_sqr >= squared_edges[n_bins] {
                continue;
            }
            let bin = squared_edges[..n_bins]
                .iter()
                .rposition(|&edge| edge <= dist_sqr)
                .unwrap();

            let stat_value = if vec_diff {
                let mut diff_sqr = 0.0;
                for comp in 0..3 {
                    let diff = values_a[[comp, i_a]] - values_b[[comp, i_b]];
                    diff_sqr += diff * diff;
                }
                diff_sqr.sqrt()
            } else {
                values_a[[0, i_a]] * values_b[[0, i_b]]
            };
            counts[bin] += 1;
            sums[bin] += stat_value;
        }
    }
    NaiveBinnedSums { counts, sums }
}
