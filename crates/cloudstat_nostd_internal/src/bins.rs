//! Implements bin-edge handling used for distance binning and for histogram
//! buckets. Bin intervals are half-open: a value equal to a boundary belongs
//! to the higher bin, and the rightmost edge is exclusive.

use alloc::vec::Vec;

/// Check that a slice is usable as a sequence of bin edges: at least one
/// bin (two edges), every edge finite, and strictly increasing.
pub fn validate_bin_edges(edges: &[f64]) -> Result<(), &'static str> {
    if edges.len() < 2 {
        return Err("at least two bin edges are needed to define a bin");
    }
    // this also rules out NaN edges, which the monotonicity check below
    // can't catch
    if !edges.iter().all(|x| x.is_finite()) {
        return Err("every bin edge must be a finite value");
    }
    if edges.windows(2).any(|pair| pair[1] <= pair[0]) {
        return Err("each bin edge must be larger than the one before it");
    }
    Ok(())
}

/// identify the index of the bin where `x` lies.
///
/// `bin_edges` must hold `n_bins + 1` monotonically increasing entries. The
/// ith bin covers the interval `bin_edges[i] <= x < bin_edges[i+1]`. Returns
/// `None` when `x` lies outside every bin (including when `x` is NaN).
///
/// This is a binary search. We may eventually want to assess the cost of
/// branch mispredictions against a linear scan for small edge counts.
#[inline]
pub fn identify_bin_index(x: f64, bin_edges: &[f64]) -> Option<usize> {
    // index of the first edge greater than x (a NaN comparison is always
    // false, so a NaN input maps to 0 and gets rejected below)
    let first_greater = bin_edges.partition_point(|&edge| edge <= x);
    if first_greater == 0 || first_greater == bin_edges.len() {
        None
    } else {
        Some(first_greater - 1)
    }
}

/// Distance bin edges stored as squared distances, so that the pair loop can
/// bin squared separations without ever taking a square root.
///
/// Negative input edges are kept verbatim: squaring them would break
/// monotonicity, and since distances are non-negative it doesn't matter how
/// the negative part of the axis is carved up.
#[derive(Clone, Debug)]
pub struct SquaredDistanceBins {
    squared_edges: Vec<f64>,
}

impl SquaredDistanceBins {
    pub fn from_unsquared(edges: &[f64]) -> Result<Self, &'static str> {
        validate_bin_edges(edges)?;
        let squared_edges = edges
            .iter()
            .map(|&e| if e < 0.0 { e } else { e * e })
            .collect();
        Ok(Self { squared_edges })
    }

    #[inline]
    pub fn bin_index(&self, dist_sqr: f64) -> Option<usize> {
        identify_bin_index(dist_sqr, &self.squared_edges)
    }

    pub fn n_bins(&self) -> usize {
        self.squared_edges.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_edges() {
        // not enough edges
        assert!(validate_bin_edges(&[0.0]).is_err());

        // unsorted edges
        assert!(validate_bin_edges(&[2.0, 1.0]).is_err());
        assert!(validate_bin_edges(&[0.0, 3.0, 2.0]).is_err());
        assert!(validate_bin_edges(&[0.0, 1.0, 1.0]).is_err());

        // non-finite values
        assert!(validate_bin_edges(&[f64::NAN, 10.0]).is_err());
        assert!(validate_bin_edges(&[0.0, f64::INFINITY]).is_err());
    }

    #[test]
    fn bin_indexing() {
        let edges = [0.0, 2.0, 4.0, 6.0, 8.0, 10.0];

        // valid values
        assert_eq!(identify_bin_index(0.0, &edges), Some(0));
        assert_eq!(identify_bin_index(1.9, &edges), Some(0));
        assert_eq!(identify_bin_index(2.0, &edges), Some(1));
        assert_eq!(identify_bin_index(3.9, &edges), Some(1));
        assert_eq!(identify_bin_index(8.0, &edges), Some(4));
        assert_eq!(identify_bin_index(9.9, &edges), Some(4));

        // boundary conditions
        assert_eq!(identify_bin_index(10.0, &edges), None); // max is exclusive
        assert_eq!(identify_bin_index(-0.1, &edges), None); // below min
        assert_eq!(identify_bin_index(10.1, &edges), None); // above max

        // non-finite values never land in a bin
        assert_eq!(identify_bin_index(f64::NAN, &edges), None);
        assert_eq!(identify_bin_index(f64::INFINITY, &edges), None);
        assert_eq!(identify_bin_index(f64::NEG_INFINITY, &edges), None);
    }

    #[test]
    fn irregular_bin_indexing() {
        let edges = [-5.0, 0.0, 2.0, 3.0];

        assert_eq!(identify_bin_index(-5.0, &edges), Some(0));
        assert_eq!(identify_bin_index(-2.5, &edges), Some(0));
        assert_eq!(identify_bin_index(-0.1, &edges), Some(0));
        assert_eq!(identify_bin_index(0.0, &edges), Some(1));
        assert_eq!(identify_bin_index(1.9, &edges), Some(1));
        assert_eq!(identify_bin_index(2.0, &edges), Some(2));
        assert_eq!(identify_bin_index(2.9, &edges), Some(2));

        assert_eq!(identify_bin_index(3.0, &edges), None);
        assert_eq!(identify_bin_index(-5.1, &edges), None);
    }

    #[test]
    fn squared_distance_bins() {
        let bins = SquaredDistanceBins::from_unsquared(&[-1.0, 1.0, 2.0, 10.0]).unwrap();
        assert_eq!(bins.n_bins(), 3);

        // the negative edge is retained verbatim, so a zero separation lands
        // in the first bin
        assert_eq!(bins.bin_index(0.0), Some(0));
        assert_eq!(bins.bin_index(0.99), Some(0));
        assert_eq!(bins.bin_index(1.0), Some(1));
        assert_eq!(bins.bin_index(3.9), Some(1));
        assert_eq!(bins.bin_index(4.0), Some(2));
        assert_eq!(bins.bin_index(99.9), Some(2));
        assert_eq!(bins.bin_index(100.0), None);
    }
}
