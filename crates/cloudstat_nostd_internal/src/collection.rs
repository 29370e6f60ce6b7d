//! Defines the per-distance-bin accumulator collections.
//!
//! A collection owns one accumulator state per distance bin and exposes a
//! uniform contract (resetting, adding binned entries, merging, and copying
//! raw state to/from caller-provided buffers). The pair loop and the
//! parallel consolidation machinery only ever talk to this contract.

use crate::accumulator::ScalarAccum;
use crate::bins::{identify_bin_index, validate_bin_edges};
use alloc::borrow::ToOwned;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

/// The uniform interface shared by all accumulator collections.
///
/// # Buffer layout
/// `copy_*_vals` / `import_*_vals` exchange raw state through flat buffers.
/// For a scalar collection, component `j` of the accumulator for distance
/// bin `s` lives at `buf[s + j * n_distance_bins]` (each component forms a
/// contiguous block across distance bins). Histogram collections store their
/// counts with the distance bin as the outer index and the data bin as the
/// inner index.
pub trait AccumCollection: Clone {
    /// whether entries must be added through [`Self::add_entry_weighted`]
    fn requires_weight(&self) -> bool;

    fn n_distance_bins(&self) -> usize;

    /// reset the contents (as though the collection were just constructed)
    fn purge(&mut self);

    fn add_entry(&mut self, distance_bin: usize, val: f64);

    fn add_entry_weighted(&mut self, distance_bin: usize, val: f64, weight: f64);

    /// Update the values of `self` to include the values from `other`.
    ///
    /// Panics when the two collections don't have matching shapes; that can
    /// only happen through misuse of internal contracts (the public entry
    /// points construct every clone from a single prototype).
    fn merge(&mut self, other: &Self);

    /// ordered `(name, entries_per_distance_bin)` pairs for the real-valued
    /// output components
    fn flt_val_props(&self) -> Vec<(String, usize)>;

    /// ordered `(name, entries_per_distance_bin)` pairs for the
    /// integer-valued output components
    fn i64_val_props(&self) -> Vec<(String, usize)>;

    fn copy_flt_vals(&self, out: &mut [f64]);
    fn copy_i64_vals(&self, out: &mut [i64]);
    fn import_flt_vals(&mut self, vals: &[f64]);
    fn import_i64_vals(&mut self, vals: &[i64]);

    /// total number of real values written by [`Self::copy_flt_vals`]
    fn total_flt_vals(&self) -> usize {
        let per_bin: usize = self.flt_val_props().iter().map(|(_, n)| n).sum();
        per_bin * self.n_distance_bins()
    }

    /// total number of integers written by [`Self::copy_i64_vals`]
    fn total_i64_vals(&self) -> usize {
        let per_bin: usize = self.i64_val_props().iter().map(|(_, n)| n).sum();
        per_bin * self.n_distance_bins()
    }
}

/// Wraps a flat array holding one scalar accumulator per distance bin.
#[derive(Clone, Debug, PartialEq)]
pub struct ScalarAccumCollection<A: ScalarAccum> {
    accum_list: Vec<A>,
}

impl<A: ScalarAccum> ScalarAccumCollection<A> {
    /// build a collection holding a clone of `prototype` for every bin
    pub fn from_prototype(prototype: A, n_distance_bins: usize) -> Result<Self, &'static str> {
        if n_distance_bins == 0 {
            Err("n_distance_bins must be positive")
        } else {
            Ok(Self {
                accum_list: vec![prototype; n_distance_bins],
            })
        }
    }

    pub fn stat_name(&self) -> String {
        self.accum_list[0].stat_name()
    }

    /// direct access to a single bin's accumulator (mostly for tests)
    pub fn bin_accum(&self, distance_bin: usize) -> &A {
        &self.accum_list[distance_bin]
    }
}

impl<A: ScalarAccum> AccumCollection for ScalarAccumCollection<A> {
    fn requires_weight(&self) -> bool {
        self.accum_list[0].requires_weight()
    }

    fn n_distance_bins(&self) -> usize {
        self.accum_list.len()
    }

    fn purge(&mut self) {
        for accum in self.accum_list.iter_mut() {
            accum.reset();
        }
    }

    #[inline]
    fn add_entry(&mut self, distance_bin: usize, val: f64) {
        self.accum_list[distance_bin].add_entry(val);
    }

    #[inline]
    fn add_entry_weighted(&mut self, distance_bin: usize, val: f64, weight: f64) {
        self.accum_list[distance_bin].add_entry_weighted(val, weight);
    }

    fn merge(&mut self, other: &Self) {
        assert_eq!(
            self.accum_list.len(),
            other.accum_list.len(),
            "there seemed to be a mismatch during consolidation",
        );
        for (accum, other_accum) in self.accum_list.iter_mut().zip(other.accum_list.iter()) {
            accum.merge(other_accum);
        }
    }

    fn flt_val_props(&self) -> Vec<(String, usize)> {
        // every component of a scalar accumulator stores 1 entry per bin
        self.accum_list[0]
            .flt_val_names()
            .into_iter()
            .map(|name| (name, 1))
            .collect()
    }

    fn i64_val_props(&self) -> Vec<(String, usize)> {
        self.accum_list[0]
            .i64_val_names()
            .into_iter()
            .map(|name| (name, 1))
            .collect()
    }

    fn copy_flt_vals(&self, out: &mut [f64]) {
        let n_bins = self.accum_list.len();
        let n_vals = self.accum_list[0].flt_val_names().len();
        for (i, accum) in self.accum_list.iter().enumerate() {
            for j in 0..n_vals {
                out[i + j * n_bins] = accum.get_f64(j);
            }
        }
    }

    fn copy_i64_vals(&self, out: &mut [i64]) {
        let n_bins = self.accum_list.len();
        let n_vals = self.accum_list[0].i64_val_names().len();
        for (i, accum) in self.accum_list.iter().enumerate() {
            for j in 0..n_vals {
                out[i + j * n_bins] = accum.get_i64(j);
            }
        }
    }

    fn import_flt_vals(&mut self, vals: &[f64]) {
        let n_bins = self.accum_list.len();
        let n_vals = self.accum_list[0].flt_val_names().len();
        for (i, accum) in self.accum_list.iter_mut().enumerate() {
            for j in 0..n_vals {
                accum.set_f64(j, vals[i + j * n_bins]);
            }
        }
    }

    fn import_i64_vals(&mut self, vals: &[i64]) {
        let n_bins = self.accum_list.len();
        let n_vals = self.accum_list[0].i64_val_names().len();
        for (i, accum) in self.accum_list.iter_mut().enumerate() {
            for j in 0..n_vals {
                accum.set_i64(j, vals[i + j * n_bins]);
            }
        }
    }
}

/// Tracks a 2D histogram: the outer axis is the distance bin and the inner
/// axis is a bucketing of the accumulated value itself. Counts are integers.
///
/// The count for data bin `d` in distance bin `s` is stored at index
/// `d + s * n_data_bins`.
#[derive(Clone, Debug, PartialEq)]
pub struct HistogramAccumCollection {
    n_distance_bins: usize,
    n_data_bins: usize,
    bin_counts: Vec<i64>,
    data_bin_edges: Vec<f64>,
}

impl HistogramAccumCollection {
    pub fn new(n_distance_bins: usize, data_bin_edges: &[f64]) -> Result<Self, &'static str> {
        if n_distance_bins == 0 {
            return Err("n_distance_bins must be positive");
        }
        validate_bin_edges(data_bin_edges)?;
        let n_data_bins = data_bin_edges.len() - 1;
        Ok(Self {
            n_distance_bins,
            n_data_bins,
            bin_counts: vec![0; n_data_bins * n_distance_bins],
            data_bin_edges: data_bin_edges.to_vec(),
        })
    }

    pub fn stat_name(&self) -> String {
        "histogram".to_owned()
    }

    pub fn n_data_bins(&self) -> usize {
        self.n_data_bins
    }

    /// the sum of every count (handy for conservation checks)
    pub fn total_count(&self) -> i64 {
        self.bin_counts.iter().sum()
    }
}

impl AccumCollection for HistogramAccumCollection {
    fn requires_weight(&self) -> bool {
        false
    }

    fn n_distance_bins(&self) -> usize {
        self.n_distance_bins
    }

    fn purge(&mut self) {
        self.bin_counts.fill(0);
    }

    #[inline]
    fn add_entry(&mut self, distance_bin: usize, val: f64) {
        if let Some(data_bin) = identify_bin_index(val, &self.data_bin_edges) {
            self.bin_counts[data_bin + distance_bin * self.n_data_bins] += 1;
        }
    }

    #[inline]
    fn add_entry_weighted(&mut self, distance_bin: usize, val: f64, _weight: f64) {
        // entries are counted, not weighted
        self.add_entry(distance_bin, val);
    }

    fn merge(&mut self, other: &Self) {
        assert!(
            self.n_distance_bins == other.n_distance_bins
                && self.n_data_bins == other.n_data_bins,
            "there seemed to be a mismatch during consolidation",
        );
        // we simply assume the data_bin_edges contents are consistent
        for (count, &other_count) in self.bin_counts.iter_mut().zip(other.bin_counts.iter()) {
            *count += other_count;
        }
    }

    fn flt_val_props(&self) -> Vec<(String, usize)> {
        Vec::new()
    }

    fn i64_val_props(&self) -> Vec<(String, usize)> {
        vec![("bin_counts".to_owned(), self.n_data_bins)]
    }

    fn copy_flt_vals(&self, _out: &mut [f64]) {}

    fn copy_i64_vals(&self, out: &mut [i64]) {
        out[..self.bin_counts.len()].copy_from_slice(&self.bin_counts);
    }

    fn import_flt_vals(&mut self, _vals: &[f64]) {}

    fn import_i64_vals(&mut self, vals: &[i64]) {
        let n = self.bin_counts.len();
        self.bin_counts.copy_from_slice(&vals[..n]);
    }
}

/// The weighted counterpart of [`HistogramAccumCollection`]: each data bin
/// tracks a sum of weights rather than an integer count.
#[derive(Clone, Debug, PartialEq)]
pub struct WeightedHistogramAccumCollection {
    n_distance_bins: usize,
    n_data_bins: usize,
    bin_weights: Vec<f64>,
    data_bin_edges: Vec<f64>,
}

impl WeightedHistogramAccumCollection {
    pub fn new(n_distance_bins: usize, data_bin_edges: &[f64]) -> Result<Self, &'static str> {
        if n_distance_bins == 0 {
            return Err("n_distance_bins must be positive");
        }
        validate_bin_edges(data_bin_edges)?;
        let n_data_bins = data_bin_edges.len() - 1;
        Ok(Self {
            n_distance_bins,
            n_data_bins,
            bin_weights: vec![0.0; n_data_bins * n_distance_bins],
            data_bin_edges: data_bin_edges.to_vec(),
        })
    }

    pub fn stat_name(&self) -> String {
        "weightedhistogram".to_owned()
    }

    pub fn n_data_bins(&self) -> usize {
        self.n_data_bins
    }
}

impl AccumCollection for WeightedHistogramAccumCollection {
    fn requires_weight(&self) -> bool {
        true
    }

    fn n_distance_bins(&self) -> usize {
        self.n_distance_bins
    }

    fn purge(&mut self) {
        self.bin_weights.fill(0.0);
    }

    fn add_entry(&mut self, _distance_bin: usize, _val: f64) {
        panic!("a weight must be provided");
    }

    #[inline]
    fn add_entry_weighted(&mut self, distance_bin: usize, val: f64, weight: f64) {
        if let Some(data_bin) = identify_bin_index(val, &self.data_bin_edges) {
            self.bin_weights[data_bin + distance_bin * self.n_data_bins] += weight;
        }
    }

    fn merge(&mut self, other: &Self) {
        assert!(
            self.n_distance_bins == other.n_distance_bins
                && self.n_data_bins == other.n_data_bins,
            "there seemed to be a mismatch during consolidation",
        );
        for (weight, &other_weight) in self.bin_weights.iter_mut().zip(other.bin_weights.iter()) {
            *weight += other_weight;
        }
    }

    fn flt_val_props(&self) -> Vec<(String, usize)> {
        vec![("bin_weights".to_owned(), self.n_data_bins)]
    }

    fn i64_val_props(&self) -> Vec<(String, usize)> {
        Vec::new()
    }

    fn copy_flt_vals(&self, out: &mut [f64]) {
        out[..self.bin_weights.len()].copy_from_slice(&self.bin_weights);
    }

    fn copy_i64_vals(&self, _out: &mut [i64]) {}

    fn import_flt_vals(&mut self, vals: &[f64]) {
        let n = self.bin_weights.len();
        self.bin_weights.copy_from_slice(&vals[..n]);
    }

    fn import_i64_vals(&mut self, _vals: &[i64]) {}
}
