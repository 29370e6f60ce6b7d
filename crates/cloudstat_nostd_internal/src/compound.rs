//! A tagged union over every collection kind, plus the compound collection
//! that bundles several of them behind the same interface.
//!
//! The union exists so that the calculation can pick the concrete collection
//! kind once, up front, and then hand a monomorphized pair loop a concrete
//! type (see [`crate::dispatch_accum_variant`]). Going through the enum's
//! own [`AccumCollection`] impl instead would put a branch on the kind
//! inside the innermost loop.

use crate::accumulator::{
    CentralMoment, OriginMoment, WeightedCentralMoment, WeightedOriginMoment,
};
use crate::collection::{
    AccumCollection, HistogramAccumCollection, ScalarAccumCollection,
    WeightedHistogramAccumCollection,
};
use alloc::string::String;
use alloc::vec::Vec;

/// One accumulator collection of any supported kind.
#[derive(Clone, Debug)]
pub enum AccumColVariant {
    Mean(ScalarAccumCollection<CentralMoment<1>>),
    Variance(ScalarAccumCollection<CentralMoment<2>>),
    CMoment3(ScalarAccumCollection<CentralMoment<3>>),
    WeightedMean(ScalarAccumCollection<WeightedCentralMoment<1>>),
    WeightedVariance(ScalarAccumCollection<WeightedCentralMoment<2>>),
    OMoment(ScalarAccumCollection<OriginMoment>),
    WeightedOMoment(ScalarAccumCollection<WeightedOriginMoment>),
    Histogram(HistogramAccumCollection),
    WeightedHistogram(WeightedHistogramAccumCollection),
}

/// Destructure an [`AccumColVariant`], binding the concrete collection so
/// that `$body` is compiled once per kind.
#[macro_export]
macro_rules! dispatch_accum_variant {
    ($variant:expr, $collection:ident => $body:expr) => {
        match $variant {
            $crate::AccumColVariant::Mean($collection) => $body,
            $crate::AccumColVariant::Variance($collection) => $body,
            $crate::AccumColVariant::CMoment3($collection) => $body,
            $crate::AccumColVariant::WeightedMean($collection) => $body,
            $crate::AccumColVariant::WeightedVariance($collection) => $body,
            $crate::AccumColVariant::OMoment($collection) => $body,
            $crate::AccumColVariant::WeightedOMoment($collection) => $body,
            $crate::AccumColVariant::Histogram($collection) => $body,
            $crate::AccumColVariant::WeightedHistogram($collection) => $body,
        }
    };
}

impl AccumColVariant {
    pub fn stat_name(&self) -> String {
        dispatch_accum_variant!(self, c => c.stat_name())
    }
}

impl AccumCollection for AccumColVariant {
    fn requires_weight(&self) -> bool {
        dispatch_accum_variant!(self, c => c.requires_weight())
    }

    fn n_distance_bins(&self) -> usize {
        dispatch_accum_variant!(self, c => c.n_distance_bins())
    }

    fn purge(&mut self) {
        dispatch_accum_variant!(self, c => c.purge())
    }

    #[inline]
    fn add_entry(&mut self, distance_bin: usize, val: f64) {
        dispatch_accum_variant!(self, c => c.add_entry(distance_bin, val))
    }

    #[inline]
    fn add_entry_weighted(&mut self, distance_bin: usize, val: f64, weight: f64) {
        dispatch_accum_variant!(self, c => c.add_entry_weighted(distance_bin, val, weight))
    }

    fn merge(&mut self, other: &Self) {
        use AccumColVariant::*;
        match (self, other) {
            (Mean(c), Mean(o)) => c.merge(o),
            (Variance(c), Variance(o)) => c.merge(o),
            (CMoment3(c), CMoment3(o)) => c.merge(o),
            (WeightedMean(c), WeightedMean(o)) => c.merge(o),
            (WeightedVariance(c), WeightedVariance(o)) => c.merge(o),
            (OMoment(c), OMoment(o)) => c.merge(o),
            (WeightedOMoment(c), WeightedOMoment(o)) => c.merge(o),
            (Histogram(c), Histogram(o)) => c.merge(o),
            (WeightedHistogram(c), WeightedHistogram(o)) => c.merge(o),
            _ => panic!("tried to merge accumulator collections of different kinds"),
        }
    }

    fn flt_val_props(&self) -> Vec<(String, usize)> {
        dispatch_accum_variant!(self, c => c.flt_val_props())
    }

    fn i64_val_props(&self) -> Vec<(String, usize)> {
        dispatch_accum_variant!(self, c => c.i64_val_props())
    }

    fn copy_flt_vals(&self, out: &mut [f64]) {
        dispatch_accum_variant!(self, c => c.copy_flt_vals(out))
    }

    fn copy_i64_vals(&self, out: &mut [i64]) {
        dispatch_accum_variant!(self, c => c.copy_i64_vals(out))
    }

    fn import_flt_vals(&mut self, vals: &[f64]) {
        dispatch_accum_variant!(self, c => c.import_flt_vals(vals))
    }

    fn import_i64_vals(&mut self, vals: &[i64]) {
        dispatch_accum_variant!(self, c => c.import_i64_vals(vals))
    }
}

/// An ordered bundle of collections that itself satisfies the collection
/// contract. Every entry fans out to every member; raw-state buffers hold
/// each member's block back-to-back, in declaration order.
#[derive(Clone, Debug)]
pub struct CompoundAccumCollection {
    members: Vec<AccumColVariant>,
}

impl CompoundAccumCollection {
    pub fn new(members: Vec<AccumColVariant>) -> Result<Self, &'static str> {
        let Some(first) = members.first() else {
            return Err("a compound collection needs at least one member");
        };
        let n_distance_bins = first.n_distance_bins();
        if members
            .iter()
            .any(|m| m.n_distance_bins() != n_distance_bins)
        {
            return Err("all members must share the same distance binning");
        }
        Ok(Self { members })
    }

    pub fn members(&self) -> &[AccumColVariant] {
        &self.members
    }
}

impl AccumCollection for CompoundAccumCollection {
    fn requires_weight(&self) -> bool {
        self.members.iter().any(|m| m.requires_weight())
    }

    fn n_distance_bins(&self) -> usize {
        self.members[0].n_distance_bins()
    }

    fn purge(&mut self) {
        for member in self.members.iter_mut() {
            member.purge();
        }
    }

    #[inline]
    fn add_entry(&mut self, distance_bin: usize, val: f64) {
        for member in self.members.iter_mut() {
            member.add_entry(distance_bin, val);
        }
    }

    #[inline]
    fn add_entry_weighted(&mut self, distance_bin: usize, val: f64, weight: f64) {
        for member in self.members.iter_mut() {
            member.add_entry_weighted(distance_bin, val, weight);
        }
    }

    fn merge(&mut self, other: &Self) {
        assert_eq!(
            self.members.len(),
            other.members.len(),
            "there seemed to be a mismatch during consolidation",
        );
        for (member, other_member) in self.members.iter_mut().zip(other.members.iter()) {
            member.merge(other_member);
        }
    }

    fn flt_val_props(&self) -> Vec<(String, usize)> {
        self.members
            .iter()
            .flat_map(|m| m.flt_val_props())
            .collect()
    }

    fn i64_val_props(&self) -> Vec<(String, usize)> {
        self.members
            .iter()
            .flat_map(|m| m.i64_val_props())
            .collect()
    }

    fn copy_flt_vals(&self, out: &mut [f64]) {
        let mut offset = 0;
        for member in self.members.iter() {
            let n_vals = member.total_flt_vals();
            member.copy_flt_vals(&mut out[offset..offset + n_vals]);
            offset += n_vals;
        }
    }

    fn copy_i64_vals(&self, out: &mut [i64]) {
        let mut offset = 0;
        for member in self.members.iter() {
            let n_vals = member.total_i64_vals();
            member.copy_i64_vals(&mut out[offset..offset + n_vals]);
            offset += n_vals;
        }
    }

    fn import_flt_vals(&mut self, vals: &[f64]) {
        let mut offset = 0;
        for member in self.members.iter_mut() {
            let n_vals = member.total_flt_vals();
            member.import_flt_vals(&vals[offset..offset + n_vals]);
            offset += n_vals;
        }
    }

    fn import_i64_vals(&mut self, vals: &[i64]) {
        let mut offset = 0;
        for member in self.members.iter_mut() {
            let n_vals = member.total_i64_vals();
            member.import_i64_vals(&vals[offset..offset + n_vals]);
            offset += n_vals;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn sample_compound(n_distance_bins: usize) -> CompoundAccumCollection {
        CompoundAccumCollection::new(vec![
            AccumColVariant::Mean(
                ScalarAccumCollection::from_prototype(CentralMoment::<1>::new(), n_distance_bins)
                    .unwrap(),
            ),
            AccumColVariant::Histogram(
                HistogramAccumCollection::new(n_distance_bins, &[0.0, 2.0, 4.0]).unwrap(),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn fans_out_to_every_member() {
        let mut compound = sample_compound(2);
        compound.add_entry(0, 1.0);
        compound.add_entry(0, 3.0);
        compound.add_entry(1, 5.0); // outside the histogram's data bins

        let mut flt = vec![0.0; compound.total_flt_vals()];
        let mut ints = vec![0; compound.total_i64_vals()];
        compound.copy_flt_vals(&mut flt);
        compound.copy_i64_vals(&mut ints);

        // member 0 (mean): means for both distance bins
        assert_eq!(flt, vec![2.0, 5.0]);
        // member 0 counts, then member 1's count grid
        assert_eq!(ints, vec![2, 1, 1, 1, 0, 0]);
    }

    #[test]
    fn requires_weight_reflects_composition() {
        let compound = sample_compound(2);
        assert!(!compound.requires_weight());

        let weighted = CompoundAccumCollection::new(vec![
            AccumColVariant::Mean(
                ScalarAccumCollection::from_prototype(CentralMoment::<1>::new(), 2).unwrap(),
            ),
            AccumColVariant::WeightedHistogram(
                WeightedHistogramAccumCollection::new(2, &[0.0, 2.0, 4.0]).unwrap(),
            ),
        ])
        .unwrap();
        assert!(weighted.requires_weight());
    }

    #[test]
    fn merge_and_roundtrip() {
        let mut a = sample_compound(2);
        let mut b = sample_compound(2);
        a.add_entry(0, 1.0);
        b.add_entry(0, 3.0);
        b.add_entry(1, 2.0);
        a.merge(&b);

        let mut flt = vec![0.0; a.total_flt_vals()];
        let mut ints = vec![0; a.total_i64_vals()];
        a.copy_flt_vals(&mut flt);
        a.copy_i64_vals(&mut ints);
        assert_eq!(flt, vec![2.0, 2.0]);
        assert_eq!(ints, vec![2, 1, 1, 1, 0, 1]);

        let mut restored = sample_compound(2);
        restored.import_flt_vals(&flt);
        restored.import_i64_vals(&ints);
        let mut flt2 = vec![0.0; restored.total_flt_vals()];
        let mut ints2 = vec![0; restored.total_i64_vals()];
        restored.copy_flt_vals(&mut flt2);
        restored.copy_i64_vals(&mut ints2);
        assert_eq!(flt, flt2);
        assert_eq!(ints, ints2);
    }

    #[test]
    #[should_panic(expected = "different kinds")]
    fn variant_kind_mismatch_panics() {
        let mut mean = AccumColVariant::Mean(
            ScalarAccumCollection::from_prototype(CentralMoment::<1>::new(), 2).unwrap(),
        );
        let hist = AccumColVariant::Histogram(
            HistogramAccumCollection::new(2, &[0.0, 1.0]).unwrap(),
        );
        mean.merge(&hist);
    }
}
