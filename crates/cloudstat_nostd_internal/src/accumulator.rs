//! Defines the streaming accumulator primitives.
//!
//! Each primitive tracks the running state of one statistic for a single
//! distance bin. A primitive consumes one scalar entry at a time (optionally
//! with a weight), can merge with another instance of the same kind, and
//! exposes its raw state through indexed getters/setters so that external
//! code can serialize, transfer, and restore it (e.g. for sending partial
//! results between MPI ranks).
//!
//! The moment accumulators use the incremental (Welford-style) update and
//! the pairwise combine formulas from
//! <https://en.wikipedia.org/wiki/Algorithms_for_calculating_variance#Parallel_algorithm>.
//! Do not "simplify" these to sum-of-squares arithmetic: the incremental
//! forms are what keep the results stable when entry counts get large.

use alloc::borrow::ToOwned;
use alloc::format;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

/// combine two running means into the mean of the union
///
/// There is some question about what the most numerically stable way to do
/// this actually is. This (weighted-average) form is favored when the two
/// weights are comparable, which is the common case when we consolidate
/// per-worker partial results.
#[inline]
fn combine_means(
    primary_mean: f64,
    primary_weight: f64,
    other_mean: f64,
    other_weight: f64,
    total_weight: f64,
) -> f64 {
    (primary_weight * primary_mean + other_weight * other_mean) / total_weight
}

/// The uniform interface shared by all scalar accumulator primitives.
///
/// The integer-valued and real-valued state components are each exposed as an
/// ordered, named list. `get_*`/`set_*` index into those lists; an
/// out-of-range index is a caller bug and panics.
pub trait ScalarAccum: Clone {
    /// the name of the statistic computed by the accumulator
    fn stat_name(&self) -> String;

    /// ordered names of the integer-valued state components
    fn i64_val_names(&self) -> Vec<String>;

    /// ordered names of the real-valued state components
    fn flt_val_names(&self) -> Vec<String>;

    /// whether entries must be added with an explicit weight
    fn requires_weight(&self) -> bool;

    /// reset to the freshly-constructed state
    fn reset(&mut self);

    /// fold a value into the tracked statistic
    fn add_entry(&mut self, val: f64);

    /// fold a weighted value into the tracked statistic
    fn add_entry_weighted(&mut self, val: f64, weight: f64);

    /// update `self` to reflect the combination of both operand states
    fn merge(&mut self, other: &Self);

    fn get_i64(&self, i: usize) -> i64;
    fn set_i64(&mut self, i: usize, val: i64);
    fn get_f64(&self, i: usize) -> f64;
    fn set_f64(&mut self, i: usize, val: f64);
}

// indices into the moment-accumulator state arrays
const MEAN: usize = 0;
const CUR_M2: usize = 1;
const CUR_M3: usize = 2;

/// Accumulates central moments up to `ORDER` (1 = mean, 2 = also M2,
/// 3 = also M3), counting entries.
///
/// M2 and M3 are the running sums of the 2nd and 3rd powers of differences
/// from the current mean. Dividing by `count` (or `count - 1` for the
/// Bessel-corrected variance) converts them to central moments, which is why
/// the exported component names carry a `*count` suffix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CentralMoment<const ORDER: usize> {
    count: i64,
    // the slots beyond ORDER stay zero for ORDER < 3
    moments: [f64; 3],
}

impl<const ORDER: usize> CentralMoment<ORDER> {
    pub fn new() -> Self {
        const { assert!(1 <= ORDER && ORDER <= 3) };
        Self {
            count: 0,
            moments: [0.0; 3],
        }
    }

    pub fn count(&self) -> i64 {
        self.count
    }
}

impl<const ORDER: usize> Default for CentralMoment<ORDER> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const ORDER: usize> ScalarAccum for CentralMoment<ORDER> {
    fn stat_name(&self) -> String {
        match ORDER {
            1 => "mean".to_owned(),
            2 => "variance".to_owned(),
            _ => "cmoment3".to_owned(),
        }
    }

    fn i64_val_names(&self) -> Vec<String> {
        vec!["count".to_owned()]
    }

    fn flt_val_names(&self) -> Vec<String> {
        let mut out = vec!["mean".to_owned()];
        if ORDER > 1 {
            out.push("variance*count".to_owned());
        }
        if ORDER > 2 {
            out.push("cmoment3*count".to_owned());
        }
        out
    }

    fn requires_weight(&self) -> bool {
        false
    }

    fn reset(&mut self) {
        *self = Self::new();
    }

    fn add_entry(&mut self, val: f64) {
        self.count += 1;
        let delta = val - self.moments[MEAN];
        let delta_div_n = delta / (self.count as f64);
        self.moments[MEAN] += delta_div_n;
        if ORDER > 1 {
            let val_minus_cur_mean = val - self.moments[MEAN];
            let delta2_nm1_div_n = delta * val_minus_cur_mean;
            if ORDER > 2 {
                // this must read the pre-update M2
                self.moments[CUR_M3] += delta2_nm1_div_n * delta_div_n * ((self.count - 2) as f64)
                    - 3.0 * self.moments[CUR_M2] * delta_div_n;
            }
            self.moments[CUR_M2] += delta2_nm1_div_n;
        }
    }

    fn add_entry_weighted(&mut self, val: f64, _weight: f64) {
        // entries are counted, not weighted
        self.add_entry(val);
    }

    fn merge(&mut self, other: &Self) {
        if self.count == 0 {
            *self = *other;
        } else if other.count == 0 {
            // do nothing
        } else if self.count == 1 {
            // the mean currently held by `self` is exactly equal to the sole
            // entry it has consumed, so replay that entry into a copy of
            // `other`
            let sole_entry = self.moments[MEAN];
            *self = *other;
            self.add_entry(sole_entry);
        } else if other.count == 1 {
            self.add_entry(other.moments[MEAN]);
        } else {
            let tot_count = (self.count + other.count) as f64;
            if ORDER > 1 {
                let delta = other.moments[MEAN] - self.moments[MEAN];
                let delta2_nprod_div_ntot =
                    (delta * delta) * ((self.count as f64) * (other.count as f64) / tot_count);
                if ORDER > 2 {
                    let term1 = delta2_nprod_div_ntot * ((other.count - self.count) as f64);
                    let term2 = 3.0
                        * ((self.count as f64) * other.moments[CUR_M2]
                            - (other.count as f64) * self.moments[CUR_M2]);
                    self.moments[CUR_M3] = self.moments[CUR_M3]
                        + other.moments[CUR_M3]
                        + (delta * (term1 + term2)) / tot_count;
                }
                self.moments[CUR_M2] =
                    self.moments[CUR_M2] + other.moments[CUR_M2] + delta2_nprod_div_ntot;
            }
            self.moments[MEAN] = combine_means(
                self.moments[MEAN],
                self.count as f64,
                other.moments[MEAN],
                other.count as f64,
                tot_count,
            );
            self.count += other.count;
        }
    }

    fn get_i64(&self, i: usize) -> i64 {
        assert!(i == 0, "only has 1 integer value");
        self.count
    }

    fn set_i64(&mut self, i: usize, val: i64) {
        assert!(i == 0, "only has 1 integer value");
        self.count = val;
    }

    fn get_f64(&self, i: usize) -> f64 {
        assert!(i < ORDER, "trying to access a non-existent float val");
        self.moments[i]
    }

    fn set_f64(&mut self, i: usize, val: f64) {
        assert!(i < ORDER, "trying to access a non-existent float val");
        self.moments[i] = val;
    }
}

/// The weighted counterpart of [`CentralMoment`]: tracks a running weight
/// total instead of an entry count. Only supported up to 2nd order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WeightedCentralMoment<const ORDER: usize> {
    weight_sum: f64,
    moments: [f64; 2],
}

impl<const ORDER: usize> WeightedCentralMoment<ORDER> {
    pub fn new() -> Self {
        const { assert!(1 <= ORDER && ORDER <= 2) };
        Self {
            weight_sum: 0.0,
            moments: [0.0; 2],
        }
    }

    pub fn weight_sum(&self) -> f64 {
        self.weight_sum
    }
}

impl<const ORDER: usize> Default for WeightedCentralMoment<ORDER> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const ORDER: usize> ScalarAccum for WeightedCentralMoment<ORDER> {
    fn stat_name(&self) -> String {
        match ORDER {
            1 => "weightedmean".to_owned(),
            _ => "weightedvariance".to_owned(),
        }
    }

    fn i64_val_names(&self) -> Vec<String> {
        Vec::new()
    }

    fn flt_val_names(&self) -> Vec<String> {
        let mut out = vec!["weight_sum".to_owned(), "mean".to_owned()];
        if ORDER > 1 {
            out.push("variance*count".to_owned());
        }
        out
    }

    fn requires_weight(&self) -> bool {
        true
    }

    fn reset(&mut self) {
        *self = Self::new();
    }

    fn add_entry(&mut self, _val: f64) {
        panic!("a weight must be provided");
    }

    fn add_entry_weighted(&mut self, val: f64, weight: f64) {
        self.weight_sum += weight;
        let delta = val - self.moments[MEAN];
        // guard the division so that a zero total weight leaves the mean at
        // zero rather than producing a NaN
        let divisor = if self.weight_sum == 0.0 {
            1.0
        } else {
            self.weight_sum
        };
        self.moments[MEAN] += (delta * weight) / divisor;
        if ORDER > 1 {
            let val_minus_cur_mean = val - self.moments[MEAN];
            self.moments[CUR_M2] += weight * delta * val_minus_cur_mean;
        }
    }

    fn merge(&mut self, other: &Self) {
        if self.weight_sum == 0.0 {
            *self = *other;
        } else if other.weight_sum == 0.0 {
            // do nothing
        } else {
            let tot_weight = self.weight_sum + other.weight_sum;
            if ORDER > 1 {
                let delta = other.moments[MEAN] - self.moments[MEAN];
                let delta2_nprod_div_ntot =
                    (delta * delta) * (self.weight_sum * other.weight_sum / tot_weight);
                self.moments[CUR_M2] =
                    self.moments[CUR_M2] + other.moments[CUR_M2] + delta2_nprod_div_ntot;
            }
            self.moments[MEAN] = combine_means(
                self.moments[MEAN],
                self.weight_sum,
                other.moments[MEAN],
                other.weight_sum,
                tot_weight,
            );
            self.weight_sum = tot_weight;
        }
    }

    fn get_i64(&self, _i: usize) -> i64 {
        panic!("has no integer value");
    }

    fn set_i64(&mut self, _i: usize, _val: i64) {
        panic!("has no integer value");
    }

    fn get_f64(&self, i: usize) -> f64 {
        assert!(i <= ORDER, "trying to access a non-existent float val");
        if i == 0 {
            self.weight_sum
        } else {
            self.moments[i - 1]
        }
    }

    fn set_f64(&mut self, i: usize, val: f64) {
        assert!(i <= ORDER, "trying to access a non-existent float val");
        if i == 0 {
            self.weight_sum = val;
        } else {
            self.moments[i - 1] = val;
        }
    }
}

/// Accumulates moments about the origin: the running means of
/// `v, v^2, ..., v^order`. The order is a runtime parameter (there's no
/// meaningful upper limit, unlike the central-moment case).
#[derive(Clone, Debug, PartialEq)]
pub struct OriginMoment {
    count: i64,
    moments: Vec<f64>,
}

impl OriginMoment {
    pub fn new(order: usize) -> Result<Self, &'static str> {
        if order == 0 {
            Err("order must be at least 1")
        } else {
            Ok(Self {
                count: 0,
                moments: vec![0.0; order],
            })
        }
    }

    pub fn order(&self) -> usize {
        self.moments.len()
    }
}

impl ScalarAccum for OriginMoment {
    fn stat_name(&self) -> String {
        format!("omoment{}", self.order())
    }

    fn i64_val_names(&self) -> Vec<String> {
        vec!["count".to_owned()]
    }

    fn flt_val_names(&self) -> Vec<String> {
        let mut out = vec!["mean".to_owned()];
        for i in 1..self.order() {
            out.push(format!("omoment{}", i + 1));
        }
        out
    }

    fn requires_weight(&self) -> bool {
        false
    }

    fn reset(&mut self) {
        self.count = 0;
        self.moments.fill(0.0);
    }

    fn add_entry(&mut self, val: f64) {
        self.count += 1;
        let mut val_raised_to_ip1 = 1.0;
        for moment in self.moments.iter_mut() {
            val_raised_to_ip1 *= val;
            let delta = val_raised_to_ip1 - *moment;
            *moment += delta / (self.count as f64);
        }
    }

    fn add_entry_weighted(&mut self, val: f64, _weight: f64) {
        self.add_entry(val);
    }

    fn merge(&mut self, other: &Self) {
        debug_assert_eq!(self.order(), other.order());
        if self.count == 0 {
            self.clone_from(other);
        } else if other.count == 0 {
            // do nothing
        } else if self.count == 1 {
            let sole_entry = self.moments[0];
            self.clone_from(other);
            self.add_entry(sole_entry);
        } else if other.count == 1 {
            self.add_entry(other.moments[0]);
        } else {
            let tot_count = (self.count + other.count) as f64;
            for (moment, &other_moment) in self.moments.iter_mut().zip(other.moments.iter()) {
                *moment = combine_means(
                    *moment,
                    self.count as f64,
                    other_moment,
                    other.count as f64,
                    tot_count,
                );
            }
            self.count += other.count;
        }
    }

    fn get_i64(&self, i: usize) -> i64 {
        assert!(i == 0, "only has 1 integer value");
        self.count
    }

    fn set_i64(&mut self, i: usize, val: i64) {
        assert!(i == 0, "only has 1 integer value");
        self.count = val;
    }

    fn get_f64(&self, i: usize) -> f64 {
        self.moments[i]
    }

    fn set_f64(&mut self, i: usize, val: f64) {
        self.moments[i] = val;
    }
}

/// The weighted counterpart of [`OriginMoment`].
#[derive(Clone, Debug, PartialEq)]
pub struct WeightedOriginMoment {
    weight_sum: f64,
    moments: Vec<f64>,
}

impl WeightedOriginMoment {
    pub fn new(order: usize) -> Result<Self, &'static str> {
        if order == 0 {
            Err("order must be at least 1")
        } else {
            Ok(Self {
                weight_sum: 0.0,
                moments: vec![0.0; order],
            })
        }
    }

    pub fn order(&self) -> usize {
        self.moments.len()
    }
}

impl ScalarAccum for WeightedOriginMoment {
    fn stat_name(&self) -> String {
        format!("weightedomoment{}", self.order())
    }

    fn i64_val_names(&self) -> Vec<String> {
        Vec::new()
    }

    fn flt_val_names(&self) -> Vec<String> {
        let mut out = vec!["weight_sum".to_owned(), "mean".to_owned()];
        for i in 1..self.order() {
            out.push(format!("omoment{}", i + 1));
        }
        out
    }

    fn requires_weight(&self) -> bool {
        true
    }

    fn reset(&mut self) {
        self.weight_sum = 0.0;
        self.moments.fill(0.0);
    }

    fn add_entry(&mut self, _val: f64) {
        panic!("a weight must be provided");
    }

    fn add_entry_weighted(&mut self, val: f64, weight: f64) {
        self.weight_sum += weight;
        let divisor = if self.weight_sum == 0.0 {
            1.0
        } else {
            self.weight_sum
        };
        let mut val_raised_to_ip1 = 1.0;
        for moment in self.moments.iter_mut() {
            val_raised_to_ip1 *= val;
            let delta = val_raised_to_ip1 - *moment;
            *moment += (delta * weight) / divisor;
        }
    }

    fn merge(&mut self, other: &Self) {
        debug_assert_eq!(self.order(), other.order());
        if self.weight_sum == 0.0 {
            self.clone_from(other);
        } else if other.weight_sum == 0.0 {
            // do nothing
        } else {
            let tot_weight = self.weight_sum + other.weight_sum;
            for (moment, &other_moment) in self.moments.iter_mut().zip(other.moments.iter()) {
                *moment = combine_means(
                    *moment,
                    self.weight_sum,
                    other_moment,
                    other.weight_sum,
                    tot_weight,
                );
            }
            self.weight_sum = tot_weight;
        }
    }

    fn get_i64(&self, _i: usize) -> i64 {
        panic!("has no integer value");
    }

    fn set_i64(&mut self, _i: usize, _val: i64) {
        panic!("has no integer value");
    }

    fn get_f64(&self, i: usize) -> f64 {
        if i == 0 {
            self.weight_sum
        } else {
            self.moments[i - 1]
        }
    }

    fn set_f64(&mut self, i: usize, val: f64) {
        if i == 0 {
            self.weight_sum = val;
        } else {
            self.moments[i - 1] = val;
        }
    }
}
