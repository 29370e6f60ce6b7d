//! Reproducible test-data generation shared by the cloudstat tests and
//! benchmarks.

use cloudstat_nostd_internal::UnstructuredPoints;
use ndarray::Array2;
use rand::distr::{Distribution, Uniform};
use rand_xoshiro::Xoshiro256PlusPlus;
use rand_xoshiro::rand_core::SeedableRng;

/// Owns the position/value buffers backing an [`UnstructuredPoints`] view.
pub struct PointSetData {
    positions: Array2<f64>,
    values: Array2<f64>,
}

impl PointSetData {
    pub fn new(positions: Array2<f64>, values: Array2<f64>) -> PointSetData {
        assert_eq!(positions.shape()[0], 3);
        assert_eq!(positions.shape()[1], values.shape()[1]);
        PointSetData { positions, values }
    }

    /// Draw `n_points` positions uniformly from a cube with the given edge
    /// length and the values (1 scalar channel or 3 vector components per
    /// point) uniformly from `[-1, 1]`.
    pub fn from_random(
        n_points: usize,
        n_value_comps: usize,
        cube_width: f64,
        seed: u64,
    ) -> PointSetData {
        assert!(n_value_comps == 1 || n_value_comps == 3);
        let mut my_rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let pos_dist = Uniform::try_from(0.0..cube_width).unwrap();
        let val_dist = Uniform::try_from(-1.0..=1.0).unwrap();

        let mut positions = Array2::<f64>::zeros([3, n_points]);
        let mut values = Array2::<f64>::zeros([n_value_comps, n_points]);
        for i in 0..n_points {
            for dim in 0..3 {
                positions[[dim, i]] = pos_dist.sample(&mut my_rng);
            }
            for comp in 0..n_value_comps {
                values[[comp, i]] = val_dist.sample(&mut my_rng);
            }
        }
        PointSetData { positions, values }
    }

    pub fn n_points(&self) -> usize {
        self.positions.shape()[1]
    }

    pub fn points(&self) -> UnstructuredPoints<'_> {
        UnstructuredPoints::new(self.positions.view(), self.values.view()).unwrap()
    }

    /// the raw position buffer (for test-side reference implementations)
    pub fn raw_positions(&self) -> &Array2<f64> {
        &self.positions
    }

    /// the raw value buffer (for test-side reference implementations)
    pub fn raw_values(&self) -> &Array2<f64> {
        &self.values
    }

    /// a copy restricted to the points in `[start, stop)`
    pub fn subset(&self, start: usize, stop: usize) -> PointSetData {
        PointSetData {
            positions: self
                .positions
                .slice(ndarray::s![.., start..stop])
                .to_owned(),
            values: self.values.slice(ndarray::s![.., start..stop]).to_owned(),
        }
    }
}
