use ndarray::ArrayView2;

/// calculate the squared norm of the difference between two (mathematical)
/// vectors that are stored as columns of 2D arrays (the component varies
/// along the slow axis)
#[inline]
pub fn squared_diff_norm(
    v1: ArrayView2<f64>,
    v2: ArrayView2<f64>,
    i1: usize,
    i2: usize,
    n_comps: usize,
) -> f64 {
    let mut sum = 0.0;
    for k in 0..n_comps {
        let diff = v1[[k, i1]] - v2[[k, i2]];
        sum += diff * diff;
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::ArrayView2;

    #[test]
    fn squared_diff_norm_columns() {
        let a = [0.0, 1.0, 0.0, 2.0, 0.0, 3.0];
        let b = [3.0, 0.0, 4.0, 0.0, 0.0, 0.0];
        let a_view = ArrayView2::from_shape((3, 2), &a).unwrap();
        let b_view = ArrayView2::from_shape((3, 2), &b).unwrap();
        assert_eq!(squared_diff_norm(a_view, b_view, 0, 0, 3), 25.0);
        assert_eq!(squared_diff_norm(a_view, a_view, 0, 1, 3), 14.0);
    }
}
