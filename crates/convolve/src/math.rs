//! Small numeric kernels shared by the engine and its tests.

/// Largest absolute value in `x`, or 0 for an empty slice.
#[must_use]
pub fn peak_abs(x: &[f32]) -> f32 {
    x.iter().fold(0.0f32, |m, &v| m.max(v.abs()))
}

/// Largest element-wise absolute difference between two equally long slices.
#[must_use]
pub fn max_abs_diff(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .fold(0.0f32, |m, (&x, &y)| m.max((x - y).abs()))
}

#[cfg(test)]
mod tests {
    use super::{max_abs_diff, peak_abs};

    #[test]
    fn peak_abs_smoke() {
        assert_eq!(peak_abs(&[]), 0.0);
        assert_eq!(peak_abs(&[0.25, -0.75, 0.5]), 0.75);
        assert_eq!(peak_abs(&[0.0, -0.0]), 0.0);
    }

    #[test]
    fn max_abs_diff_smoke() {
        assert_eq!(max_abs_diff(&[1.0, 2.0], &[1.0, 2.0]), 0.0);
        assert_eq!(max_abs_diff(&[1.0, -2.0], &[1.5, 2.0]), 4.0);
    }
}
