//! Numerical gradients for cross-checking the graph gradients.

/// Central finite differences of `f` at `point`, one partial per coordinate.
///
/// ```
/// use hypograd::finite_diff_grad;
///
/// let f = |v: &[f64]| v[0] * v[0] + v[0] * v[1];
/// let grads = finite_diff_grad(f, &[3.0, 4.0], 1e-6);
/// assert!((grads[0] - 10.0).abs() < 1e-5);
/// assert!((grads[1] - 3.0).abs() < 1e-5);
/// ```
pub fn finite_diff_grad<F>(f: F, point: &[f64], eps: f64) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64,
{
    let mut perturbed = point.to_vec();
    (0..point.len())
        .map(|i| {
            perturbed[i] = point[i] + eps;
            let f_plus = f(&perturbed);
            perturbed[i] = point[i] - eps;
            let f_minus = f(&perturbed);
            perturbed[i] = point[i];
            (f_plus - f_minus) / (2. * eps)
        })
        .collect()
}

/// Largest absolute difference between two gradient vectors of equal length.
///
/// # Panics
///
/// Panics if `lhs` and `rhs` differ in length.
pub fn max_grad_error(lhs: &[f64], rhs: &[f64]) -> f64 {
    assert_eq!(lhs.len(), rhs.len());
    lhs.iter()
        .zip(rhs.iter())
        .map(|(a, b)| (a - b).abs())
        .fold(0., f64::max)
}
