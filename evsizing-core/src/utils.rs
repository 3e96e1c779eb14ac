//! Module containing miscellaneous utility functions.

use crate::imports::*;

/// Returns `magnitude` carrying the sign of `direction`, or exactly `+0.0`
/// when `direction` is zero (either `+0.0` or `-0.0`).
///
/// Forces that oppose motion use this instead of `direction.signum() * magnitude`
/// so that a vehicle at rest never produces a `-0.0` or a non-zero force.
pub fn signed_magnitude(magnitude: f64, direction: f64) -> f64 {
    if direction == 0.0 {
        0.0
    } else {
        magnitude.abs().copysign(direction)
    }
}

/// Sign-preserving integer power: $\operatorname{sgn}(x) |x|^n$, with `0.0` for any
/// zero input.
pub fn signed_powi(x: f64, n: i32) -> f64 {
    signed_magnitude(x.abs().powi(n), x)
}

/// Forward difference with the first element set to zero, i.e. the interval
/// ending at each sample
pub fn diff(x: &Array1<f64>) -> Array1<f64> {
    if x.is_empty() {
        return Array1::zeros(0);
    }
    concatenate(
        Axis(0),
        &[
            array![0.0].view(),
            (&x.slice(s![1..]) - &x.slice(s![..-1])).view(),
        ],
    )
    // lengths are consistent by construction
    .unwrap_or_else(|_| Array1::zeros(x.len()))
}

/// return cumsum <f64> of arr
pub fn ndarrcumsum(arr: &Array1<f64>) -> Array1<f64> {
    arr.iter()
        .scan(0.0, |acc, &x| {
            *acc += x;
            Some(*acc)
        })
        .collect()
}

/// return max <f64> of arr, `None` if empty
pub fn ndarrmax(arr: &Array1<f64>) -> Option<f64> {
    arr.iter().copied().reduce(f64::max)
}

/// return mean <f64> of arr, `None` if empty
pub fn ndarrmean(arr: &Array1<f64>) -> Option<f64> {
    arr.mean()
}

/// Returns true if `val1` and `val2` are within a relative/absolute `epsilon` of each other,
/// depending on magnitude.
pub fn almost_eq(val1: f64, val2: f64, epsilon: Option<f64>) -> bool {
    let epsilon = epsilon.unwrap_or(1e-8);
    ((val2 - val1) / (val1 + val2)).abs() < epsilon || (val2 - val1).abs() < epsilon
}

/// Returns true if `val1` is greater than or equal to `val2` with some error margin, `epsilon`
pub fn almost_ge(val1: f64, val2: f64, epsilon: Option<f64>) -> bool {
    let epsilon = epsilon.unwrap_or(1e-8);
    val1 > val2 * (1.0 - epsilon) || val1 > val2 - epsilon
}

/// Returns true if `val1` is less than or equal to `val2` with some error margin, `epsilon`
pub fn almost_le(val1: f64, val2: f64, epsilon: Option<f64>) -> bool {
    let epsilon = epsilon.unwrap_or(1e-8);
    val1 < val2 * (1.0 + epsilon) || val1 < val2 + epsilon
}

/// Numerically stable $\ln(\cosh(x))$ that does not overflow for large `|x|`
pub fn ln_cosh(x: f64) -> f64 {
    let x = x.abs();
    // beyond this, exp(-2x) vanishes against x and cosh would eventually overflow
    if x <= 300.0 {
        x.cosh().ln()
    } else {
        x - std::f64::consts::LN_2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_magnitude_at_rest_is_positive_zero() {
        assert_eq!(signed_magnitude(5.0, 0.0).to_bits(), 0.0f64.to_bits());
        assert_eq!(signed_magnitude(5.0, -0.0).to_bits(), 0.0f64.to_bits());
        assert_eq!(signed_magnitude(-5.0, -0.0).to_bits(), 0.0f64.to_bits());
        assert_eq!(signed_powi(-0.0, 2).to_bits(), 0.0f64.to_bits());
    }

    #[test]
    fn test_signed_magnitude_follows_direction() {
        assert_eq!(signed_magnitude(5.0, 2.0), 5.0);
        assert_eq!(signed_magnitude(5.0, -2.0), -5.0);
        assert_eq!(signed_magnitude(-5.0, 2.0), 5.0);
        assert_eq!(signed_powi(-3.0, 2), -9.0);
        assert_eq!(signed_powi(3.0, 2), 9.0);
    }

    #[test]
    fn test_diff_first_interval_is_zero() {
        let t = array![0.0, 1.0, 3.0, 3.5];
        assert_eq!(diff(&t), array![0.0, 1.0, 2.0, 0.5]);
        assert_eq!(diff(&array![7.0]), array![0.0]);
        assert!(diff(&Array1::zeros(0)).is_empty());
    }

    #[test]
    fn test_ndarrcumsum() {
        assert_eq!(ndarrcumsum(&array![1.0, 2.0, 3.0]), array![1.0, 3.0, 6.0]);
    }

    #[test]
    fn test_ln_cosh_matches_naive_and_does_not_overflow() {
        for x in [0.0, 0.1, 1.0, 5.0, -3.0, 20.0] {
            assert!(almost_eq(ln_cosh(x), f64::cosh(x).ln(), Some(1e-12)));
        }
        assert!(f64::cosh(1000.0).is_infinite());
        assert!(almost_eq(ln_cosh(1000.0), 1000.0 - std::f64::consts::LN_2, None));
        assert_eq!(ln_cosh(0.0), 0.0);
    }

    #[test]
    fn test_almost_eq_zero() {
        assert!(almost_eq(0.0, 1e-9, None));
        assert!(almost_eq(1e-9, 0.0, None));
        assert!(!almost_eq(0.0, 1e-7, None));
        assert!(!almost_eq(1e-7, 0.0, None));
    }

    #[test]
    fn test_almost_le_ge_large() {
        assert!(almost_le(1e9 * (1.0 + 1e-9), 1e9, None));
        assert!(!almost_le(1e9 * (1.0 + 1e-7), 1e9, None));
        assert!(almost_ge(1e9, 1e9 * (1.0 + 1e-9), None));
        assert!(!almost_ge(1e9, 1e9 * (1.0 + 1e-7), None));
    }
}
