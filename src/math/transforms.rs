//! Pointwise and lagged transforms over regularly indexed values.
//!
//! All functions are pure and total: they accept any slice (including `NaN`
//! for missing observations) and return a new vector of the same length.
//! Missing inputs yield missing outputs unless stated otherwise.

/// Default lower bound for [`bounded_pct_change`].
pub const PCT_CHANGE_LO: f64 = -0.5;
/// Default upper bound for [`bounded_pct_change`].
pub const PCT_CHANGE_HI: f64 = 0.5;

/// Fractional change over `periods` steps: `x[t] / x[t - periods] - 1`.
///
/// The first `periods` outputs are `NaN`. A zero base yields `±inf` (or
/// `NaN` for `0 / 0`); callers that need finite output use
/// [`bounded_pct_change`].
pub fn pct_change(values: &[f64], periods: usize) -> Vec<f64> {
    let periods = periods.max(1);
    (0..values.len())
        .map(|t| {
            if t < periods {
                return f64::NAN;
            }
            values[t] / values[t - periods] - 1.0
        })
        .collect()
}

/// [`pct_change`] clipped to `[lo, hi]`.
///
/// Infinite changes from a zero base clip to the nearest bound; `NaN` stays
/// `NaN`.
pub fn bounded_pct_change(values: &[f64], periods: usize, lo: f64, hi: f64) -> Vec<f64> {
    clip(&pct_change(values, periods), lo, hi)
}

/// Difference over `periods` steps: `x[t] - x[t - periods]`.
pub fn diff(values: &[f64], periods: usize) -> Vec<f64> {
    let periods = periods.max(1);
    (0..values.len())
        .map(|t| if t < periods { f64::NAN } else { values[t] - values[t - periods] })
        .collect()
}

/// Clamp every value into `[lo, hi]`, keeping `NaN`.
pub fn clip(values: &[f64], lo: f64, hi: f64) -> Vec<f64> {
    values.iter().map(|&v| if v.is_nan() { v } else { v.clamp(lo, hi) }).collect()
}

/// Floor every value at `lo`, keeping `NaN`.
pub fn clip_lower(values: &[f64], lo: f64) -> Vec<f64> {
    values.iter().map(|&v| if v.is_nan() { v } else { v.max(lo) }).collect()
}

/// Sign-preserving log compression: `sign(x) * ln(1 + |x|)`.
pub fn log_compress(values: &[f64]) -> Vec<f64> {
    values.iter().map(|&v| log_compress_value(v)).collect()
}

fn log_compress_value(v: f64) -> f64 {
    if v == 0.0 || v.is_nan() {
        return v;
    }
    v.signum() * v.abs().ln_1p()
}

/// Elementwise `num / (den + eps)` with non-finite results replaced by zero.
pub fn safe_ratio(numerator: &[f64], denominator: &[f64], eps: f64) -> Vec<f64> {
    numerator
        .iter()
        .zip(denominator)
        .map(|(&n, &d)| finite_or_value(n / (d + eps), 0.0))
        .collect()
}

/// Replace `NaN`/`±inf` with `fill`.
pub fn finite_or(values: &[f64], fill: f64) -> Vec<f64> {
    values.iter().map(|&v| finite_or_value(v, fill)).collect()
}

fn finite_or_value(v: f64, fill: f64) -> f64 {
    if v.is_finite() { v } else { fill }
}

/// Elementwise combination of two equally long slices.
pub fn zip_with(a: &[f64], b: &[f64], f: impl Fn(f64, f64) -> f64) -> Vec<f64> {
    debug_assert_eq!(a.len(), b.len(), "zip_with length mismatch");
    a.iter().zip(b).map(|(&x, &y)| f(x, y)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-12, "expected {b}, got {a}");
    }

    #[test]
    fn bounded_pct_change_clips_and_keeps_gaps() {
        let out = bounded_pct_change(&[1.0, 2.0, f64::NAN, 4.0], 1, PCT_CHANGE_LO, PCT_CHANGE_HI);
        assert!(out[0].is_nan());
        // 1 -> 2 is +100%, clipped to the upper bound.
        assert_close(out[1], 0.5);
        assert!(out[2].is_nan());
        assert!(out[3].is_nan());
    }

    #[test]
    fn bounded_pct_change_after_interpolation() {
        // Alignment interpolates before any transform runs: [1, 2, NaN, 4] -> [1, 2, 3, 4].
        let out = bounded_pct_change(&[1.0, 2.0, 3.0, 4.0], 1, PCT_CHANGE_LO, PCT_CHANGE_HI);
        assert!(out[0].is_nan());
        assert_close(out[1], 0.5);
        assert_close(out[2], 0.5);
        assert_close(out[3], 1.0 / 3.0);
    }

    #[test]
    fn bounded_pct_change_stays_in_bounds_for_zero_base() {
        let values = [0.0, 5.0, 0.0, -3.0, 1e-12, 1e6, 0.0, 0.0];
        let out = bounded_pct_change(&values, 1, PCT_CHANGE_LO, PCT_CHANGE_HI);
        for v in out.iter().skip(1) {
            if !v.is_nan() {
                assert!((PCT_CHANGE_LO..=PCT_CHANGE_HI).contains(v), "{v} out of bounds");
            }
        }
        // 0 -> 5 is an infinite change and clips to the bound; 0 -> 0 is undefined.
        assert_close(out[1], 0.5);
        assert!(out[7].is_nan());
    }

    #[test]
    fn pct_change_over_multiple_periods() {
        let out = pct_change(&[100.0, 101.0, 102.0, 103.0, 110.0], 4);
        assert!(out[..4].iter().all(|v| v.is_nan()));
        assert_close(out[4], 0.1);
    }

    #[test]
    fn diff_lags() {
        let out = diff(&[1.0, 4.0, 9.0, 16.0], 2);
        assert!(out[0].is_nan() && out[1].is_nan());
        assert_close(out[2], 8.0);
        assert_close(out[3], 12.0);
    }

    #[test]
    fn log_compress_preserves_sign_and_zero() {
        let xs = [-1e9, -3.5, -1e-9, 0.0, 1e-9, 2.0, 1e12];
        let out = log_compress(&xs);
        for (x, y) in xs.iter().zip(&out) {
            if *x == 0.0 {
                assert_eq!(*y, 0.0);
            } else {
                assert_eq!(x.signum(), y.signum());
                assert!(y.abs() <= x.abs());
            }
        }
        assert_close(out[5], 3.0_f64.ln());
    }

    #[test]
    fn safe_ratio_replaces_non_finite() {
        let out = safe_ratio(&[1.0, 1.0, f64::NAN, 0.0], &[1.0, -1e-6, 2.0, 0.0], 1e-6);
        assert!((out[0] - 1.0 / (1.0 + 1e-6)).abs() < 1e-12);
        assert_eq!(out[1], 0.0);
        assert_eq!(out[2], 0.0);
        assert_eq!(out[3], 0.0);
    }

    #[test]
    fn clip_keeps_nan() {
        let out = clip(&[-5.0, f64::NAN, 5.0], 0.0, 2.0);
        assert_eq!(out[0], 0.0);
        assert!(out[1].is_nan());
        assert_eq!(out[2], 2.0);
    }
}
