//! Exponential discounting kernel and kernel smoothing.
//!
//! The smoothing follows `same`-mode convolution: the output has the input's
//! length and is centred with offset `(K - 1) / 2`, so kernel weight `j`
//! multiplies sample `t + offset - j`. Keeping this alignment exact matters;
//! any other offset shifts the smoothed impulse in time.
//!
//! Near the edges (and around missing samples) only part of the kernel
//! overlaps real data. The overlapping weights are renormalized so a
//! constant input maps to itself everywhere.

use crate::error::AppError;

/// Normalized exponential weights `exp(-lambda * j)` for `j in 0..len`.
pub fn exponential_kernel(lambda: f64, len: usize) -> Result<Vec<f64>, AppError> {
    if len == 0 {
        return Err(AppError::config("Kernel length must be >= 1."));
    }
    if !lambda.is_finite() {
        return Err(AppError::config(format!("Kernel decay must be finite (got {lambda}).")));
    }

    let raw: Vec<f64> = (0..len).map(|j| (-lambda * j as f64).exp()).collect();
    let total: f64 = raw.iter().sum();
    if !(total.is_finite() && total > 0.0) {
        return Err(AppError::config(format!(
            "Kernel with decay {lambda} and length {len} cannot be normalized."
        )));
    }
    Ok(raw.into_iter().map(|w| w / total).collect())
}

/// Smooth `values` with `weights` (see module docs for alignment).
///
/// Output is `NaN` only where no weight overlaps an observed sample.
pub fn causal_kernel_smooth(values: &[f64], weights: &[f64]) -> Vec<f64> {
    let n = values.len() as isize;
    let k = weights.len();
    if k == 0 {
        return values.to_vec();
    }
    let offset = ((k - 1) / 2) as isize;

    (0..n)
        .map(|t| {
            let mut acc = 0.0;
            let mut used = 0.0;
            for (j, &w) in weights.iter().enumerate() {
                let idx = t + offset - j as isize;
                if idx < 0 || idx >= n {
                    continue;
                }
                let v = values[idx as usize];
                if v.is_finite() {
                    acc += w * v;
                    used += w;
                }
            }
            if used.abs() > f64::EPSILON { acc / used } else { f64::NAN }
        })
        .collect()
}
