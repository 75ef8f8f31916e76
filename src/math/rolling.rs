//! Trailing-window statistics.
//!
//! Windows are trailing and inclusive of the current observation. Missing
//! values (`NaN`) inside a window are skipped; the output is `NaN` until the
//! window holds at least `min_periods` observations. Windows here are small
//! (tens to a few hundred samples), so a direct per-window pass is used.

/// Rolling mean over the last `window` observations.
pub fn rolling_mean(values: &[f64], window: usize, min_periods: usize) -> Vec<f64> {
    rolling_apply(values, window, min_periods.max(1), |sample| {
        sample.iter().sum::<f64>() / sample.len() as f64
    })
}

/// Rolling sample standard deviation (n - 1 denominator).
///
/// At least two observations are needed regardless of `min_periods`.
pub fn rolling_std(values: &[f64], window: usize, min_periods: usize) -> Vec<f64> {
    rolling_apply(values, window, min_periods.max(2), |sample| {
        let n = sample.len() as f64;
        let mean = sample.iter().sum::<f64>() / n;
        let var = sample.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        var.max(0.0).sqrt()
    })
}

fn rolling_apply(values: &[f64], window: usize, min_periods: usize, stat: impl Fn(&[f64]) -> f64) -> Vec<f64> {
    let window = window.max(1);
    let mut sample = Vec::with_capacity(window);
    (0..values.len())
        .map(|t| {
            let from = (t + 1).saturating_sub(window);
            sample.clear();
            sample.extend(values[from..=t].iter().copied().filter(|v| v.is_finite()));
            if sample.len() < min_periods {
                f64::NAN
            } else {
                stat(&sample)
            }
        })
        .collect()
}
