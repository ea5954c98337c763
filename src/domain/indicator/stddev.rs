//! Rolling sample standard deviation.
//!
//! STDDEV(n)[i] = sqrt(sum((X[i-j] - MA(n)[i])^2 for j in 0..n) / (n - 1))
//! Warmup: first (n-1) bars are NaN. A window of one value has no sample
//! deviation and stays NaN.

use crate::domain::indicator::rolling;

pub fn calculate_stddev(series: &[f64], window: usize) -> Vec<f64> {
    if window < 2 {
        return vec![f64::NAN; series.len()];
    }

    rolling(series, window, |w| {
        let mean = w.iter().sum::<f64>() / window as f64;
        let variance = w
            .iter()
            .map(|x| {
                let diff = x - mean;
                diff * diff
            })
            .sum::<f64>()
            / (window - 1) as f64;
        variance.sqrt()
    })
}
