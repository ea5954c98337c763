//! Simple Moving Average indicator.
//!
//! MA(n)[i] = sum(X[i-n+1..=i]) / n, trailing window, no centering.
//! Warmup: first (n-1) bars are NaN.

use crate::domain::indicator::rolling;

pub const DEFAULT_WINDOW: usize = 5;

pub fn calculate_ma(series: &[f64], window: usize) -> Vec<f64> {
    rolling(series, window, |w| w.iter().sum::<f64>() / window as f64)
}
