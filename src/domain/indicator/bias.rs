//! BIAS (deviation from moving average) indicator.
//!
//! BIAS(n)[i] = (C[i] - MA(n)[i]) / MA(n)[i] * 100
//! Default window: 10. NaN during MA warmup.

use crate::domain::indicator::calculate_ma;

pub const DEFAULT_WINDOW: usize = 10;

pub fn calculate_bias(close: &[f64], window: usize) -> Vec<f64> {
    let ma = calculate_ma(close, window);
    close
        .iter()
        .zip(&ma)
        .map(|(c, m)| (c - m) / m * 100.0)
        .collect()
}
