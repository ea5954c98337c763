//! Bollinger Bands indicator.
//!
//! - Top:    MA(n) + mult * STDDEV(n)
//! - Bottom: MA(n) - mult * STDDEV(n)
//! - Width:  2 * mult * STDDEV(n) / Close
//!
//! STDDEV is the sample standard deviation (divides by N-1).
//!
//! Default parameters: window=20, mult=2.0
//! Warmup: first (window-1) bars are NaN.

use crate::domain::indicator::{calculate_ma, calculate_stddev};

pub const DEFAULT_WINDOW: usize = 20;
pub const DEFAULT_BAND_MULT: f64 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerBands {
    pub top: Vec<f64>,
    pub bottom: Vec<f64>,
    pub width: Vec<f64>,
}

pub fn calculate_bollinger(close: &[f64], window: usize, band_mult: f64) -> BollingerBands {
    let ma = calculate_ma(close, window);
    let sd = calculate_stddev(close, window);

    let mut top = Vec::with_capacity(close.len());
    let mut bottom = Vec::with_capacity(close.len());
    let mut width = Vec::with_capacity(close.len());

    for i in 0..close.len() {
        top.push(ma[i] + band_mult * sd[i]);
        bottom.push(ma[i] - band_mult * sd[i]);
        width.push(band_mult * 2.0 * sd[i] / close[i]);
    }

    BollingerBands { top, bottom, width }
}
