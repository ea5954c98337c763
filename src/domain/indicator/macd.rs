//! MACD (Moving Average Convergence Divergence) indicator.
//!
//! DIF = EMA(short) - EMA(long)
//! DEM = EMA(signal) of DIF
//! OSC = DIF - DEM
//!
//! Default parameters: short=12, long=26, signal=9. The EMAs use adjusted
//! weights, so every bar with a defined close has defined DIF/DEM/OSC.

use crate::domain::indicator::calculate_ema;

pub const DEFAULT_SHORT: usize = 12;
pub const DEFAULT_LONG: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

#[derive(Debug, Clone, PartialEq)]
pub struct Macd {
    pub dif: Vec<f64>,
    pub dem: Vec<f64>,
    pub osc: Vec<f64>,
}

pub fn calculate_macd(close: &[f64], short: usize, long: usize, signal: usize) -> Macd {
    let ema_short = calculate_ema(close, short);
    let ema_long = calculate_ema(close, long);

    let dif: Vec<f64> = ema_short
        .iter()
        .zip(&ema_long)
        .map(|(s, l)| s - l)
        .collect();
    let dem = calculate_ema(&dif, signal);
    let osc = dif.iter().zip(&dem).map(|(a, b)| a - b).collect();

    Macd { dif, dem, osc }
}
