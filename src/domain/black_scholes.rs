//! Black-Scholes option valuation and implied-volatility calibration.
//!
//! No dividend yield. `s` is the underlying price, `k` the strike, `t` the
//! time to expiry in years, `r` the annual risk-free rate as a decimal and `v`
//! the annual volatility.

use chrono::NaiveDate;
use statrs::distribution::{Continuous, ContinuousCDF, Normal};
use thiserror::Error;

pub const DEFAULT_IV: f64 = 0.25;
pub const DEFAULT_RATE: f64 = 0.027;
const DAYS_PER_YEAR: f64 = 365.0;

const IV_START: f64 = 0.5;
const MAX_ITERATIONS: usize = 200;
const PRECISION: f64 = 1.0e-5;
/// Volatilities at or above this are treated as "no sane solution".
const IV_CAP: f64 = 10.0;

#[derive(Debug, Error, PartialEq)]
pub enum PricingError {
    #[error("vega vanished at iv {iv}")]
    ZeroVega { iv: f64 },

    #[error("no implied volatility below 10 (last iterate {iv})")]
    NoSolution { iv: f64 },
}

fn norm_cdf(x: f64) -> f64 {
    Normal::standard().cdf(x)
}

fn norm_pdf(x: f64) -> f64 {
    Normal::standard().pdf(x)
}

fn d1(s: f64, k: f64, t: f64, r: f64, v: f64) -> f64 {
    ((s / k).ln() + (r + 0.5 * v * v) * t) / (v * t.sqrt())
}

pub fn price(is_call: bool, s: f64, k: f64, t: f64, r: f64, v: f64) -> f64 {
    if t <= 0.0 {
        return intrinsic(is_call, s, k);
    }

    let d1 = d1(s, k, t, r, v);
    let d2 = d1 - v * t.sqrt();
    let discount = (-r * t).exp();

    if is_call {
        s * norm_cdf(d1) - k * discount * norm_cdf(d2)
    } else {
        k * discount * norm_cdf(-d2) - s * norm_cdf(-d1)
    }
}

pub fn delta(is_call: bool, s: f64, k: f64, t: f64, r: f64, v: f64) -> f64 {
    if t <= 0.0 {
        return match (is_call, s > k, s < k) {
            (true, true, _) => 1.0,
            (false, _, true) => -1.0,
            _ => 0.0,
        };
    }

    let cdf = norm_cdf(d1(s, k, t, r, v));
    if is_call { cdf } else { cdf - 1.0 }
}

/// Time decay per calendar day.
pub fn theta(is_call: bool, s: f64, k: f64, t: f64, r: f64, v: f64) -> f64 {
    if t <= 0.0 {
        return 0.0;
    }

    let sqrt_t = t.sqrt();
    let d1 = d1(s, k, t, r, v);
    let d2 = d1 - v * sqrt_t;
    let discount = (-r * t).exp();
    let decay = -s * norm_pdf(d1) * v / (2.0 * sqrt_t);

    let annual = if is_call {
        decay - r * k * discount * norm_cdf(d2)
    } else {
        decay + r * k * discount * norm_cdf(-d2)
    };
    annual / DAYS_PER_YEAR
}

/// Price sensitivity to one unit of volatility; identical for calls and puts.
pub fn vega(s: f64, k: f64, t: f64, r: f64, v: f64) -> f64 {
    if t <= 0.0 || v <= 0.0 {
        return 0.0;
    }
    s * t.sqrt() * norm_pdf(d1(s, k, t, r, v))
}

fn intrinsic(is_call: bool, s: f64, k: f64) -> f64 {
    if is_call {
        (s - k).max(0.0)
    } else {
        (k - s).max(0.0)
    }
}

/// Newton-Raphson search for the volatility reproducing `target`.
pub fn try_implied_vol(
    is_call: bool,
    s: f64,
    k: f64,
    t: f64,
    r: f64,
    target: f64,
) -> Result<f64, PricingError> {
    let mut iv = IV_START;

    for _ in 0..MAX_ITERATIONS {
        let diff = target - price(is_call, s, k, t, r, iv);
        if diff.abs() < PRECISION {
            break;
        }
        let vega = vega(s, k, t, r, iv);
        if vega == 0.0 || !vega.is_finite() {
            return Err(PricingError::ZeroVega { iv });
        }
        iv += diff / vega;
    }

    if iv.is_finite() && iv < IV_CAP {
        Ok(iv)
    } else {
        Err(PricingError::NoSolution { iv })
    }
}

/// Like [`try_implied_vol`], reporting any failure as 0.0.
pub fn implied_vol(is_call: bool, s: f64, k: f64, t: f64, r: f64, target: f64) -> f64 {
    try_implied_vol(is_call, s, k, t, r, target).unwrap_or(0.0)
}

/// A single option contract with a mutable volatility estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct BlackScholesEngine {
    is_call: bool,
    strike: f64,
    time_to_expiry: f64,
    rate: f64,
    iv: f64,
}

impl BlackScholesEngine {
    pub fn new(is_call: bool, strike: f64, today: NaiveDate, maturity: NaiveDate, iv: f64) -> Self {
        let days = (maturity - today).num_days().max(0);
        Self {
            is_call,
            strike,
            time_to_expiry: days as f64 / DAYS_PER_YEAR,
            rate: DEFAULT_RATE,
            iv,
        }
    }

    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }

    pub fn is_call(&self) -> bool {
        self.is_call
    }

    pub fn strike(&self) -> f64 {
        self.strike
    }

    pub fn time_to_expiry(&self) -> f64 {
        self.time_to_expiry
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn iv(&self) -> f64 {
        self.iv
    }

    pub fn price(&self, ul_price: f64) -> f64 {
        price(self.is_call, ul_price, self.strike, self.time_to_expiry, self.rate, self.iv)
    }

    pub fn delta(&self, ul_price: f64) -> f64 {
        delta(self.is_call, ul_price, self.strike, self.time_to_expiry, self.rate, self.iv)
    }

    pub fn theta(&self, ul_price: f64) -> f64 {
        theta(self.is_call, ul_price, self.strike, self.time_to_expiry, self.rate, self.iv)
    }

    pub fn vega(&self, ul_price: f64) -> f64 {
        vega(ul_price, self.strike, self.time_to_expiry, self.rate, self.iv)
    }

    /// Calibrate the volatility to `option_price`, store it and return it.
    pub fn update_iv(&mut self, ul_price: f64, option_price: f64) -> f64 {
        self.iv = match try_implied_vol(
            self.is_call,
            ul_price,
            self.strike,
            self.time_to_expiry,
            self.rate,
            option_price,
        ) {
            Ok(iv) => iv,
            Err(e) => {
                tracing::warn!(ul_price, option_price, "calibration failed: {}", e);
                0.0
            }
        };
        self.iv
    }
}
