//! Vectorized long/flat backtest.
//!
//! r[t]      = ln(P[t] / P[t-1])            for t >= 1
//! eff[t]    = r[t] * S[t-1]                 (one-bar execution lag)
//! equity[t] = exp(sum(eff[1..=t])),  equity[0] = 1.0
//!
//! A signal raised at the close of day t only earns the return of day t+1.

use crate::domain::error::BandtestError;
use crate::domain::ohlcv::PriceField;
use crate::domain::stock::Stock;
use crate::domain::strategy::{evaluate, Strategy};
use chrono::NaiveDate;

pub const DEFAULT_RISK_FREE_RATE: f64 = 0.027;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BacktestConfig {
    pub price: PriceField,
    /// Annual decimal rate used by the curve metrics.
    pub risk_free_rate: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            price: PriceField::default(),
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
        }
    }
}

/// Signal and equity curve of one registered strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyResult {
    pub name: String,
    pub signal: Vec<bool>,
    pub equity: Vec<f64>,
}

/// Log return of each bar against the previous one; the first is NaN.
pub fn log_returns(prices: &[f64]) -> Vec<f64> {
    let mut returns = Vec::with_capacity(prices.len());
    if prices.is_empty() {
        return returns;
    }
    returns.push(f64::NAN);
    returns.extend(prices.windows(2).map(|w| (w[1] / w[0]).ln()));
    returns
}

/// Compound `prices` under `signal`, applying yesterday's position to today's
/// return.
pub fn equity_curve(prices: &[f64], signal: &[bool]) -> Vec<f64> {
    debug_assert_eq!(prices.len(), signal.len());

    let returns = log_returns(prices);
    let mut equity = Vec::with_capacity(prices.len());
    let mut cumulative = 0.0;

    for (t, r) in returns.iter().enumerate() {
        if t > 0 && signal[t - 1] && !r.is_nan() {
            cumulative += r;
        }
        equity.push(cumulative.exp());
    }

    equity
}

/// A backtest session over one store. Strategies are registered by name; a
/// reused name replaces the earlier result in place.
pub struct Backtest<'a> {
    stock: &'a Stock,
    config: BacktestConfig,
    prices: Vec<f64>,
    results: Vec<StrategyResult>,
}

impl<'a> Backtest<'a> {
    pub fn new(stock: &'a Stock, config: BacktestConfig) -> Self {
        Self {
            stock,
            config,
            prices: stock.prices(config.price),
            results: Vec::new(),
        }
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    pub fn add_strategy(
        &mut self,
        name: &str,
        strategy: &dyn Strategy,
    ) -> Result<&StrategyResult, BandtestError> {
        let signal = evaluate(strategy, self.stock)?;
        let equity = equity_curve(&self.prices, &signal);
        let result = StrategyResult {
            name: name.to_string(),
            signal,
            equity,
        };

        let slot = match self.results.iter().position(|r| r.name == name) {
            Some(i) => {
                self.results[i] = result;
                i
            }
            None => {
                self.results.push(result);
                self.results.len() - 1
            }
        };
        Ok(&self.results[slot])
    }

    /// Results in registration order.
    pub fn curves(&self) -> &[StrategyResult] {
        &self.results
    }

    pub fn curve(&self, name: &str) -> Option<&StrategyResult> {
        self.results.iter().find(|r| r.name == name)
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.stock.dates()
    }
}
