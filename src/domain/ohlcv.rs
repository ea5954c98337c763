//! OHLCV bar representation.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adj_close: f64,
    pub volume: f64,
}

/// Which price column the backtest compounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriceField {
    Close,
    #[default]
    AdjClose,
}

impl PriceField {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "close" => Some(PriceField::Close),
            "adj_close" | "adj close" | "adjclose" => Some(PriceField::AdjClose),
            _ => None,
        }
    }

    pub fn of(&self, bar: &OhlcvBar) -> f64 {
        match self {
            PriceField::Close => bar.close,
            PriceField::AdjClose => bar.adj_close,
        }
    }
}

impl OhlcvBar {
    /// Bars with no volume are market holidays carried by the provider.
    pub fn is_trading_day(&self) -> bool {
        self.volume > 0.0
    }
}
