//! Series store: the date-indexed bar table of one instrument plus its named
//! derived columns.

use crate::domain::error::BandtestError;
use crate::domain::indicator::{
    self, BollingerBands, IndicatorType, Macd, StochasticKd,
};
use crate::domain::indicator_helpers::compute_indicators;
use crate::domain::ohlcv::{OhlcvBar, PriceField};
use chrono::NaiveDate;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Stock {
    symbol: String,
    bars: Vec<OhlcvBar>,
    columns: HashMap<String, Vec<f64>>,
    column_order: Vec<String>,
}

impl Stock {
    /// Build the store from provider bars.
    ///
    /// Zero-volume bars are dropped. The remaining bars must be strictly
    /// increasing by date and there must be at least one.
    pub fn new(symbol: impl Into<String>, bars: Vec<OhlcvBar>) -> Result<Self, BandtestError> {
        let symbol = symbol.into();
        let total = bars.len();
        let bars: Vec<OhlcvBar> = bars.into_iter().filter(OhlcvBar::is_trading_day).collect();
        if bars.len() < total {
            tracing::debug!(
                symbol = %symbol,
                dropped = total - bars.len(),
                "dropped zero-volume bars"
            );
        }

        if bars.is_empty() {
            return Err(BandtestError::NoData { symbol });
        }

        if let Some(index) = bars.windows(2).position(|w| w[1].date <= w[0].date) {
            return Err(BandtestError::UnsortedBars {
                symbol,
                index: index + 1,
            });
        }

        Ok(Self {
            symbol,
            bars,
            columns: HashMap::new(),
            column_order: Vec::new(),
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[OhlcvBar] {
        &self.bars
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    pub fn prices(&self, field: PriceField) -> Vec<f64> {
        self.bars.iter().map(|b| field.of(b)).collect()
    }

    /// Insert or replace a derived column. Its length must match the bar count.
    pub fn insert_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<(), BandtestError> {
        let name = name.into();
        if values.len() != self.bars.len() {
            return Err(BandtestError::ColumnLength {
                name,
                expected: self.bars.len(),
                actual: values.len(),
            });
        }
        if !self.columns.contains_key(&name) {
            self.column_order.push(name.clone());
        }
        self.columns.insert(name, values);
        Ok(())
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Column names in first-insertion order.
    pub fn column_names(&self) -> &[String] {
        &self.column_order
    }

    /// Row view of bar `index`.
    pub fn get_data(&self, index: usize) -> Result<BarRow<'_>, BandtestError> {
        match self.bars.get(index) {
            Some(bar) => Ok(BarRow {
                index,
                bar,
                stock: self,
            }),
            None => Err(BandtestError::IndexOutOfRange {
                index,
                len: self.bars.len(),
            }),
        }
    }

    /// Row view `offset` bars before `index`. Reaching before the first bar is
    /// an error, never clamped.
    pub fn lookback(&self, index: usize, offset: usize) -> Result<BarRow<'_>, BandtestError> {
        let target = index
            .checked_sub(offset)
            .ok_or(BandtestError::LookbackOutOfRange { index, offset })?;
        self.get_data(target)
    }

    pub fn ma(&self, window: usize) -> Vec<f64> {
        indicator::calculate_ma(&self.closes(), window)
    }

    pub fn ma_volume(&self, window: usize) -> Vec<f64> {
        indicator::calculate_ma(&self.volumes(), window)
    }

    pub fn kd(&self, window: usize) -> StochasticKd {
        indicator::calculate_kd(&self.highs(), &self.lows(), &self.closes(), window)
    }

    pub fn macd(&self, short: usize, long: usize, signal: usize) -> Macd {
        indicator::calculate_macd(&self.closes(), short, long, signal)
    }

    pub fn bias(&self, window: usize) -> Vec<f64> {
        indicator::calculate_bias(&self.closes(), window)
    }

    pub fn bband(&self, window: usize, band_mult: f64) -> BollingerBands {
        indicator::calculate_bollinger(&self.closes(), window, band_mult)
    }

    /// Compute the given indicators and store every output under its
    /// canonical column name. Returns the inserted names.
    pub fn add_indicators(
        &mut self,
        types: &[IndicatorType],
    ) -> Result<Vec<String>, BandtestError> {
        let mut names = Vec::new();
        for (name, values) in compute_indicators(self, types) {
            self.insert_column(name.clone(), values)?;
            names.push(name);
        }
        Ok(names)
    }

    /// The classic column set with default parameters:
    /// MA5, K, D, DIF, DEM, OSC, BIAS, BTOP, BBOTTOM, BWIDTH.
    pub fn add_default_columns(&mut self) -> Result<(), BandtestError> {
        use crate::domain::indicator::{bias, bollinger, kd, ma, macd};

        let ma5 = self.ma(ma::DEFAULT_WINDOW);
        let kd = self.kd(kd::DEFAULT_WINDOW);
        let macd = self.macd(
            macd::DEFAULT_SHORT,
            macd::DEFAULT_LONG,
            macd::DEFAULT_SIGNAL,
        );
        let bias = self.bias(bias::DEFAULT_WINDOW);
        let bands = self.bband(bollinger::DEFAULT_WINDOW, bollinger::DEFAULT_BAND_MULT);

        self.insert_column("MA5", ma5)?;
        self.insert_column("K", kd.k)?;
        self.insert_column("D", kd.d)?;
        self.insert_column("DIF", macd.dif)?;
        self.insert_column("DEM", macd.dem)?;
        self.insert_column("OSC", macd.osc)?;
        self.insert_column("BIAS", bias)?;
        self.insert_column("BTOP", bands.top)?;
        self.insert_column("BBOTTOM", bands.bottom)?;
        self.insert_column("BWIDTH", bands.width)?;
        Ok(())
    }
}

/// Read-only view of one bar together with its derived column values.
#[derive(Debug, Clone, Copy)]
pub struct BarRow<'a> {
    index: usize,
    bar: &'a OhlcvBar,
    stock: &'a Stock,
}

impl<'a> BarRow<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn date(&self) -> NaiveDate {
        self.bar.date
    }

    pub fn bar(&self) -> &'a OhlcvBar {
        self.bar
    }

    /// Value of a derived column at this bar (NaN while undefined).
    pub fn get(&self, column: &str) -> Result<f64, BandtestError> {
        self.stock
            .column(column)
            .map(|values| values[self.index])
            .ok_or_else(|| BandtestError::UnknownColumn {
                name: column.to_string(),
            })
    }
}
