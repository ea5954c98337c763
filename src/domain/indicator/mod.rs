//! Technical indicator implementations.
//!
//! Every indicator is a pure function over `f64` slices that returns a series
//! of the same length, with `f64::NAN` marking bars that lack enough history.
//!
//! This module also provides the typed identity of an indicator:
//! - `IndicatorType`: indicator identity + parameters (serves as HashMap key)
//! - `IndicatorField`: which output of a multi-value indicator to read
//! - `IndicatorRef`: a type plus field, which names one column of the table

pub mod bias;
pub mod bollinger;
pub mod ema;
pub mod kd;
pub mod ma;
pub mod macd;
pub mod stddev;

pub use bias::calculate_bias;
pub use bollinger::{calculate_bollinger, BollingerBands};
pub use ema::calculate_ema;
pub use kd::{calculate_kd, StochasticKd};
pub use ma::calculate_ma;
pub use macd::{calculate_macd, Macd};
pub use stddev::calculate_stddev;

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Ma(usize),
    MaVolume(usize),
    Kd(usize),
    Macd {
        short: usize,
        long: usize,
        signal: usize,
    },
    Bias(usize),
    /// The band multiplier is held as its `f64` bit pattern so the type
    /// stays `Eq + Hash`. Build it with [`IndicatorType::bollinger`].
    Bollinger {
        window: usize,
        band_mult_bits: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorField {
    Value,
    K,
    D,
    Dif,
    Dem,
    Osc,
    Top,
    Bottom,
    Width,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndicatorRef {
    pub indicator_type: IndicatorType,
    pub field: IndicatorField,
}

impl IndicatorType {
    /// Bollinger bands over `window` bars at `band_mult` standard deviations.
    /// A negative zero multiplier is stored as zero.
    pub fn bollinger(window: usize, band_mult: f64) -> Self {
        IndicatorType::Bollinger {
            window,
            band_mult_bits: (band_mult + 0.0).to_bits(),
        }
    }

    /// Band multiplier of a Bollinger indicator, `None` for other types.
    pub fn band_mult(&self) -> Option<f64> {
        match self {
            IndicatorType::Bollinger { band_mult_bits, .. } => {
                Some(f64::from_bits(*band_mult_bits))
            }
            _ => None,
        }
    }

    /// Every output field the indicator produces, in column order.
    pub fn fields(&self) -> &'static [IndicatorField] {
        match self {
            IndicatorType::Ma(_) | IndicatorType::MaVolume(_) | IndicatorType::Bias(_) => {
                &[IndicatorField::Value]
            }
            IndicatorType::Kd(_) => &[IndicatorField::K, IndicatorField::D],
            IndicatorType::Macd { .. } => {
                &[IndicatorField::Dif, IndicatorField::Dem, IndicatorField::Osc]
            }
            IndicatorType::Bollinger { .. } => &[
                IndicatorField::Top,
                IndicatorField::Bottom,
                IndicatorField::Width,
            ],
        }
    }

    /// Parameter list as written in rules and column names, e.g. `12,26,9`.
    fn params(&self) -> String {
        match self {
            IndicatorType::Ma(w)
            | IndicatorType::MaVolume(w)
            | IndicatorType::Kd(w)
            | IndicatorType::Bias(w) => w.to_string(),
            IndicatorType::Macd {
                short,
                long,
                signal,
            } => format!("{},{},{}", short, long, signal),
            IndicatorType::Bollinger {
                window,
                band_mult_bits,
            } => format!("{},{}", window, f64::from_bits(*band_mult_bits)),
        }
    }
}

impl IndicatorRef {
    pub fn new(indicator_type: IndicatorType, field: IndicatorField) -> Self {
        Self {
            indicator_type,
            field,
        }
    }

    /// Canonical column name used when the indicator is stored in a table.
    pub fn column_name(&self) -> String {
        let prefix = match self.field {
            IndicatorField::Value => match self.indicator_type {
                IndicatorType::Ma(_) => "MA",
                IndicatorType::MaVolume(_) => "MA_VOLUME",
                IndicatorType::Bias(_) => "BIAS",
                _ => "VALUE",
            },
            IndicatorField::K => "K",
            IndicatorField::D => "D",
            IndicatorField::Dif => "DIF",
            IndicatorField::Dem => "DEM",
            IndicatorField::Osc => "OSC",
            IndicatorField::Top => "BTOP",
            IndicatorField::Bottom => "BBOTTOM",
            IndicatorField::Width => "BWIDTH",
        };
        format!("{}({})", prefix, self.indicator_type.params())
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IndicatorType::Ma(_) => "MA",
            IndicatorType::MaVolume(_) => "MA_VOLUME",
            IndicatorType::Kd(_) => "KD",
            IndicatorType::Macd { .. } => "MACD",
            IndicatorType::Bias(_) => "BIAS",
            IndicatorType::Bollinger { .. } => "BBAND",
        };
        write!(f, "{}({})", name, self.params())
    }
}

impl fmt::Display for IndicatorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.column_name())
    }
}

/// Apply `f` to each complete trailing window of `series`.
///
/// The first `window - 1` outputs are NaN, as is any window containing a NaN.
/// A zero window yields an all-NaN series.
pub(crate) fn rolling<F>(series: &[f64], window: usize, f: F) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64,
{
    let mut values = vec![f64::NAN; series.len()];
    if window == 0 || series.len() < window {
        return values;
    }

    for end in window..=series.len() {
        let slice = &series[end - window..end];
        if slice.iter().any(|v| v.is_nan()) {
            continue;
        }
        values[end - 1] = f(slice);
    }
    values
}
