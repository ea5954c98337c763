//! Data access port trait and ticker fallback.

use crate::domain::error::BandtestError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;

/// Suffixes tried, in order, before the bare identifier.
pub const DEFAULT_SUFFIXES: [&str; 2] = [".TW", ".TWO"];

pub trait DataPort {
    /// Bars for `symbol` within `[start_date, end_date]`, ascending by date.
    fn fetch_ohlcv(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, BandtestError>;

    fn list_symbols(&self) -> Result<Vec<String>, BandtestError>;

    /// First date, last date and bar count, or `None` when nothing is stored.
    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, BandtestError>;
}

/// Ordered ticker spellings for `id`: each suffix appended, then `id` itself.
/// An id that already carries one of the suffixes is tried as-is only.
pub fn candidate_symbols(id: &str, suffixes: &[&str]) -> Vec<String> {
    let id = id.trim();
    if suffixes.iter().any(|s| !s.is_empty() && id.ends_with(s)) {
        return vec![id.to_string()];
    }

    let mut candidates: Vec<String> = suffixes.iter().map(|s| format!("{}{}", id, s)).collect();
    candidates.push(id.to_string());
    candidates.dedup();
    candidates
}

/// Try each candidate in order. Returns the first non-empty result together
/// with the symbol that produced it, or the last failure.
pub fn fetch_with_fallback(
    port: &dyn DataPort,
    candidates: &[String],
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<(String, Vec<OhlcvBar>), BandtestError> {
    let mut last_err = BandtestError::Data {
        reason: "no candidate symbols".to_string(),
    };

    for symbol in candidates {
        match port.fetch_ohlcv(symbol, start_date, end_date) {
            Ok(bars) if !bars.is_empty() => {
                tracing::debug!(symbol = %symbol, bars = bars.len(), "fetched");
                return Ok((symbol.clone(), bars));
            }
            Ok(_) => {
                tracing::debug!(symbol = %symbol, "no bars in range");
                last_err = BandtestError::NoData {
                    symbol: symbol.clone(),
                };
            }
            Err(e) => {
                tracing::debug!(symbol = %symbol, error = %e, "fetch failed");
                last_err = e;
            }
        }
    }

    Err(last_err)
}
