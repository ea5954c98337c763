//! CSV file data adapter.
//!
//! Reads `<base_path>/<symbol>.csv` in the Yahoo Finance download layout:
//! `Date,Open,High,Low,Close,Adj Close,Volume`. Columns are located by header
//! name. Rows with a `null` or empty price field (non-trading days in Yahoo
//! exports) are skipped. A file without an `Adj Close` column uses `Close`.

use crate::domain::error::BandtestError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

struct Layout {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    adj_close: Option<usize>,
    volume: usize,
}

impl Layout {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, BandtestError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let require = |name: &str| {
            find(name).ok_or_else(|| BandtestError::Data {
                reason: format!("missing {} column", name),
            })
        };

        Ok(Self {
            date: require("date")?,
            open: require("open")?,
            high: require("high")?,
            low: require("low")?,
            close: require("close")?,
            adj_close: find("adj close").or_else(|| find("adj_close")),
            volume: require("volume")?,
        })
    }
}

fn parse_field(
    record: &csv::StringRecord,
    index: usize,
    name: &str,
) -> Result<Option<f64>, BandtestError> {
    let raw = record.get(index).map(str::trim).unwrap_or("");
    if raw.is_empty() || raw.eq_ignore_ascii_case("null") {
        return Ok(None);
    }
    raw.parse::<f64>()
        .map(Some)
        .map_err(|e| BandtestError::Data {
            reason: format!("invalid {} value '{}': {}", name, raw, e),
        })
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }

    fn read_bars(&self, symbol: &str) -> Result<Vec<OhlcvBar>, BandtestError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| BandtestError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr.headers().map_err(|e| BandtestError::Data {
            reason: format!("CSV parse error: {}", e),
        })?;
        let layout = Layout::from_headers(headers)?;

        let mut bars = Vec::new();
        let mut skipped = 0usize;

        for result in rdr.records() {
            let record = result.map_err(|e| BandtestError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;

            let date_str = record.get(layout.date).unwrap_or("").trim();
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                BandtestError::Data {
                    reason: format!("invalid date '{}': {}", date_str, e),
                }
            })?;

            let fields = (
                parse_field(&record, layout.open, "open")?,
                parse_field(&record, layout.high, "high")?,
                parse_field(&record, layout.low, "low")?,
                parse_field(&record, layout.close, "close")?,
                parse_field(&record, layout.volume, "volume")?,
            );
            let (Some(open), Some(high), Some(low), Some(close), Some(volume)) = fields else {
                skipped += 1;
                continue;
            };
            let adj_close = match layout.adj_close {
                Some(index) => match parse_field(&record, index, "adj close")? {
                    Some(v) => v,
                    None => {
                        skipped += 1;
                        continue;
                    }
                },
                None => close,
            };

            bars.push(OhlcvBar {
                date,
                open,
                high,
                low,
                close,
                adj_close,
                volume,
            });
        }

        if skipped > 0 {
            tracing::debug!(symbol, skipped, "skipped rows with null fields");
        }

        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }
}

impl DataPort for CsvAdapter {
    fn fetch_ohlcv(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, BandtestError> {
        let mut bars = self.read_bars(symbol)?;
        bars.retain(|b| b.date >= start_date && b.date <= end_date);
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, BandtestError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| BandtestError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| BandtestError::Data {
                reason: format!("directory entry error: {}", e),
            })?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if let Some(symbol) = name_str.strip_suffix(".csv") {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, BandtestError> {
        let bars = self.read_bars(symbol)?;
        Ok(match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date, bars.len())),
            _ => None,
        })
    }
}
