//! Configuration validation.
//!
//! Validates all config fields before a run starts.

use crate::domain::error::BandtestError;
use crate::domain::ohlcv::PriceField;
use crate::domain::rule_parser;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), BandtestError> {
    require_non_empty(config, "data", "dir")?;
    require_non_empty(config, "data", "symbol")?;
    validate_dates(config)?;
    Ok(())
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), BandtestError> {
    validate_price(config)?;
    validate_risk_free_rate(config)?;
    Ok(())
}

/// Every entry of `[strategies]` must hold a rule that parses.
pub fn validate_strategies_config(config: &dyn ConfigPort) -> Result<(), BandtestError> {
    let names = config.keys("strategies");
    if names.is_empty() {
        return Err(BandtestError::ConfigMissing {
            section: "strategies".to_string(),
            key: "<name> = <rule>".to_string(),
        });
    }

    for name in names {
        let text = require_non_empty(config, "strategies", &name)?;
        rule_parser::parse(&text)?;
    }
    Ok(())
}

fn require_non_empty(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<String, BandtestError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(BandtestError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

fn validate_price(config: &dyn ConfigPort) -> Result<(), BandtestError> {
    if let Some(value) = config.get_string("backtest", "price") {
        if PriceField::parse(&value).is_none() {
            return Err(BandtestError::ConfigInvalid {
                section: "backtest".to_string(),
                key: "price".to_string(),
                reason: format!("expected adj_close or close, found '{}'", value),
            });
        }
    }
    Ok(())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), BandtestError> {
    parse_risk_free_rate(config)?;
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), BandtestError> {
    let start_date = parse_date(config, "start_date")?;
    let end_date = parse_date(config, "end_date")?;

    if let (Some(start), Some(end)) = (start_date, end_date) {
        if start > end {
            return Err(BandtestError::ConfigInvalid {
                section: "data".to_string(),
                key: "start_date".to_string(),
                reason: "start_date must not be after end_date".to_string(),
            });
        }
    }
    Ok(())
}

/// Optional `[data]` date. Absent is `None`; malformed is an error.
pub fn parse_date(
    config: &dyn ConfigPort,
    field: &str,
) -> Result<Option<NaiveDate>, BandtestError> {
    match config.get_string("data", field) {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| BandtestError::ConfigInvalid {
                section: "data".to_string(),
                key: field.to_string(),
                reason: format!("invalid {} format, expected YYYY-MM-DD", field),
            }),
    }
}

/// Optional `[backtest] risk_free_rate` as an annual decimal in `[0, 1)`.
/// Absent is `None`; anything that is not a plain number in range is an error.
pub fn parse_risk_free_rate(config: &dyn ConfigPort) -> Result<Option<f64>, BandtestError> {
    let invalid = |reason: String| BandtestError::ConfigInvalid {
        section: "backtest".to_string(),
        key: "risk_free_rate".to_string(),
        reason,
    };

    let Some(text) = config.get_string("backtest", "risk_free_rate") else {
        return Ok(None);
    };
    let value: f64 = text
        .trim()
        .parse()
        .map_err(|_| invalid(format!("expected a decimal number, found '{}'", text)))?;
    if !(0.0..1.0).contains(&value) {
        return Err(invalid(
            "risk_free_rate must be a decimal between 0 and 1".to_string(),
        ));
    }
    Ok(Some(value))
}
