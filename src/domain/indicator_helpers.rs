//! Batch computation of catalogued indicators against a series store.

use crate::domain::indicator::{IndicatorField, IndicatorRef, IndicatorType};
use crate::domain::stock::Stock;
use std::collections::HashSet;

/// Compute each distinct indicator once and return `(column name, series)`
/// for every output field, in request order.
pub fn compute_indicators(stock: &Stock, types: &[IndicatorType]) -> Vec<(String, Vec<f64>)> {
    let mut seen = HashSet::new();
    let mut columns = Vec::new();

    for indicator_type in types {
        if !seen.insert(*indicator_type) {
            continue;
        }
        for (field, values) in compute_fields(stock, indicator_type) {
            let name = IndicatorRef::new(*indicator_type, field).column_name();
            columns.push((name, values));
        }
    }

    columns
}

fn compute_fields(
    stock: &Stock,
    indicator_type: &IndicatorType,
) -> Vec<(IndicatorField, Vec<f64>)> {
    match *indicator_type {
        IndicatorType::Ma(window) => vec![(IndicatorField::Value, stock.ma(window))],
        IndicatorType::MaVolume(window) => vec![(IndicatorField::Value, stock.ma_volume(window))],
        IndicatorType::Kd(window) => {
            let kd = stock.kd(window);
            vec![(IndicatorField::K, kd.k), (IndicatorField::D, kd.d)]
        }
        IndicatorType::Macd {
            short,
            long,
            signal,
        } => {
            let macd = stock.macd(short, long, signal);
            vec![
                (IndicatorField::Dif, macd.dif),
                (IndicatorField::Dem, macd.dem),
                (IndicatorField::Osc, macd.osc),
            ]
        }
        IndicatorType::Bias(window) => vec![(IndicatorField::Value, stock.bias(window))],
        IndicatorType::Bollinger {
            window,
            band_mult_bits,
        } => {
            let bands = stock.bband(window, f64::from_bits(band_mult_bits));
            vec![
                (IndicatorField::Top, bands.top),
                (IndicatorField::Bottom, bands.bottom),
                (IndicatorField::Width, bands.width),
            ]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::OhlcvBar;
    use chrono::NaiveDate;

    fn make_stock(closes: &[f64]) -> Stock {
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| OhlcvBar {
                date: NaiveDate::from_ymd_opt(2024, 1, (i + 1) as u32).unwrap(),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                adj_close: close,
                volume: 1000.0 + i as f64,
            })
            .collect();
        Stock::new("TEST", bars).unwrap()
    }

    #[test]
    fn computes_every_field() {
        let stock = make_stock(&[10.0, 11.0, 12.0, 13.0, 14.0]);
        let columns = compute_indicators(
            &stock,
            &[
                IndicatorType::Macd {
                    short: 2,
                    long: 3,
                    signal: 2,
                },
                IndicatorType::bollinger(3, 2.0),
            ],
        );
        let names: Vec<&str> = columns.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "DIF(2,3,2)",
                "DEM(2,3,2)",
                "OSC(2,3,2)",
                "BTOP(3,2)",
                "BBOTTOM(3,2)",
                "BWIDTH(3,2)"
            ]
        );
        assert!(columns.iter().all(|(_, v)| v.len() == 5));
    }

    #[test]
    fn bollinger_uses_exact_multiplier() {
        let stock = make_stock(&[10.0, 20.0, 30.0]);
        let columns = compute_indicators(&stock, &[IndicatorType::bollinger(3, 2.125)]);
        assert_eq!(columns[0].0, "BTOP(3,2.125)");
        // mean 20, sample std dev 10
        assert!((columns[0].1[2] - 41.25).abs() < 1e-9);
        assert!((columns[1].1[2] + 1.25).abs() < 1e-9);
    }

    #[test]
    fn duplicate_types_computed_once() {
        let stock = make_stock(&[10.0, 11.0, 12.0]);
        let columns = compute_indicators(&stock, &[IndicatorType::Ma(2), IndicatorType::Ma(2)]);
        assert_eq!(columns.len(), 1);
    }

    #[test]
    fn ma_volume_reads_volume() {
        let stock = make_stock(&[10.0, 11.0, 12.0]);
        let columns = compute_indicators(&stock, &[IndicatorType::MaVolume(2)]);
        assert_eq!(columns[0].0, "MA_VOLUME(2)");
        assert_eq!(columns[0].1[1], 1000.5);
        assert_eq!(columns[0].1[2], 1001.5);
    }

    #[test]
    fn bias_and_kd_columns() {
        let stock = make_stock(&[10.0, 11.0, 12.0]);
        let columns = compute_indicators(&stock, &[IndicatorType::Bias(2), IndicatorType::Kd(2)]);
        let names: Vec<&str> = columns.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["BIAS(2)", "K(2)", "D(2)"]);
    }
}
