//! Strategy contract and per-bar evaluation.
//!
//! A strategy decides, bar by bar, whether to hold the instrument (`true`) or
//! stay flat (`false`). It sees the bar index, an immutable view of that bar
//! and read-only access to the whole store for lookbacks.

use crate::domain::error::BandtestError;
use crate::domain::stock::{BarRow, Stock};

pub trait Strategy {
    fn decide(&self, index: usize, today: &BarRow<'_>, stock: &Stock)
    -> Result<bool, BandtestError>;
}

impl<F> Strategy for F
where
    F: Fn(usize, &BarRow<'_>, &Stock) -> Result<bool, BandtestError>,
{
    fn decide(
        &self,
        index: usize,
        today: &BarRow<'_>,
        stock: &Stock,
    ) -> Result<bool, BandtestError> {
        self(index, today, stock)
    }
}

/// Run `strategy` over every bar in date order and collect the hold signal.
/// The first error aborts evaluation.
pub fn evaluate(strategy: &dyn Strategy, stock: &Stock) -> Result<Vec<bool>, BandtestError> {
    let mut signal = Vec::with_capacity(stock.len());
    for index in 0..stock.len() {
        let today = stock.get_data(index)?;
        signal.push(strategy.decide(index, &today, stock)?);
    }
    Ok(signal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::OhlcvBar;
    use chrono::NaiveDate;
    use std::cell::RefCell;

    fn make_stock(closes: &[f64]) -> Stock {
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| OhlcvBar {
                date: NaiveDate::from_ymd_opt(2024, 1, (i + 1) as u32).unwrap(),
                open: close,
                high: close,
                low: close,
                close,
                adj_close: close,
                volume: 1000.0,
            })
            .collect();
        Stock::new("TEST", bars).unwrap()
    }

    #[test]
    fn closure_strategy_sees_every_bar_in_order() {
        let stock = make_stock(&[1.0, 2.0, 3.0, 4.0]);
        let visited = RefCell::new(Vec::new());
        let strategy =
            |index: usize, today: &BarRow<'_>, _: &Stock| -> Result<bool, BandtestError> {
                visited.borrow_mut().push(index);
                Ok(today.bar().close > 2.0)
            };

        let signal = evaluate(&strategy, &stock).unwrap();
        assert_eq!(signal, vec![false, false, true, true]);
        assert_eq!(*visited.borrow(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn lookback_strategy_fails_at_first_bar() {
        let stock = make_stock(&[1.0, 2.0, 3.0]);
        let rising =
            |index: usize, today: &BarRow<'_>, stock: &Stock| -> Result<bool, BandtestError> {
                let yesterday = stock.lookback(index, 1)?;
                Ok(today.bar().close > yesterday.bar().close)
            };

        let err = evaluate(&rising, &stock).unwrap_err();
        assert!(matches!(
            err,
            BandtestError::LookbackOutOfRange {
                index: 0,
                offset: 1
            }
        ));
    }

    #[test]
    fn guarded_lookback_strategy_succeeds() {
        let stock = make_stock(&[1.0, 2.0, 1.5]);
        let rising =
            |index: usize, today: &BarRow<'_>, stock: &Stock| -> Result<bool, BandtestError> {
                if index == 0 {
                    return Ok(false);
                }
                let yesterday = stock.lookback(index, 1)?;
                Ok(today.bar().close > yesterday.bar().close)
            };

        assert_eq!(evaluate(&rising, &stock).unwrap(), vec![false, true, false]);
    }
}
