//! Rule evaluation against a series store.
//!
//! # Evaluation Semantics
//!
//! - Comparisons are false when either side is undefined (NaN)
//! - A term looking back before the first bar is undefined
//! - `CROSS_ABOVE`/`CROSS_BELOW`: require `index >= 1`, false at index 0
//! - `AND`: short-circuits on first `false`
//! - `OR`: short-circuits on first `true`
//! - `CONSECUTIVE(rule, N)`: child true for N consecutive bars ending at current
//! - `ANY_OF(rule, N)`: child true at least once in the last N bars
//!
//! Indicator operands read the column named by `IndicatorRef::column_name`,
//! so the indicators must have been added to the store first.

use crate::domain::error::BandtestError;
use crate::domain::indicator::{IndicatorRef, IndicatorType};
use crate::domain::rule::{extract_indicators, Operand, Rule, Term};
use crate::domain::rule_parser;
use crate::domain::stock::{BarRow, Stock};
use crate::domain::strategy::Strategy;

pub fn evaluate(rule: &Rule, stock: &Stock, index: usize) -> Result<bool, BandtestError> {
    let result = match rule {
        Rule::CrossAbove { left, right } => {
            if index == 0 {
                return Ok(false);
            }
            let (l_now, r_now) = (resolve(left, stock, index)?, resolve(right, stock, index)?);
            let (l_prev, r_prev) = (
                resolve(left, stock, index - 1)?,
                resolve(right, stock, index - 1)?,
            );
            l_now > r_now && l_prev <= r_prev
        }
        Rule::CrossBelow { left, right } => {
            if index == 0 {
                return Ok(false);
            }
            let (l_now, r_now) = (resolve(left, stock, index)?, resolve(right, stock, index)?);
            let (l_prev, r_prev) = (
                resolve(left, stock, index - 1)?,
                resolve(right, stock, index - 1)?,
            );
            l_now < r_now && l_prev >= r_prev
        }
        Rule::Above { left, right } => resolve(left, stock, index)? > resolve(right, stock, index)?,
        Rule::Below { left, right } => resolve(left, stock, index)? < resolve(right, stock, index)?,
        Rule::Between { term, lower, upper } => {
            let value = resolve(term, stock, index)?;
            value >= *lower && value <= *upper
        }
        Rule::And(rules) => {
            for r in rules {
                if !evaluate(r, stock, index)? {
                    return Ok(false);
                }
            }
            true
        }
        Rule::Or(rules) => {
            for r in rules {
                if evaluate(r, stock, index)? {
                    return Ok(true);
                }
            }
            false
        }
        Rule::Not(rule) => !evaluate(rule, stock, index)?,
        Rule::Consecutive { rule, count } => {
            if *count == 0 || index + 1 < *count {
                return Ok(false);
            }
            for i in (index + 1 - *count)..=index {
                if !evaluate(rule, stock, i)? {
                    return Ok(false);
                }
            }
            true
        }
        Rule::AnyOf { rule, count } => {
            if *count == 0 {
                return Ok(false);
            }
            let start = index.saturating_sub(*count - 1);
            for i in start..=index {
                if evaluate(rule, stock, i)? {
                    return Ok(true);
                }
            }
            false
        }
    };
    Ok(result)
}

fn resolve(term: &Term, stock: &Stock, index: usize) -> Result<f64, BandtestError> {
    let Some(target) = index.checked_sub(term.offset) else {
        return Ok(f64::NAN);
    };
    let row = stock.get_data(target)?;
    let bar = row.bar();

    let value = match &term.operand {
        Operand::Open => bar.open,
        Operand::High => bar.high,
        Operand::Low => bar.low,
        Operand::Close => bar.close,
        Operand::AdjClose => bar.adj_close,
        Operand::Volume => bar.volume,
        Operand::Constant(v) => *v,
        Operand::Indicator(indicator) => column_value(stock, &indicator.column_name(), target)?,
        Operand::Column(name) => column_value(stock, name, target)?,
    };
    Ok(value)
}

fn column_value(stock: &Stock, name: &str, index: usize) -> Result<f64, BandtestError> {
    stock
        .column(name)
        .map(|values| values[index])
        .ok_or_else(|| BandtestError::UnknownColumn {
            name: name.to_string(),
        })
}

/// A parsed rule usable wherever a [`Strategy`] is expected.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleStrategy {
    rule: Rule,
}

impl RuleStrategy {
    pub fn new(rule: Rule) -> Self {
        Self { rule }
    }

    pub fn parse(text: &str) -> Result<Self, BandtestError> {
        Ok(Self::new(rule_parser::parse(text)?))
    }

    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    pub fn required_indicators(&self) -> Vec<IndicatorType> {
        extract_indicators(&self.rule)
    }

    /// Add the indicator columns the rule reads to `stock`.
    pub fn prepare(&self, stock: &mut Stock) -> Result<(), BandtestError> {
        stock.add_indicators(&self.required_indicators())?;
        Ok(())
    }

    /// Check that every column the rule reads is present in `stock`.
    pub fn validate(&self, stock: &Stock) -> Result<(), BandtestError> {
        let indicator_columns: Vec<String> = self
            .required_indicators()
            .iter()
            .flat_map(|t| {
                t.fields()
                    .iter()
                    .map(|f| IndicatorRef::new(*t, *f).column_name())
            })
            .collect();

        let names = indicator_columns
            .iter()
            .map(String::as_str)
            .chain(self.rule.column_refs());
        for name in names {
            if !stock.has_column(name) {
                return Err(BandtestError::UnknownColumn {
                    name: name.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl Strategy for RuleStrategy {
    fn decide(
        &self,
        index: usize,
        _today: &BarRow<'_>,
        stock: &Stock,
    ) -> Result<bool, BandtestError> {
        evaluate(&self.rule, stock, index)
    }
}
