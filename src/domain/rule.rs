//! Rule AST data structures.
//!
//! - `Operand`: what can be compared (price fields, constants, indicators,
//!   named columns)
//! - `Term`: an operand read at the current bar or some bars back
//! - `Rule`: comparison, composite and temporal variants

use crate::domain::indicator::{IndicatorRef, IndicatorType};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Open,
    High,
    Low,
    Close,
    AdjClose,
    Volume,
    Constant(f64),
    Indicator(IndicatorRef),
    /// A column already present in the store, e.g. `MA5` or `K`.
    Column(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub operand: Operand,
    /// Bars back from the evaluated bar; `close[1]` is yesterday's close.
    pub offset: usize,
}

impl Term {
    pub fn now(operand: Operand) -> Self {
        Self { operand, offset: 0 }
    }

    pub fn back(operand: Operand, offset: usize) -> Self {
        Self { operand, offset }
    }
}

impl From<Operand> for Term {
    fn from(operand: Operand) -> Self {
        Term::now(operand)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    CrossAbove { left: Term, right: Term },
    CrossBelow { left: Term, right: Term },
    Above { left: Term, right: Term },
    Below { left: Term, right: Term },
    Between { term: Term, lower: f64, upper: f64 },
    And(Vec<Rule>),
    Or(Vec<Rule>),
    Not(Box<Rule>),
    Consecutive { rule: Box<Rule>, count: usize },
    AnyOf { rule: Box<Rule>, count: usize },
}

impl Rule {
    fn terms<'a>(&'a self, out: &mut Vec<&'a Term>) {
        match self {
            Rule::CrossAbove { left, right }
            | Rule::CrossBelow { left, right }
            | Rule::Above { left, right }
            | Rule::Below { left, right } => {
                out.push(left);
                out.push(right);
            }
            Rule::Between { term, .. } => out.push(term),
            Rule::And(rules) | Rule::Or(rules) => {
                for rule in rules {
                    rule.terms(out);
                }
            }
            Rule::Not(rule) | Rule::Consecutive { rule, .. } | Rule::AnyOf { rule, .. } => {
                rule.terms(out)
            }
        }
    }

    /// Names of the bare columns the rule reads.
    pub fn column_refs(&self) -> Vec<&str> {
        let mut terms = Vec::new();
        self.terms(&mut terms);
        let mut names: Vec<&str> = Vec::new();
        for term in terms {
            if let Operand::Column(name) = &term.operand {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Open => f.write_str("open"),
            Operand::High => f.write_str("high"),
            Operand::Low => f.write_str("low"),
            Operand::Close => f.write_str("close"),
            Operand::AdjClose => f.write_str("adj_close"),
            Operand::Volume => f.write_str("volume"),
            Operand::Constant(v) => write!(f, "{}", v),
            // column names are valid rule syntax
            Operand::Indicator(indicator) => f.write_str(&indicator.column_name()),
            Operand::Column(name) => f.write_str(name),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.operand)?;
        if self.offset > 0 {
            write!(f, "[{}]", self.offset)?;
        }
        Ok(())
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, keyword: &str, rules: &[Rule]) -> fmt::Result {
    write!(f, "{}(", keyword)?;
    for (i, rule) in rules.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", rule)?;
    }
    f.write_str(")")
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::CrossAbove { left, right } => write!(f, "CROSS_ABOVE({}, {})", left, right),
            Rule::CrossBelow { left, right } => write!(f, "CROSS_BELOW({}, {})", left, right),
            Rule::Above { left, right } => write!(f, "ABOVE({}, {})", left, right),
            Rule::Below { left, right } => write!(f, "BELOW({}, {})", left, right),
            Rule::Between { term, lower, upper } => {
                write!(f, "BETWEEN({}, {}, {})", term, lower, upper)
            }
            Rule::And(rules) => write_list(f, "AND", rules),
            Rule::Or(rules) => write_list(f, "OR", rules),
            Rule::Not(rule) => write!(f, "NOT({})", rule),
            Rule::Consecutive { rule, count } => write!(f, "CONSECUTIVE({}, {})", rule, count),
            Rule::AnyOf { rule, count } => write!(f, "ANY_OF({}, {})", rule, count),
        }
    }
}

/// Distinct indicator types a rule needs, in first-use order.
pub fn extract_indicators(rule: &Rule) -> Vec<IndicatorType> {
    let mut terms = Vec::new();
    rule.terms(&mut terms);
    let mut types = Vec::new();
    for term in terms {
        if let Operand::Indicator(indicator) = &term.operand {
            if !types.contains(&indicator.indicator_type) {
                types.push(indicator.indicator_type);
            }
        }
    }
    types
}
