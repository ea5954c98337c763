//! Rule DSL parser.
//!
//! Recursive descent parser for the rule grammar. Converts text to AST with
//! meaningful error messages including character offset, expected/found tokens.
//!
//! ```text
//! rule  := ABOVE(op, op) | BELOW(op, op) | CROSS_ABOVE(op, op)
//!        | CROSS_BELOW(op, op) | BETWEEN(op, num, num)
//!        | AND(rule, rule, ...) | OR(rule, rule, ...) | NOT(rule)
//!        | CONSECUTIVE(rule, n) | ANY_OF(rule, n)
//! op    := atom [ '[' n ']' ]
//! atom  := number | open | high | low | close | adj_close | volume
//!        | INDICATOR '(' params ')' | column
//! ```

use crate::domain::error::ParseError;
use crate::domain::indicator::{IndicatorField, IndicatorRef, IndicatorType};
use crate::domain::rule::{Operand, Rule, Term};

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn error(&self, message: impl Into<String>, position: usize) -> ParseError {
        ParseError {
            message: message.into(),
            position,
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            Some(ch) => Err(self.error(
                format!("expected '{}', found '{}'", expected, ch),
                self.pos,
            )),
            None => Err(self.error(
                format!("expected '{}', found end of input", expected),
                self.pos,
            )),
        }
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        let remaining = self.remaining();
        remaining.starts_with(keyword)
            && !remaining[keyword.len()..]
                .chars()
                .next()
                .is_some_and(|c| c.is_alphanumeric() || c == '_')
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), ParseError> {
        if self.peek_keyword(keyword) {
            self.pos += keyword.len();
            Ok(())
        } else {
            let found = self.peek_word();
            Err(self.error(format!("expected '{}', found '{}'", keyword, found), self.pos))
        }
    }

    /// Identifier at the cursor, without consuming it. Empty if none.
    fn word(&self) -> &'a str {
        let remaining = self.remaining();
        let end = remaining
            .char_indices()
            .find(|(_, c)| !(c.is_alphanumeric() || *c == '_'))
            .map(|(i, _)| i)
            .unwrap_or(remaining.len());
        &remaining[..end]
    }

    fn peek_word(&self) -> String {
        let word = self.word();
        if word.is_empty() {
            self.peek()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "end of input".to_string())
        } else {
            word.to_string()
        }
    }

    fn parse_number(&mut self) -> Result<f64, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let mut has_dot = false;
        let mut digits = 0;

        if self.peek() == Some('-') {
            self.advance();
        }

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits += 1;
                self.advance();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        if digits == 0 {
            return Err(self.error("expected number", start));
        }

        let num_str = &self.input[start..self.pos];
        num_str
            .parse::<f64>()
            .map_err(|_| self.error(format!("invalid number: {}", num_str), start))
    }

    fn parse_integer(&mut self) -> Result<usize, ParseError> {
        self.skip_whitespace();
        let start = self.pos;

        while self.peek().is_some_and(|ch| ch.is_ascii_digit()) {
            self.advance();
        }

        if self.pos == start {
            return Err(self.error("expected integer", start));
        }

        let num_str = &self.input[start..self.pos];
        num_str
            .parse::<usize>()
            .map_err(|_| self.error(format!("invalid integer: {}", num_str), start))
    }

    fn parse_positive(&mut self, what: &str) -> Result<usize, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let n = self.parse_integer()?;
        if n == 0 {
            return Err(self.error(format!("{} must be positive", what), start));
        }
        Ok(n)
    }

    fn parse_window(&mut self) -> Result<usize, ParseError> {
        let window = self.parse_positive("window")?;
        self.expect_char(')')?;
        Ok(window)
    }

    fn parse_macd_params(&mut self) -> Result<IndicatorType, ParseError> {
        let short = self.parse_positive("period")?;
        self.expect_char(',')?;
        let long = self.parse_positive("period")?;
        self.expect_char(',')?;
        let signal = self.parse_positive("period")?;
        self.expect_char(')')?;
        Ok(IndicatorType::Macd {
            short,
            long,
            signal,
        })
    }

    fn parse_bollinger_params(&mut self) -> Result<IndicatorType, ParseError> {
        let window = self.parse_positive("window")?;
        self.expect_char(',')?;
        self.skip_whitespace();
        let start = self.pos;
        let mult = self.parse_number()?;
        if !mult.is_finite() || mult < 0.0 {
            return Err(self.error("band multiplier must be a non-negative number", start));
        }
        self.expect_char(')')?;
        Ok(IndicatorType::bollinger(window, mult))
    }

    /// `name` has been consumed along with its opening parenthesis.
    fn parse_indicator(&mut self, name: &str, start: usize) -> Result<Operand, ParseError> {
        let (indicator_type, field) = match name {
            "MA" => (IndicatorType::Ma(self.parse_window()?), IndicatorField::Value),
            "MA_VOLUME" => (IndicatorType::MaVolume(self.parse_window()?), IndicatorField::Value),
            "BIAS" => (IndicatorType::Bias(self.parse_window()?), IndicatorField::Value),
            "K" => (IndicatorType::Kd(self.parse_window()?), IndicatorField::K),
            "D" => (IndicatorType::Kd(self.parse_window()?), IndicatorField::D),
            "DIF" => (self.parse_macd_params()?, IndicatorField::Dif),
            "DEM" => (self.parse_macd_params()?, IndicatorField::Dem),
            "OSC" => (self.parse_macd_params()?, IndicatorField::Osc),
            "BTOP" => (self.parse_bollinger_params()?, IndicatorField::Top),
            "BBOTTOM" => (self.parse_bollinger_params()?, IndicatorField::Bottom),
            "BWIDTH" => (self.parse_bollinger_params()?, IndicatorField::Width),
            _ => return Err(self.error(format!("unknown indicator '{}'", name), start)),
        };
        Ok(Operand::Indicator(IndicatorRef::new(indicator_type, field)))
    }

    fn parse_atom(&mut self) -> Result<Operand, ParseError> {
        self.skip_whitespace();

        if self
            .peek()
            .is_some_and(|ch| ch.is_ascii_digit() || ch == '-' || ch == '.')
        {
            return Ok(Operand::Constant(self.parse_number()?));
        }

        let start = self.pos;
        let word = self.word();
        if word.is_empty() {
            return Err(self.error(
                format!("expected operand, found '{}'", self.peek_word()),
                start,
            ));
        }
        self.pos += word.len();

        if self.peek() == Some('(') {
            self.advance();
            return self.parse_indicator(word, start);
        }

        let operand = match word {
            "open" => Operand::Open,
            "high" => Operand::High,
            "low" => Operand::Low,
            "close" => Operand::Close,
            "adj_close" => Operand::AdjClose,
            "volume" => Operand::Volume,
            column => Operand::Column(column.to_string()),
        };
        Ok(operand)
    }

    fn parse_term(&mut self) -> Result<Term, ParseError> {
        let operand = self.parse_atom()?;
        self.skip_whitespace();
        if self.peek() == Some('[') {
            self.advance();
            let offset = self.parse_integer()?;
            self.expect_char(']')?;
            return Ok(Term::back(operand, offset));
        }
        Ok(Term::now(operand))
    }

    fn parse_comparison(&mut self, keyword: &str) -> Result<Rule, ParseError> {
        self.expect_keyword(keyword)?;
        self.expect_char('(')?;

        let left = self.parse_term()?;
        self.expect_char(',')?;
        let right = self.parse_term()?;
        self.expect_char(')')?;

        let rule = match keyword {
            "CROSS_ABOVE" => Rule::CrossAbove { left, right },
            "CROSS_BELOW" => Rule::CrossBelow { left, right },
            "ABOVE" => Rule::Above { left, right },
            _ => Rule::Below { left, right },
        };
        Ok(rule)
    }

    fn parse_between(&mut self) -> Result<Rule, ParseError> {
        self.expect_keyword("BETWEEN")?;
        self.expect_char('(')?;

        let term = self.parse_term()?;
        self.expect_char(',')?;
        let lower = self.parse_number()?;
        self.expect_char(',')?;
        let upper = self.parse_number()?;
        self.expect_char(')')?;

        Ok(Rule::Between { term, lower, upper })
    }

    fn parse_rule_list(&mut self, keyword: &str) -> Result<Vec<Rule>, ParseError> {
        self.expect_keyword(keyword)?;
        self.expect_char('(')?;

        let mut rules = vec![self.parse_rule()?];
        loop {
            self.skip_whitespace();
            if self.peek() == Some(')') {
                self.advance();
                break;
            }
            self.expect_char(',')?;
            rules.push(self.parse_rule()?);
        }

        if rules.len() < 2 {
            return Err(self.error(format!("{} requires at least 2 rules", keyword), self.pos));
        }
        Ok(rules)
    }

    fn parse_not(&mut self) -> Result<Rule, ParseError> {
        self.expect_keyword("NOT")?;
        self.expect_char('(')?;
        let rule = self.parse_rule()?;
        self.expect_char(')')?;
        Ok(Rule::Not(Box::new(rule)))
    }

    fn parse_windowed(&mut self, keyword: &str) -> Result<(Box<Rule>, usize), ParseError> {
        self.expect_keyword(keyword)?;
        self.expect_char('(')?;
        let rule = self.parse_rule()?;
        self.expect_char(',')?;
        let count = self.parse_positive("count")?;
        self.expect_char(')')?;
        Ok((Box::new(rule), count))
    }

    fn parse_rule(&mut self) -> Result<Rule, ParseError> {
        self.skip_whitespace();

        for keyword in ["CROSS_ABOVE", "CROSS_BELOW", "ABOVE", "BELOW"] {
            if self.peek_keyword(keyword) {
                return self.parse_comparison(keyword);
            }
        }
        if self.peek_keyword("BETWEEN") {
            return self.parse_between();
        }
        if self.peek_keyword("AND") {
            return Ok(Rule::And(self.parse_rule_list("AND")?));
        }
        if self.peek_keyword("OR") {
            return Ok(Rule::Or(self.parse_rule_list("OR")?));
        }
        if self.peek_keyword("NOT") {
            return self.parse_not();
        }
        if self.peek_keyword("CONSECUTIVE") {
            let (rule, count) = self.parse_windowed("CONSECUTIVE")?;
            return Ok(Rule::Consecutive { rule, count });
        }
        if self.peek_keyword("ANY_OF") {
            let (rule, count) = self.parse_windowed("ANY_OF")?;
            return Ok(Rule::AnyOf { rule, count });
        }

        let word = self.peek_word();
        Err(self.error(format!("expected rule, found '{}'", word), self.pos))
    }

    fn parse(&mut self) -> Result<Rule, ParseError> {
        let rule = self.parse_rule()?;
        self.skip_whitespace();
        if self.pos < self.input.len() {
            return Err(self.error(
                format!("unexpected input after rule: '{}'", self.remaining()),
                self.pos,
            ));
        }
        Ok(rule)
    }
}

pub fn parse(input: &str) -> Result<Rule, ParseError> {
    let mut parser = Parser::new(input);
    parser.parse()
}
