//! Domain error types.

/// A parse error with position information for rule parsing.
#[derive(Debug, Clone, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    /// Format the error with a caret pointing at the error position in the input.
    pub fn display_with_context(&self, input: &str) -> String {
        let caret = " ".repeat(self.position) + "^";
        format!(
            "{input}\n{caret}\n{err}",
            input = input,
            caret = caret,
            err = self
        )
    }
}

/// Top-level error type for bandtest.
#[derive(Debug, thiserror::Error)]
pub enum BandtestError {
    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    RuleParse(#[from] ParseError),

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("bars for {symbol} are not strictly increasing by date at index {index}")]
    UnsortedBars { symbol: String, index: usize },

    #[error("column {name} has {actual} values, expected {expected}")]
    ColumnLength {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("unknown column: {name}")]
    UnknownColumn { name: String },

    #[error("bar index {index} out of range for {len} bars")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("lookback of {offset} bars from index {index} is before the first bar")]
    LookbackOutOfRange { index: usize, offset: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&BandtestError> for std::process::ExitCode {
    fn from(err: &BandtestError) -> Self {
        let code: u8 = match err {
            BandtestError::Io(_) => 1,
            BandtestError::ConfigParse { .. }
            | BandtestError::ConfigMissing { .. }
            | BandtestError::ConfigInvalid { .. } => 2,
            BandtestError::Data { .. } => 3,
            BandtestError::RuleParse(_) | BandtestError::UnknownColumn { .. } => 4,
            BandtestError::NoData { .. }
            | BandtestError::UnsortedBars { .. }
            | BandtestError::ColumnLength { .. } => 5,
            BandtestError::IndexOutOfRange { .. } | BandtestError::LookbackOutOfRange { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_context_points_at_position() {
        let err = ParseError {
            message: "expected ')'".into(),
            position: 4,
        };
        let rendered = err.display_with_context("K(9 > D");
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "K(9 > D");
        assert_eq!(lines[1], "    ^");
        assert!(lines[2].contains("position 4"));
    }

    #[test]
    fn lookback_error_message() {
        let err = BandtestError::LookbackOutOfRange {
            index: 0,
            offset: 1,
        };
        assert_eq!(
            err.to_string(),
            "lookback of 1 bars from index 0 is before the first bar"
        );
    }

    #[test]
    fn parse_error_converts_into_rule_parse() {
        let err: BandtestError = ParseError {
            message: "bad".into(),
            position: 0,
        }
        .into();
        assert!(matches!(err, BandtestError::RuleParse(_)));
    }
}
