//! CLI integration tests.
//!
//! Tests cover:
//! - Config parsing (build_backtest_config, build_strategies, resolve_suffixes)
//! - Store loading through the fallback list with MockDataPort
//! - Commands run end to end against INI and CSV files on disk

mod common;

use bandtest::adapters::file_config_adapter::FileConfigAdapter;
use bandtest::cli::{self, Cli};
use bandtest::domain::backtest::DEFAULT_RISK_FREE_RATE;
use bandtest::domain::error::BandtestError;
use bandtest::domain::ohlcv::PriceField;
use clap::Parser;
use common::*;
use std::path::Path;
use std::process::ExitCode;
use tempfile::TempDir;

fn same_code(actual: ExitCode, expected: ExitCode) -> bool {
    format!("{:?}", actual) == format!("{:?}", expected)
}

fn run_args(args: &[&str]) -> ExitCode {
    let mut argv = vec!["bandtest"];
    argv.extend_from_slice(args);
    cli::run(Cli::parse_from(argv))
}

/// A data directory holding `2330.TW.csv` and an INI pointing at it.
fn setup_workspace(strategies: &str) -> (TempDir, String) {
    let dir = TempDir::new().unwrap();
    write_yahoo_csv(dir.path(), "2330.TW", &generate_bars(60, 500.0));

    let ini = format!(
        concat!(
            "[data]\ndir = {}\nsymbol = 2330\n\n",
            "[backtest]\nprice = adj_close\nrisk_free_rate = 0.027\n\n",
            "[strategies]\n{}\n"
        ),
        dir.path().display(),
        strategies
    );
    let config_path = dir.path().join("bandtest.ini");
    std::fs::write(&config_path, ini).unwrap();
    let config_path = config_path.to_str().unwrap().to_string();
    (dir, config_path)
}

fn output_path(dir: &Path, name: &str) -> String {
    dir.join(name).to_str().unwrap().to_string()
}

const VALID_INI: &str = r#"
[data]
dir = ./data
symbol = 2330
suffixes = .TW, .TWO
start_date = 2020-01-01
end_date = 2024-12-31

[backtest]
price = close
risk_free_rate = 0.015

[strategies]
golden = CROSS_ABOVE(MA(5), MA(20))
kd = AND(ABOVE(K(9), D(9)), BELOW(K(9), 80))
"#;

mod config_loading {
    use super::*;

    #[test]
    fn build_backtest_config_reads_values() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let config = cli::build_backtest_config(&adapter).unwrap();
        assert_eq!(config.price, PriceField::Close);
        assert!((config.risk_free_rate - 0.015).abs() < f64::EPSILON);
    }

    #[test]
    fn build_backtest_config_rejects_unknown_price() {
        let adapter = FileConfigAdapter::from_string("[backtest]\nprice = open\n").unwrap();
        let err = cli::build_backtest_config(&adapter).unwrap_err();
        assert!(matches!(err, BandtestError::ConfigInvalid { key, .. } if key == "price"));
    }

    #[test]
    fn build_backtest_config_rejects_percent_rate() {
        let adapter =
            FileConfigAdapter::from_string("[backtest]\nrisk_free_rate = 2.7%\n").unwrap();
        let err = cli::build_backtest_config(&adapter).unwrap_err();
        assert!(matches!(err, BandtestError::ConfigInvalid { key, .. } if key == "risk_free_rate"));
    }

    #[test]
    fn build_backtest_config_defaults_rate_when_absent() {
        let adapter = FileConfigAdapter::from_string("[backtest]\nprice = close\n").unwrap();
        let config = cli::build_backtest_config(&adapter).unwrap();
        assert_eq!(config.risk_free_rate, DEFAULT_RISK_FREE_RATE);
    }

    #[test]
    fn build_strategies_in_file_order() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let strategies = cli::build_strategies(&adapter).unwrap();
        assert_eq!(strategies.len(), 2);
        assert_eq!(strategies[0].0, "golden");
        assert_eq!(strategies[1].0, "kd");
        assert_eq!(
            strategies[0].1.rule().to_string(),
            "CROSS_ABOVE(MA(5), MA(20))"
        );
    }

    #[test]
    fn suffixes_trimmed() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        assert_eq!(cli::resolve_suffixes(&adapter), vec![".TW", ".TWO"]);
    }
}

mod store_loading {
    use super::*;

    #[test]
    fn load_stock_uses_fallback_and_dates() {
        let adapter = FileConfigAdapter::from_string(
            "[data]\nsymbol = 2330\nstart_date = 2024-01-03\nend_date = 2024-01-05\n",
        )
        .unwrap();
        let port = MockDataPort::new().with_bars("2330.TWO", generate_bars(10, 100.0));

        let stock = cli::load_stock(&adapter, &port, None).unwrap();

        assert_eq!(stock.symbol(), "2330.TWO");
        assert_eq!(stock.len(), 3);
        assert_eq!(stock.bars()[0].date, date(2024, 1, 3));
        assert_eq!(port.requested(), vec!["2330.TW", "2330.TWO"]);
    }

    #[test]
    fn symbol_override_wins() {
        let adapter = FileConfigAdapter::from_string("[data]\nsymbol = 2330\n").unwrap();
        let port = MockDataPort::new().with_bars("2317.TW", generate_bars(5, 100.0));

        let stock = cli::load_stock(&adapter, &port, Some("2317")).unwrap();
        assert_eq!(stock.symbol(), "2317.TW");
    }

    #[test]
    fn missing_everywhere_is_an_error() {
        let adapter = FileConfigAdapter::from_string("[data]\nsymbol = 2330\n").unwrap();
        let port = MockDataPort::new();

        let err = cli::load_stock(&adapter, &port, None).unwrap_err();
        assert!(matches!(err, BandtestError::NoData { symbol } if symbol == "2330"));
    }
}

mod commands {
    use super::*;

    #[test]
    fn backtest_writes_equity_table() {
        let (dir, config) =
            setup_workspace("trend = ABOVE(close, MA(10))\nflat = BELOW(close, 0)");
        let out = output_path(dir.path(), "equity.csv");

        let code = run_args(&["backtest", "-c", &config, "-o", &out]);
        assert!(same_code(code, ExitCode::SUCCESS));

        let text = std::fs::read_to_string(&out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "date,trend,flat");
        assert_eq!(lines.len(), 61);
        assert!(lines[1].ends_with(",1,1"));
        assert!(lines[60].ends_with(",1"));
    }

    #[test]
    fn indicators_writes_default_and_rule_columns() {
        let (dir, config) = setup_workspace("kd = CROSS_ABOVE(K(5), D(5))");
        let out = output_path(dir.path(), "columns.csv");

        let code = run_args(&["indicators", "-c", &config, "-o", &out]);
        assert!(same_code(code, ExitCode::SUCCESS));

        let text = std::fs::read_to_string(&out).unwrap();
        let header = text.lines().next().unwrap();
        assert!(header.starts_with("date,MA5,K,D,DIF,DEM,OSC,BIAS,BTOP,BBOTTOM,BWIDTH"));
        assert!(header.ends_with("K(5),D(5)"));
    }

    #[test]
    fn dry_run_does_not_need_data() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("dry.ini");
        std::fs::write(&config, VALID_INI).unwrap();

        let code = run_args(&["backtest", "-c", config.to_str().unwrap(), "--dry-run"]);
        assert!(same_code(code, ExitCode::SUCCESS));
    }

    #[test]
    fn bad_rule_exits_with_rule_code() {
        let (_dir, config) = setup_workspace("bad = ABOVE(close MA(5))");

        let code = run_args(&["validate", "-c", &config]);
        assert!(same_code(code, ExitCode::from(4)));

        let code = run_args(&["backtest", "-c", &config, "--dry-run"]);
        assert!(same_code(code, ExitCode::from(4)));
    }

    #[test]
    fn unknown_column_exits_with_rule_code() {
        let (dir, config) = setup_workspace("bare = ABOVE(SIGNAL, 0)");
        let out = output_path(dir.path(), "equity.csv");

        let code = run_args(&["backtest", "-c", &config, "-o", &out]);
        assert!(same_code(code, ExitCode::from(4)));
        assert!(!Path::new(&out).exists());
    }

    #[test]
    fn missing_config_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.ini");

        let code = run_args(&["validate", "-c", missing.to_str().unwrap()]);
        assert!(same_code(code, ExitCode::from(2)));
    }

    #[test]
    fn unparseable_rate_is_config_error() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("rate.ini");
        let ini = VALID_INI.replace("risk_free_rate = 0.015", "risk_free_rate = 2.7%");
        std::fs::write(&config, ini).unwrap();

        let code = run_args(&["validate", "-c", config.to_str().unwrap()]);
        assert!(same_code(code, ExitCode::from(2)));
    }

    #[test]
    fn missing_data_exits_with_data_code() {
        let (_dir, config) = setup_workspace("hold = ABOVE(close, 0)");

        let code = run_args(&["backtest", "-c", &config, "--symbol", "9999"]);
        assert!(same_code(code, ExitCode::from(3)));
    }

    #[test]
    fn option_pricing_succeeds() {
        let code = run_args(&[
            "option",
            "--strike",
            "100",
            "--spot",
            "100",
            "--today",
            "2024-01-01",
            "--maturity",
            "2024-12-31",
            "--market-price",
            "10",
        ]);
        assert!(same_code(code, ExitCode::SUCCESS));
    }
}
