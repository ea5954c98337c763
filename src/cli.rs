//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{Backtest, BacktestConfig, DEFAULT_RISK_FREE_RATE};
use crate::domain::black_scholes::{self, BlackScholesEngine};
use crate::domain::config_validation::{
    parse_date, parse_risk_free_rate, validate_backtest_config, validate_data_config,
    validate_strategies_config,
};
use crate::domain::error::BandtestError;
use crate::domain::metrics::CurveMetrics;
use crate::domain::ohlcv::PriceField;
use crate::domain::rule_eval::RuleStrategy;
use crate::domain::rule_parser;
use crate::domain::stock::Stock;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::{candidate_symbols, fetch_with_fallback, DataPort, DEFAULT_SUFFIXES};
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "bandtest", about = "Technical indicators and long/flat backtests")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compute indicator columns and write them as CSV
    Indicators {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        symbol: Option<String>,
    },
    /// Run every configured strategy and report its equity curve
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a configuration and its strategy rules
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Price an option or calibrate its implied volatility
    #[command(name = "option")]
    OptionQuote {
        /// Price a put instead of a call
        #[arg(long)]
        put: bool,
        #[arg(long)]
        strike: f64,
        /// Underlying price
        #[arg(long)]
        spot: f64,
        #[arg(long)]
        today: NaiveDate,
        #[arg(long)]
        maturity: NaiveDate,
        #[arg(long, default_value_t = black_scholes::DEFAULT_IV)]
        iv: f64,
        #[arg(long, default_value_t = black_scholes::DEFAULT_RATE)]
        rate: f64,
        /// Calibrate the volatility to this option price first
        #[arg(long)]
        market_price: Option<f64>,
    },
    /// List symbols available in the data directory
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the data range of a symbol and its fallbacks
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Indicators {
            config,
            output,
            symbol,
        } => run_indicators(&config, output.as_ref(), symbol.as_deref()),
        Command::Backtest {
            config,
            output,
            symbol,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config)
            } else {
                run_backtest(&config, output.as_ref(), symbol.as_deref())
            }
        }
        Command::Validate { config } => run_validate(&config),
        Command::OptionQuote {
            put,
            strike,
            spot,
            today,
            maturity,
            iv,
            rate,
            market_price,
        } => {
            let engine = BlackScholesEngine::new(!put, strike, today, maturity, iv).with_rate(rate);
            run_option(engine, spot, market_price)
        }
        Command::ListSymbols { config } => run_list_symbols(&config),
        Command::Info { config, symbol } => run_info(&config, symbol.as_deref()),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = BandtestError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, BandtestError> {
    let price = match config.get_string("backtest", "price") {
        None => PriceField::default(),
        Some(value) => PriceField::parse(&value).ok_or_else(|| BandtestError::ConfigInvalid {
            section: "backtest".into(),
            key: "price".into(),
            reason: format!("expected adj_close or close, found '{}'", value),
        })?,
    };

    Ok(BacktestConfig {
        price,
        risk_free_rate: parse_risk_free_rate(config)?.unwrap_or(DEFAULT_RISK_FREE_RATE),
    })
}

/// Parse every `[strategies]` entry, keeping file order.
pub fn build_strategies(
    config: &dyn ConfigPort,
) -> Result<Vec<(String, RuleStrategy)>, BandtestError> {
    config
        .keys("strategies")
        .into_iter()
        .map(|name| {
            let text = config.get_string("strategies", &name).unwrap_or_default();
            Ok((name, RuleStrategy::parse(&text)?))
        })
        .collect()
}

/// Ticker suffixes from `[data] suffixes` (comma separated), else the
/// exchange defaults.
pub fn resolve_suffixes(config: &dyn ConfigPort) -> Vec<String> {
    match config.get_string("data", "suffixes") {
        Some(list) => list
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        None => DEFAULT_SUFFIXES.iter().map(|s| s.to_string()).collect(),
    }
}

fn resolve_candidates(config: &dyn ConfigPort, symbol_override: Option<&str>) -> Vec<String> {
    let id = symbol_override
        .map(str::to_string)
        .or_else(|| config.get_string("data", "symbol"))
        .unwrap_or_default();
    let suffixes = resolve_suffixes(config);
    let suffixes: Vec<&str> = suffixes.iter().map(String::as_str).collect();
    candidate_symbols(&id, &suffixes)
}

fn data_adapter(config: &dyn ConfigPort) -> CsvAdapter {
    let dir = config.get_string("data", "dir").unwrap_or_else(|| ".".to_string());
    CsvAdapter::new(PathBuf::from(dir))
}

/// Fetch the configured instrument, trying each ticker spelling in turn, and
/// build its store.
pub fn load_stock(
    config: &dyn ConfigPort,
    port: &dyn DataPort,
    symbol_override: Option<&str>,
) -> Result<Stock, BandtestError> {
    let start_date = parse_date(config, "start_date")?.unwrap_or(NaiveDate::MIN);
    let end_date = parse_date(config, "end_date")?.unwrap_or(NaiveDate::MAX);
    let candidates = resolve_candidates(config, symbol_override);

    let (symbol, bars) = fetch_with_fallback(port, &candidates, start_date, end_date)?;
    eprintln!("Loaded {} bars for {}", bars.len(), symbol);
    Stock::new(symbol, bars)
}

fn write_output(
    output_path: Option<&PathBuf>,
    dates: &[NaiveDate],
    columns: &[(&str, &[f64])],
) -> Result<(), BandtestError> {
    let report = CsvReportAdapter::new();
    match output_path {
        Some(path) => {
            report.write_table(dates, columns, &path.display().to_string())?;
            eprintln!("\nTable written to: {}", path.display());
            Ok(())
        }
        None => report.write_to(std::io::stdout().lock(), dates, columns),
    }
}

fn run_indicators(
    config_path: &PathBuf,
    output_path: Option<&PathBuf>,
    symbol: Option<&str>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    if let Err(e) = validate_data_config(&config) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    let strategies = match build_strategies(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let port = data_adapter(&config);
    let mut stock = match load_stock(&config, &port, symbol) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let computed = stock.add_default_columns().and_then(|_| {
        strategies
            .iter()
            .try_for_each(|(_, strategy)| strategy.prepare(&mut stock))
    });
    if let Err(e) = computed {
        eprintln!("error: {e}");
        return (&e).into();
    }

    eprintln!("Computed {} columns", stock.column_names().len());

    let dates = stock.dates();
    let columns: Vec<(&str, &[f64])> = stock
        .column_names()
        .iter()
        .filter_map(|name| stock.column(name).map(|values| (name.as_str(), values)))
        .collect();

    match write_output(output_path, &dates, &columns) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: failed to write table: {e}");
            (&e).into()
        }
    }
}

fn run_backtest(
    config_path: &PathBuf,
    output_path: Option<&PathBuf>,
    symbol: Option<&str>,
) -> ExitCode {
    // Stage 1: Load config
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    // Stage 2: Validate
    let validated = validate_data_config(&config)
        .and_then(|_| validate_backtest_config(&config))
        .and_then(|_| validate_strategies_config(&config));
    if let Err(e) = validated {
        eprintln!("error: {e}");
        return (&e).into();
    }

    let bt_config = match build_backtest_config(&config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 3: Parse strategies
    let strategies = match build_strategies(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 4: Load data and compute the columns the rules read
    let port = data_adapter(&config);
    let mut stock = match load_stock(&config, &port, symbol) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    for (name, strategy) in &strategies {
        if let Err(e) = strategy.prepare(&mut stock) {
            eprintln!("error: strategy {}: {e}", name);
            return (&e).into();
        }
    }

    // Stage 5: Run
    if let (Some(first), Some(last)) = (stock.bars().first(), stock.bars().last()) {
        eprintln!(
            "Running {} strategies over {} bars ({} to {})",
            strategies.len(),
            stock.len(),
            first.date,
            last.date
        );
    }

    let mut backtest = Backtest::new(&stock, bt_config);
    for (name, strategy) in &strategies {
        if let Err(e) = backtest.add_strategy(name, strategy) {
            eprintln!("error: strategy {}: {e}", name);
            return (&e).into();
        }
    }

    for result in backtest.curves() {
        let metrics =
            CurveMetrics::compute(&result.equity, &result.signal, bt_config.risk_free_rate);
        print_metrics(&result.name, &metrics);
    }

    // Stage 6: Write equity table
    let dates = backtest.dates();
    let columns: Vec<(&str, &[f64])> = backtest
        .curves()
        .iter()
        .map(|r| (r.name.as_str(), r.equity.as_slice()))
        .collect();

    match write_output(output_path, &dates, &columns) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: failed to write table: {e}");
            (&e).into()
        }
    }
}

fn print_metrics(name: &str, metrics: &CurveMetrics) {
    eprintln!("\n=== {} ===", name);
    eprintln!("Total Return:     {:.2}%", metrics.total_return * 100.0);
    eprintln!(
        "Annual Return:    {:.2}%",
        metrics.annualized_return * 100.0
    );
    eprintln!("Sharpe Ratio:     {:.2}", metrics.sharpe_ratio);
    eprintln!("Sortino Ratio:    {:.2}", metrics.sortino_ratio);
    eprintln!("Max Drawdown:     -{:.1}%", metrics.max_drawdown * 100.0);
    eprintln!("Max DD Duration:  {} bars", metrics.max_drawdown_duration);
    eprintln!("Exposure:         {:.1}%", metrics.exposure * 100.0);
    eprintln!("Entries:          {}", metrics.entries);
}

fn run_dry_run(config_path: &PathBuf) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let validated = validate_data_config(&config)
        .and_then(|_| validate_backtest_config(&config))
        .and_then(|_| validate_strategies_config(&config));
    if let Err(e) = validated {
        eprintln!("error: {e}");
        return (&e).into();
    }

    let bt_config = match build_backtest_config(&config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let strategies = match build_strategies(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    eprintln!("\nBacktest:");
    eprintln!("  price:          {:?}", bt_config.price);
    eprintln!("  risk_free_rate: {}", bt_config.risk_free_rate);

    eprintln!("\nStrategy rules (parsed):");
    for (name, strategy) in &strategies {
        eprintln!("  {}: {}", name, strategy.rule());
    }

    let mut indicator_list: Vec<String> = strategies
        .iter()
        .flat_map(|(_, s)| s.required_indicators())
        .map(|i| i.to_string())
        .collect();
    indicator_list.sort();
    indicator_list.dedup();

    eprintln!("\nIndicators to compute:");
    for ind in &indicator_list {
        eprintln!("  {}", ind);
    }

    eprintln!("\nData:");
    eprintln!(
        "  dir:        {}",
        config.get_string("data", "dir").unwrap_or_default()
    );
    eprintln!(
        "  candidates: {}",
        resolve_candidates(&config, None).join(", ")
    );

    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let validated = validate_data_config(&config).and_then(|_| validate_backtest_config(&config));
    if let Err(e) = validated {
        eprintln!("error: {e}");
        return (&e).into();
    }

    let names = config.keys("strategies");
    if names.is_empty() {
        let err = BandtestError::ConfigMissing {
            section: "strategies".into(),
            key: "<name> = <rule>".into(),
        };
        eprintln!("error: {err}");
        return (&err).into();
    }

    for name in &names {
        let text = config.get_string("strategies", name).unwrap_or_default();
        eprintln!("\nStrategy {}:", name);
        match rule_parser::parse(&text) {
            Ok(rule) => {
                eprintln!("  Parsed: {}", rule);
                eprintln!("  Raw:    {}", text);
            }
            Err(e) => {
                eprintln!("  error: {}", e.display_with_context(&text));
                return (&BandtestError::from(e)).into();
            }
        }
    }

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn run_option(mut engine: BlackScholesEngine, spot: f64, market_price: Option<f64>) -> ExitCode {
    if engine.strike() <= 0.0 || spot <= 0.0 {
        eprintln!("error: strike and spot must be positive");
        return ExitCode::from(2);
    }

    if let Some(target) = market_price {
        let iv = engine.update_iv(spot, target);
        if iv == 0.0 {
            eprintln!("warning: no implied volatility for price {}", target);
        }
    }

    println!("type:      {}", if engine.is_call() { "call" } else { "put" });
    println!("expiry:    {:.4} years", engine.time_to_expiry());
    println!("iv:        {:.6}", engine.iv());
    println!("price:     {:.4}", engine.price(spot));
    println!("delta:     {:.4}", engine.delta(spot));
    println!("theta:     {:.4} per day", engine.theta(spot));
    println!("vega:      {:.4}", engine.vega(spot));
    ExitCode::SUCCESS
}

fn run_list_symbols(config_path: &PathBuf) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let adapter = data_adapter(&config);
    let symbols = match adapter.list_symbols() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    if symbols.is_empty() {
        eprintln!("No symbols found in {}", display_dir(&config));
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
    ExitCode::SUCCESS
}

fn run_info(config_path: &PathBuf, symbol: Option<&str>) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let has_symbol = symbol.is_some()
        || config
            .get_string("data", "symbol")
            .is_some_and(|s| !s.trim().is_empty());
    if !has_symbol {
        eprintln!("error: symbol is required (use --symbol or set [data] symbol)");
        return ExitCode::from(2);
    }

    let candidates = resolve_candidates(&config, symbol);

    let adapter = data_adapter(&config);
    for candidate in &candidates {
        match adapter.get_data_range(candidate) {
            Ok(Some((first, last, count))) => {
                println!("{}: {} bars, {} to {}", candidate, count, first, last);
            }
            Ok(None) => {
                eprintln!("{}: no data found", candidate);
            }
            Err(e) => {
                eprintln!("{}: {}", candidate, e);
            }
        }
    }
    ExitCode::SUCCESS
}

fn display_dir(config: &dyn ConfigPort) -> String {
    let dir = config.get_string("data", "dir").unwrap_or_else(|| ".".to_string());
    Path::new(&dir).display().to_string()
}
