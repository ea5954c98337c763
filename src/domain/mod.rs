//! Core domain types and logic.

pub mod ohlcv;
pub mod indicator;
pub mod indicator_helpers;
pub mod stock;
pub mod strategy;
pub mod rule;
pub mod rule_parser;
pub mod rule_eval;
pub mod backtest;
pub mod metrics;
pub mod black_scholes;
pub mod config_validation;
pub mod error;
