//! Core domain types and logic.

pub mod ohlcv;
pub mod series;
pub mod strategy;
pub mod indicator;
pub mod resolver;
pub mod rule_eval;
pub mod position;
pub mod portfolio;
pub mod backtest;
pub mod metrics;
pub mod optimizer;
pub mod config_validation;
pub mod error;
