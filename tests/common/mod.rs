#![allow(dead_code)]

use algoedge::domain::backtest::RunParameters;
use algoedge::domain::error::AlgoedgeError;
pub use algoedge::domain::ohlcv::PriceBar;
use algoedge::domain::strategy::StrategyDocument;
use algoedge::ports::data_port::DataPort;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashMap;

/// In-memory bars keyed by `SYMBOL@TIMEFRAME`.
pub struct MockDataPort {
    pub data: HashMap<String, Vec<PriceBar>>,
    pub errors: HashMap<String, String>,
}

fn key(symbol: &str, timeframe: &str) -> String {
    format!("{symbol}@{timeframe}")
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, timeframe: &str, bars: Vec<PriceBar>) -> Self {
        self.data.insert(key(symbol, timeframe), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, timeframe: &str, reason: &str) -> Self {
        self.errors
            .insert(key(symbol, timeframe), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(&self, params: &RunParameters) -> Result<Vec<PriceBar>, AlgoedgeError> {
        let k = key(&params.symbol, &params.timeframe);
        if let Some(reason) = self.errors.get(&k) {
            return Err(AlgoedgeError::DataSource {
                reason: reason.clone(),
            });
        }
        match self.data.get(&k) {
            Some(bars) if !bars.is_empty() => Ok(bars.clone()),
            _ => Err(AlgoedgeError::NoData {
                symbol: params.symbol.clone(),
                timeframe: params.timeframe.clone(),
            }),
        }
    }
}

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

pub fn hour(i: usize) -> DateTime<Utc> {
    start() + Duration::hours(i as i64)
}

/// Hourly bars with open = high = low = close.
pub fn bars_from_closes(closes: &[f64]) -> Vec<PriceBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PriceBar {
            timestamp: hour(i),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1000.0,
        })
        .collect()
}

/// Hourly bars with a one-point range around the close.
pub fn ranged_bars(closes: &[f64]) -> Vec<PriceBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PriceBar {
            timestamp: hour(i),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 500.0 + i as f64,
        })
        .collect()
}

/// `n` closes rising by `step` from `first`.
pub fn rising_closes(first: f64, step: f64, n: usize) -> Vec<f64> {
    (0..n).map(|i| first + step * i as f64).collect()
}

/// A wave around 100 with enough swing to trigger crossovers.
pub fn wave_closes(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 100.0 + 8.0 * (i as f64 / 6.0).sin() + i as f64 * 0.05)
        .collect()
}

pub fn parse_strategy(json: &str) -> StrategyDocument {
    StrategyDocument::from_json(json).unwrap()
}

/// Enter whenever the close is positive, default risk.
pub fn always_in_strategy() -> StrategyDocument {
    parse_strategy(
        r#"{
            "name": "Always In",
            "blocks": [
                {"id": "entry", "type": "entry", "logic": [{"op": "greater_than", "a": "close", "b": 0}]}
            ]
        }"#,
    )
}

/// Fast/slow SMA crossover with wide risk so only the signals close trades.
pub fn sma_cross_strategy() -> StrategyDocument {
    parse_strategy(
        r#"{
            "version": "1.0",
            "name": "SMA Cross",
            "blocks": [
                {"id": "fast", "type": "indicator", "indicator": "SMA", "params": {"length": 3}},
                {"id": "slow", "type": "indicator", "indicator": "SMA", "params": {"length": 8}},
                {"id": "entry", "type": "entry", "logic": [{"op": "crosses_above", "a": "fast", "b": "slow"}]},
                {"id": "exit", "type": "exit", "logic": [{"op": "crosses_below", "a": "fast", "b": "slow"}]},
                {"id": "risk", "type": "risk", "params": {"stop_loss_pct": 0.5, "take_profit_pct": 5.0, "risk_per_trade_pct": 10.0}}
            ]
        }"#,
    )
}
