//! Backtest engine and event loop.
//!
//! `BacktestConfig` holds the run-wide numeric settings; `RunParameters` names
//! the data request a run is made for.
//!
//! # Event loop
//!
//! One pass over the resolved table, one long position at most:
//!
//! - rows with an undefined close are skipped
//! - Flat: entry logic true → open at the close, nothing else on that row
//! - Open: stop-loss, then take-profit, then exit logic; the first hit closes at the close
//! - still Open after the last row → close at the last defined close

use log::debug;
use serde::{Deserialize, Serialize};

use crate::domain::error::AlgoedgeError;
use crate::domain::metrics::MetricsSnapshot;
use crate::domain::ohlcv::{PriceBar, validate_bars};
use crate::domain::portfolio::{EquityPoint, Portfolio};
use crate::domain::position::{ExitReason, OpenPosition, Position, Trade};
use crate::domain::resolver::resolve;
use crate::domain::rule_eval::evaluate;
use crate::domain::series::SeriesTable;
use crate::domain::strategy::{Condition, RiskParams, StrategyDocument, normalize};

pub const DEFAULT_INITIAL_CASH: f64 = 10_000.0;
pub const DEFAULT_PERIODS_PER_YEAR: u32 = 252;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BacktestConfig {
    pub initial_cash: f64,
    pub risk_free_rate: f64,
    pub periods_per_year: u32,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_cash: DEFAULT_INITIAL_CASH,
            risk_free_rate: 0.0,
            periods_per_year: DEFAULT_PERIODS_PER_YEAR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunParameters {
    pub symbol: String,
    pub market: String,
    pub timeframe: String,
    pub years: u32,
    pub initial_cash: f64,
}

impl Default for RunParameters {
    fn default() -> Self {
        Self {
            symbol: "BTC/USDT".to_string(),
            market: "crypto".to_string(),
            timeframe: "1h".to_string(),
            years: 2,
            initial_cash: DEFAULT_INITIAL_CASH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResult {
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub metrics: MetricsSnapshot,
}

/// Run the Flat/Open state machine over `table`.
pub fn simulate(
    table: &SeriesTable,
    entry: Option<&[Condition]>,
    exit: Option<&[Condition]>,
    risk: &RiskParams,
    initial_cash: f64,
) -> Portfolio {
    let mut portfolio = Portfolio::new(initial_cash);
    let mut position = Position::Flat;
    let mut last_defined = None;
    let closes = table.get("close").unwrap_or_default();

    for (i, &price) in closes.iter().enumerate() {
        if !price.is_finite() {
            continue;
        }
        let row = table.row(i);
        last_defined = Some((row.timestamp(), price));

        match position {
            Position::Flat => {
                if let Some(logic) = entry {
                    if evaluate(logic, &row, &row) {
                        position = Position::Open(OpenPosition {
                            entry_time: row.timestamp(),
                            entry_price: price,
                        });
                    }
                }
            }
            Position::Open(open) => {
                let reason = if open.should_stop_loss(price, risk) {
                    Some(ExitReason::StopLoss)
                } else if open.should_take_profit(price, risk) {
                    Some(ExitReason::TakeProfit)
                } else if exit.is_some_and(|logic| evaluate(logic, &row, &row)) {
                    Some(ExitReason::Signal)
                } else {
                    None
                };

                if let Some(reason) = reason {
                    let trade = open.close(row.timestamp(), price, portfolio.cash, risk, reason);
                    portfolio.record_trade(trade);
                    position = Position::Flat;
                }
            }
        }
    }

    if let (Position::Open(open), Some((timestamp, price))) = (position, last_defined) {
        let trade = open.close(timestamp, price, portfolio.cash, risk, ExitReason::EndOfData);
        portfolio.record_trade(trade);
    }

    portfolio.finish(table.timestamps().first().copied());
    portfolio
}

/// validate bars → normalize → validate → resolve → simulate → metrics.
pub fn run_backtest(
    doc: &StrategyDocument,
    bars: &[PriceBar],
    config: &BacktestConfig,
) -> Result<BacktestResult, AlgoedgeError> {
    validate_bars(bars)?;
    let doc = normalize(doc.clone());
    doc.validate()?;

    let table = resolve(&doc, bars);
    let risk = doc.risk();
    let portfolio = simulate(&table, doc.entry(), doc.exit(), &risk, config.initial_cash);
    let metrics = MetricsSnapshot::compute(&portfolio, config);

    debug!(
        "backtest '{}': {} bars, {} trades, final equity {:.2}",
        doc.name,
        bars.len(),
        portfolio.trades.len(),
        metrics.final_equity
    );

    Ok(BacktestResult {
        trades: portfolio.trades,
        equity_curve: portfolio.equity_curve,
        metrics,
    })
}
