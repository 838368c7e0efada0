//! Performance metrics and statistics.
//!
//! All functions are total: degenerate input returns a sentinel, never an error.

use serde::{Deserialize, Serialize};

use super::backtest::BacktestConfig;
use super::portfolio::{EquityPoint, Portfolio};
use super::position::Trade;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub win_rate: f64,
    pub profit_factor: f64,
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    pub num_trades: usize,
    pub final_equity: f64,
    pub roi_pct: f64,
}

impl MetricsSnapshot {
    /// Names accepted by [`MetricsSnapshot::get`].
    pub const NAMES: [&'static str; 7] = [
        "win_rate",
        "profit_factor",
        "max_drawdown",
        "sharpe_ratio",
        "num_trades",
        "final_equity",
        "roi_pct",
    ];

    pub fn compute(portfolio: &Portfolio, config: &BacktestConfig) -> Self {
        let final_equity = portfolio.final_equity();
        MetricsSnapshot {
            win_rate: win_rate(&portfolio.trades),
            profit_factor: profit_factor(&portfolio.trades),
            max_drawdown: max_drawdown(&portfolio.equity_curve),
            sharpe_ratio: sharpe_ratio(
                &portfolio.equity_curve,
                config.risk_free_rate,
                config.periods_per_year,
            ),
            num_trades: portfolio.trades.len(),
            final_equity,
            roi_pct: roi_pct(final_equity, portfolio.initial_cash),
        }
    }

    /// Objective lookup by metric name.
    pub fn get(&self, name: &str) -> Option<f64> {
        match name {
            "win_rate" => Some(self.win_rate),
            "profit_factor" => Some(self.profit_factor),
            "max_drawdown" => Some(self.max_drawdown),
            "sharpe_ratio" => Some(self.sharpe_ratio),
            "num_trades" => Some(self.num_trades as f64),
            "final_equity" => Some(self.final_equity),
            "roi_pct" => Some(self.roi_pct),
            _ => None,
        }
    }

    pub fn is_known(name: &str) -> bool {
        Self::NAMES.contains(&name)
    }
}

pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let wins = trades.iter().filter(|t| t.pnl > 0.0).count();
    wins as f64 / trades.len() as f64
}

pub fn profit_factor(trades: &[Trade]) -> f64 {
    let gains: f64 = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).sum();
    let losses: f64 = trades.iter().filter(|t| t.pnl < 0.0).map(|t| -t.pnl).sum();

    if losses > 0.0 {
        gains / losses
    } else if gains > 0.0 {
        f64::INFINITY
    } else {
        0.0
    }
}

/// Deepest fall from a running peak, as a non-positive fraction.
pub fn max_drawdown(equity_curve: &[EquityPoint]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;

    for point in equity_curve {
        peak = peak.max(point.equity);
        if peak > 0.0 {
            let dd = (point.equity - peak) / peak;
            if dd < worst {
                worst = dd;
            }
        }
    }
    worst
}

/// Periodic returns, the first one 0.
fn periodic_returns(equity_curve: &[EquityPoint]) -> Vec<f64> {
    let mut returns = Vec::with_capacity(equity_curve.len());
    if equity_curve.is_empty() {
        return returns;
    }
    returns.push(0.0);
    for w in equity_curve.windows(2) {
        let prev = w[0].equity;
        let r = if prev != 0.0 {
            (w[1].equity - prev) / prev
        } else {
            0.0
        };
        returns.push(r);
    }
    returns
}

/// sqrt(ppy) * mean(excess) / stdev(excess), sample stdev (n-1).
pub fn sharpe_ratio(equity_curve: &[EquityPoint], risk_free_rate: f64, periods_per_year: u32) -> f64 {
    let returns = periodic_returns(equity_curve);
    if returns.len() < 2 || periods_per_year == 0 {
        return 0.0;
    }

    let ppy = periods_per_year as f64;
    let per_period_rf = risk_free_rate / ppy;
    let excess: Vec<f64> = returns.iter().map(|r| r - per_period_rf).collect();

    let n = excess.len() as f64;
    let mean = excess.iter().sum::<f64>() / n;
    let variance = excess.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let stddev = variance.sqrt();

    if stddev == 0.0 || !stddev.is_finite() {
        return 0.0;
    }
    ppy.sqrt() * mean / stddev
}

pub fn roi_pct(final_equity: f64, initial_cash: f64) -> f64 {
    if initial_cash == 0.0 {
        return 0.0;
    }
    (final_equity / initial_cash - 1.0) * 100.0
}
