//! Cash, trade ledger and equity tracking for a single-position run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::position::Trade;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub cash: f64,
    pub initial_cash: f64,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
}

impl Portfolio {
    pub fn new(initial_cash: f64) -> Self {
        Portfolio {
            cash: initial_cash,
            initial_cash,
            trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    /// Book a closed trade: compound its pnl into cash and mark equity at the exit.
    pub fn record_trade(&mut self, trade: Trade) {
        self.cash += trade.pnl;
        self.equity_curve.push(EquityPoint {
            timestamp: trade.exit_time,
            equity: self.cash,
        });
        self.trades.push(trade);
    }

    /// Seed the curve with the starting cash at `first` when no trade was booked.
    pub fn finish(&mut self, first: Option<DateTime<Utc>>) {
        if self.equity_curve.is_empty() {
            if let Some(timestamp) = first {
                self.equity_curve.push(EquityPoint {
                    timestamp,
                    equity: self.initial_cash,
                });
            }
        }
    }

    pub fn final_equity(&self) -> f64 {
        self.equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(self.initial_cash)
    }
}
