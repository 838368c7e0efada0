//! Position state and closed trades.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::strategy::RiskParams;

/// Simulator state: at most one long position at a time.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Position {
    #[default]
    Flat,
    Open(OpenPosition),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpenPosition {
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,
}

impl OpenPosition {
    pub fn stop_loss_price(&self, risk: &RiskParams) -> f64 {
        self.entry_price * (1.0 - risk.stop_loss_pct)
    }

    pub fn take_profit_price(&self, risk: &RiskParams) -> f64 {
        self.entry_price * (1.0 + risk.take_profit_pct)
    }

    pub fn should_stop_loss(&self, price: f64, risk: &RiskParams) -> bool {
        price <= self.stop_loss_price(risk)
    }

    pub fn should_take_profit(&self, price: f64, risk: &RiskParams) -> bool {
        price >= self.take_profit_price(risk)
    }

    /// Close at `exit_price`, sizing against `cash` before the trade.
    ///
    /// quantity = cash * risk_per_trade_pct / 100 / entry_price (0 for a zero or
    /// undefined entry price).
    pub fn close(
        &self,
        exit_time: DateTime<Utc>,
        exit_price: f64,
        cash: f64,
        risk: &RiskParams,
        exit_reason: ExitReason,
    ) -> Trade {
        let priced = self.entry_price.is_finite() && self.entry_price != 0.0;
        let quantity = if priced {
            cash * risk.risk_per_trade_pct / 100.0 / self.entry_price
        } else {
            0.0
        };
        let return_pct = if priced {
            (exit_price - self.entry_price) / self.entry_price
        } else {
            0.0
        };

        Trade {
            entry_time: self.entry_time,
            entry_price: self.entry_price,
            exit_time,
            exit_price,
            quantity,
            pnl: (exit_price - self.entry_price) * quantity,
            return_pct,
            exit_reason,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    Signal,
    EndOfData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,
    pub exit_time: DateTime<Utc>,
    pub exit_price: f64,
    pub quantity: f64,
    pub pnl: f64,
    pub return_pct: f64,
    pub exit_reason: ExitReason,
}
