//! OHLCV price bar representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::error::AlgoedgeError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// (high + low + close) / 3
pub fn typical_price(high: f64, low: f64, close: f64) -> f64 {
    (high + low + close) / 3.0
}

/// Reject empty series and series whose timestamps are not strictly increasing.
pub fn validate_bars(bars: &[PriceBar]) -> Result<(), AlgoedgeError> {
    if bars.is_empty() {
        return Err(AlgoedgeError::EmptySeries);
    }
    for (i, pair) in bars.windows(2).enumerate() {
        if pair[1].timestamp <= pair[0].timestamp {
            return Err(AlgoedgeError::NonMonotonic { index: i + 1 });
        }
    }
    Ok(())
}
