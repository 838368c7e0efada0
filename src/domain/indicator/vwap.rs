//! Volume-Weighted Average Price, anchored to the UTC calendar day.
//!
//! VWAP[i] = Σ(typical × volume) / Σ(volume) over the bars of i's day up to i,
//! with typical = (high + low + close) / 3.
//! Undefined while the day's cumulative volume is zero. No warmup.

use chrono::{DateTime, Utc};

use crate::domain::ohlcv::typical_price;

pub fn calculate_vwap(
    timestamps: &[DateTime<Utc>],
    high: &[f64],
    low: &[f64],
    close: &[f64],
    volume: &[f64],
) -> Vec<f64> {
    let mut values = Vec::with_capacity(timestamps.len());
    let mut day = None;
    let mut cum_pv = 0.0;
    let mut cum_vol = 0.0;

    for (i, ts) in timestamps.iter().enumerate() {
        let today = ts.date_naive();
        if day != Some(today) {
            day = Some(today);
            cum_pv = 0.0;
            cum_vol = 0.0;
        }
        let typical = typical_price(high[i], low[i], close[i]);
        cum_pv += typical * volume[i];
        cum_vol += volume[i];
        values.push(if cum_vol == 0.0 {
            f64::NAN
        } else {
            cum_pv / cum_vol
        });
    }
    values
}
