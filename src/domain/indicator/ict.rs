//! ICT price-action detectors.
//!
//! Each detector flags a bar with `1.0` and everything else with `0.0`. A
//! comparison that touches an undefined sample or runs off either end of the
//! series is `0.0`, so the output never has undefined rows.
//!
//! - Fair value gap: the next bar's low is above the previous bar's high.
//!   This looks one bar ahead.
//! - Break of structure: the close is above the highest close of the previous
//!   `lookback` bars.
//! - Order block: an up candle straight after a down candle.

pub const DEFAULT_LOOKBACK: usize = 20;

fn flag(hit: bool) -> f64 {
    if hit { 1.0 } else { 0.0 }
}

pub fn detect_fair_value_gap(high: &[f64], low: &[f64]) -> Vec<f64> {
    let n = high.len().min(low.len());
    (0..n)
        .map(|i| flag(i > 0 && i + 1 < n && low[i + 1] > high[i - 1]))
        .collect()
}

pub fn detect_break_of_structure(close: &[f64], lookback: usize) -> Vec<f64> {
    (0..close.len())
        .map(|i| {
            if lookback == 0 || i < lookback {
                return 0.0;
            }
            let window = &close[i - lookback..i];
            if window.iter().any(|v| !v.is_finite()) {
                return 0.0;
            }
            let highest = window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            flag(close[i] > highest)
        })
        .collect()
}

pub fn detect_order_blocks(open: &[f64], close: &[f64]) -> Vec<f64> {
    let n = open.len().min(close.len());
    (0..n)
        .map(|i| flag(i > 0 && close[i] > open[i] && close[i - 1] < open[i - 1]))
        .collect()
}
