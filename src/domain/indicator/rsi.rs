//! RSI (Relative Strength Index) using Wilder's smoothing.
//!
//! - First average: simple mean of gains/losses over the first n changes
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100
//!
//! Warmup: first n bars are undefined (n price changes are needed).

pub const DEFAULT_LENGTH: usize = 14;

pub fn calculate_rsi(source: &[f64], length: usize) -> Vec<f64> {
    let mut values = vec![f64::NAN; source.len()];
    if length == 0 || source.len() <= length {
        return values;
    }

    let changes: Vec<f64> = source.windows(2).map(|w| w[1] - w[0]).collect();
    let gain = |c: f64| if c > 0.0 { c } else { 0.0 };
    let loss = |c: f64| if c < 0.0 { -c } else { 0.0 };

    let mut avg_gain = changes[..length].iter().map(|&c| gain(c)).sum::<f64>() / length as f64;
    let mut avg_loss = changes[..length].iter().map(|&c| loss(c)).sum::<f64>() / length as f64;
    values[length] = rsi_value(avg_gain, avg_loss);

    for i in (length + 1)..source.len() {
        let change = changes[i - 1];
        avg_gain = (avg_gain * (length - 1) as f64 + gain(change)) / length as f64;
        avg_loss = (avg_loss * (length - 1) as f64 + loss(change)) / length as f64;
        values[i] = rsi_value(avg_gain, avg_loss);
    }
    values
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_gain.is_nan() || avg_loss.is_nan() {
        f64::NAN
    } else if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}
