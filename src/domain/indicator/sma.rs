//! Simple Moving Average.
//!
//! SMA[i] = mean(P[i-n+1..=i]). A window containing an undefined sample is undefined.
//! Warmup: first (n-1) bars are undefined.

pub const DEFAULT_LENGTH: usize = 20;

pub fn calculate_sma(source: &[f64], length: usize) -> Vec<f64> {
    let mut values = vec![f64::NAN; source.len()];
    if length == 0 || source.len() < length {
        return values;
    }

    for i in (length - 1)..source.len() {
        let window = &source[i + 1 - length..=i];
        values[i] = window.iter().sum::<f64>() / length as f64;
    }
    values
}
