//! Exponential Moving Average.
//!
//! k = 2/(n+1), seed with the SMA of the first n defined samples, then
//! EMA[i] = P[i]*k + EMA[i-1]*(1-k).
//! Undefined samples are skipped: their row is undefined and the average is
//! carried to the next defined sample.
//! Warmup: first (n-1) defined samples are undefined.

pub const DEFAULT_LENGTH: usize = 20;

pub fn calculate_ema(source: &[f64], length: usize) -> Vec<f64> {
    let mut values = vec![f64::NAN; source.len()];
    if length == 0 {
        return values;
    }

    let k = 2.0 / (length as f64 + 1.0);
    let mut seed_sum = 0.0;
    let mut seeded = 0usize;
    let mut ema = f64::NAN;

    for (i, &price) in source.iter().enumerate() {
        if !price.is_finite() {
            continue;
        }
        if seeded < length {
            seed_sum += price;
            seeded += 1;
            if seeded < length {
                continue;
            }
            ema = seed_sum / length as f64;
        } else {
            ema = price * k + ema * (1.0 - k);
        }
        values[i] = ema;
    }
    values
}
