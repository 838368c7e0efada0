//! Bollinger Bands.
//!
//! - Middle: SMA over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! StdDev is the population standard deviation (divides by N, not N-1).
//!
//! Default parameters: length=20, std=2.0
//! Warmup: first (length-1) bars are undefined.

use crate::domain::indicator::sma::calculate_sma;

pub const DEFAULT_LENGTH: usize = 20;
pub const DEFAULT_STD: f64 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerSeries {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

pub fn calculate_bollinger(source: &[f64], length: usize, mult: f64) -> BollingerSeries {
    let middle = calculate_sma(source, length);
    let mut upper = vec![f64::NAN; source.len()];
    let mut lower = vec![f64::NAN; source.len()];

    for (i, &mid) in middle.iter().enumerate() {
        if mid.is_nan() {
            continue;
        }
        let window = &source[i + 1 - length..=i];
        let variance = window
            .iter()
            .map(|p| {
                let diff = p - mid;
                diff * diff
            })
            .sum::<f64>()
            / length as f64;
        let stddev = variance.sqrt();
        upper[i] = mid + mult * stddev;
        lower[i] = mid - mult * stddev;
    }

    BollingerSeries {
        upper,
        middle,
        lower,
    }
}
