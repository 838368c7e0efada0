//! Seeded synthetic OHLCV data adapter.
//!
//! A Gaussian random walk around 100 with one bar per timeframe step. The same
//! seed, start and request always produce the same bars. Used for
//! `market = synthetic` and as the fallback when no CSV file exists.

use crate::domain::backtest::RunParameters;
use crate::domain::error::AlgoedgeError;
use crate::domain::ohlcv::PriceBar;
use crate::ports::data_port::DataPort;
use chrono::{DateTime, Duration, TimeZone, Utc};
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

pub const SYNTHETIC_MARKET: &str = "synthetic";
pub const DEFAULT_SYNTHETIC_SEED: u64 = 42;

const BASE_PRICE: f64 = 100.0;
const DEFAULT_MINUTES: i64 = 60;
const MINUTES_PER_YEAR: i64 = 365 * 24 * 60;

/// Bar length in minutes for a timeframe label.
pub fn timeframe_minutes(timeframe: &str) -> Option<i64> {
    match timeframe {
        "1m" => Some(1),
        "5m" => Some(5),
        "15m" => Some(15),
        "1h" => Some(60),
        "4h" => Some(240),
        "1d" => Some(1440),
        _ => None,
    }
}

pub struct SyntheticAdapter {
    seed: u64,
    start: DateTime<Utc>,
}

impl SyntheticAdapter {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            start: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).single().unwrap_or_default(),
        }
    }

    pub fn with_start(mut self, start: DateTime<Utc>) -> Self {
        self.start = start;
        self
    }
}

fn normal(mean: f64, std_dev: f64) -> Result<Normal<f64>, AlgoedgeError> {
    Normal::new(mean, std_dev).map_err(|e| AlgoedgeError::DataSource {
        reason: format!("synthetic distribution: {e}"),
    })
}

impl DataPort for SyntheticAdapter {
    fn fetch_bars(&self, params: &RunParameters) -> Result<Vec<PriceBar>, AlgoedgeError> {
        let minutes = timeframe_minutes(&params.timeframe).unwrap_or(DEFAULT_MINUTES);
        // A synthetic series has no "all available", so zero years means one.
        let years = i64::from(params.years.max(1));
        let periods = usize::try_from(years * MINUTES_PER_YEAR / minutes).unwrap_or(0);
        if periods == 0 {
            return Err(AlgoedgeError::NoData {
                symbol: params.symbol.clone(),
                timeframe: params.timeframe.clone(),
            });
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let step = normal(0.0, 0.5)?;
        let wick = normal(0.2, 0.2)?;
        let gap = normal(0.0, 0.1)?;

        let mut price = BASE_PRICE;
        let closes: Vec<f64> = (0..periods)
            .map(|_| {
                price += step.sample(&mut rng);
                price
            })
            .collect();
        let highs: Vec<f64> = closes.iter().map(|c| c + wick.sample(&mut rng)).collect();
        let lows: Vec<f64> = closes.iter().map(|c| c - wick.sample(&mut rng)).collect();
        let opens: Vec<f64> = closes.iter().map(|c| c + gap.sample(&mut rng)).collect();

        let bars: Vec<PriceBar> = (0..periods)
            .map(|i| {
                let (open, close) = (opens[i], closes[i]);
                PriceBar {
                    timestamp: self.start + Duration::minutes(minutes * i as i64),
                    open,
                    high: highs[i].max(open).max(close),
                    low: lows[i].min(open).min(close),
                    close,
                    volume: f64::from(rng.gen_range(100u32..1000)),
                }
            })
            .collect();

        debug!(
            "generated {} synthetic {} bars for {} (seed {})",
            bars.len(),
            params.timeframe,
            params.symbol,
            self.seed
        );
        Ok(bars)
    }
}
