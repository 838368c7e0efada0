//! CSV file data adapter.
//!
//! One file per symbol and timeframe: `<base>/<SYMBOL>_<TIMEFRAME>.csv`, with `/`
//! in the symbol written as `-` (`BTC/USDT` at `1h` → `BTC-USDT_1h.csv`).
//! Header `timestamp,open,high,low,close,volume`.

use crate::domain::backtest::RunParameters;
use crate::domain::error::AlgoedgeError;
use crate::domain::ohlcv::PriceBar;
use crate::ports::data_port::DataPort;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use log::debug;
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str, timeframe: &str) -> PathBuf {
        self.base_path
            .join(format!("{}_{}.csv", symbol.replace('/', "-"), timeframe))
    }

    /// Whether a file exists for the requested symbol and timeframe.
    pub fn has_file(&self, params: &RunParameters) -> bool {
        self.csv_path(&params.symbol, &params.timeframe).is_file()
    }
}

fn data_error(reason: String) -> AlgoedgeError {
    AlgoedgeError::DataSource { reason }
}

/// RFC 3339, `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD`, all read as UTC.
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn parse_field(record: &csv::StringRecord, index: usize, name: &str) -> Result<f64, AlgoedgeError> {
    record
        .get(index)
        .ok_or_else(|| data_error(format!("missing {name} column")))?
        .trim()
        .parse()
        .map_err(|e| data_error(format!("invalid {name} value: {e}")))
}

impl DataPort for CsvAdapter {
    fn fetch_bars(&self, params: &RunParameters) -> Result<Vec<PriceBar>, AlgoedgeError> {
        let path = self.csv_path(&params.symbol, &params.timeframe);
        let content = fs::read_to_string(&path)
            .map_err(|e| data_error(format!("failed to read {}: {}", path.display(), e)))?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| data_error(format!("CSV parse error: {e}")))?;

            let ts_str = record
                .get(0)
                .ok_or_else(|| data_error("missing timestamp column".into()))?;
            let timestamp = parse_timestamp(ts_str)
                .ok_or_else(|| data_error(format!("invalid timestamp '{ts_str}'")))?;

            bars.push(PriceBar {
                timestamp,
                open: parse_field(&record, 1, "open")?,
                high: parse_field(&record, 2, "high")?,
                low: parse_field(&record, 3, "low")?,
                close: parse_field(&record, 4, "close")?,
                volume: parse_field(&record, 5, "volume")?,
            });
        }

        bars.sort_by_key(|b| b.timestamp);

        if params.years > 0 {
            if let Some(last) = bars.last().map(|b| b.timestamp) {
                let cutoff = last - Duration::days(365 * params.years as i64);
                bars.retain(|b| b.timestamp >= cutoff);
            }
        }

        if bars.is_empty() {
            return Err(AlgoedgeError::NoData {
                symbol: params.symbol.clone(),
                timeframe: params.timeframe.clone(),
            });
        }

        debug!("loaded {} bars from {}", bars.len(), path.display());
        Ok(bars)
    }
}
