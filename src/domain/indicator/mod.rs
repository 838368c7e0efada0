//! Technical indicator implementations.
//!
//! Every indicator is a pure function over bar-aligned `f64` columns. Undefined
//! samples (warm-up, zero volume) are `NaN`.
//!
//! - `IndicatorKind`: the supported indicator families
//! - `IndicatorOutput`: one named output series of a computation
//! - `compute`: dispatch from a block's kind name and params to the library

pub mod bollinger;
pub mod ema;
pub mod ict;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod vwap;

use log::warn;
use std::fmt;

use crate::domain::series::SeriesTable;
use crate::domain::strategy::IndicatorParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorKind {
    Sma,
    Ema,
    Rsi,
    Macd,
    Bollinger,
    Vwap,
    FairValueGap,
    BreakOfStructure,
    OrderBlock,
}

const MACD_OUTPUTS: [&str; 3] = ["macd", "signal", "histogram"];
const BOLLINGER_OUTPUTS: [&str; 3] = ["upper", "middle", "lower"];

impl IndicatorKind {
    /// Case-insensitive lookup. `None` for an unknown kind.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "SMA" => Some(IndicatorKind::Sma),
            "EMA" => Some(IndicatorKind::Ema),
            "RSI" => Some(IndicatorKind::Rsi),
            "MACD" => Some(IndicatorKind::Macd),
            "BBANDS" | "BOLLINGER" | "BOLLINGER BANDS" => Some(IndicatorKind::Bollinger),
            "VWAP" => Some(IndicatorKind::Vwap),
            "FVG" | "FAIR_VALUE_GAP" => Some(IndicatorKind::FairValueGap),
            "BOS" | "BREAK_OF_STRUCTURE" => Some(IndicatorKind::BreakOfStructure),
            "OB" | "ORDER_BLOCK" | "ORDER_BLOCKS" => Some(IndicatorKind::OrderBlock),
            _ => None,
        }
    }

    /// Output suffixes of a multi-output kind, empty for a single output.
    pub fn output_suffixes(self) -> &'static [&'static str] {
        match self {
            IndicatorKind::Macd => &MACD_OUTPUTS,
            IndicatorKind::Bollinger => &BOLLINGER_OUTPUTS,
            _ => &[],
        }
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorKind::Sma => write!(f, "SMA"),
            IndicatorKind::Ema => write!(f, "EMA"),
            IndicatorKind::Rsi => write!(f, "RSI"),
            IndicatorKind::Macd => write!(f, "MACD"),
            IndicatorKind::Bollinger => write!(f, "BBANDS"),
            IndicatorKind::Vwap => write!(f, "VWAP"),
            IndicatorKind::FairValueGap => write!(f, "FVG"),
            IndicatorKind::BreakOfStructure => write!(f, "BOS"),
            IndicatorKind::OrderBlock => write!(f, "ORDER_BLOCK"),
        }
    }
}

/// One output series. `suffix` is `None` for single-output indicators.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorOutput {
    pub suffix: Option<&'static str>,
    pub values: Vec<f64>,
}

impl IndicatorOutput {
    fn single(values: Vec<f64>) -> Self {
        Self {
            suffix: None,
            values,
        }
    }

    fn named(suffix: &'static str, values: Vec<f64>) -> Self {
        Self {
            suffix: Some(suffix),
            values,
        }
    }
}

/// Compute the indicator named `kind` over `table`.
///
/// Never fails: an unknown kind yields a single all-undefined output.
pub fn compute(kind: &str, params: &IndicatorParams, table: &SeriesTable) -> Vec<IndicatorOutput> {
    let Some(parsed) = IndicatorKind::parse(kind) else {
        warn!("unknown indicator kind '{kind}', series will be undefined");
        return vec![IndicatorOutput::single(vec![f64::NAN; table.len()])];
    };

    let empty: &[f64] = &[];
    let source = table.source(params.get_str("source")).unwrap_or(empty);

    match parsed {
        IndicatorKind::Sma => {
            let length = params.get_usize("length", sma::DEFAULT_LENGTH);
            vec![IndicatorOutput::single(sma::calculate_sma(source, length))]
        }
        IndicatorKind::Ema => {
            let length = params.get_usize("length", ema::DEFAULT_LENGTH);
            vec![IndicatorOutput::single(ema::calculate_ema(source, length))]
        }
        IndicatorKind::Rsi => {
            let length = params.get_usize("length", rsi::DEFAULT_LENGTH);
            vec![IndicatorOutput::single(rsi::calculate_rsi(source, length))]
        }
        IndicatorKind::Macd => {
            let series = macd::calculate_macd(
                source,
                params.get_usize("fast", macd::DEFAULT_FAST),
                params.get_usize("slow", macd::DEFAULT_SLOW),
                params.get_usize("signal", macd::DEFAULT_SIGNAL),
            );
            let [line, signal, histogram] = MACD_OUTPUTS;
            vec![
                IndicatorOutput::named(line, series.line),
                IndicatorOutput::named(signal, series.signal),
                IndicatorOutput::named(histogram, series.histogram),
            ]
        }
        IndicatorKind::Bollinger => {
            let bands = bollinger::calculate_bollinger(
                source,
                params.get_usize("length", bollinger::DEFAULT_LENGTH),
                params.get_f64("std", bollinger::DEFAULT_STD),
            );
            let [upper, middle, lower] = BOLLINGER_OUTPUTS;
            vec![
                IndicatorOutput::named(upper, bands.upper),
                IndicatorOutput::named(middle, bands.middle),
                IndicatorOutput::named(lower, bands.lower),
            ]
        }
        IndicatorKind::Vwap => {
            let column = |name: &str| table.get(name).unwrap_or(source);
            vec![IndicatorOutput::single(vwap::calculate_vwap(
                table.timestamps(),
                column("high"),
                column("low"),
                column("close"),
                column("volume"),
            ))]
        }
        IndicatorKind::FairValueGap => {
            let column = |name: &str| table.get(name).unwrap_or(empty);
            vec![IndicatorOutput::single(ict::detect_fair_value_gap(
                column("high"),
                column("low"),
            ))]
        }
        IndicatorKind::BreakOfStructure => {
            let lookback = params.get_usize("lookback", ict::DEFAULT_LOOKBACK);
            vec![IndicatorOutput::single(ict::detect_break_of_structure(
                source, lookback,
            ))]
        }
        IndicatorKind::OrderBlock => {
            let column = |name: &str| table.get(name).unwrap_or(empty);
            vec![IndicatorOutput::single(ict::detect_order_blocks(
                column("open"),
                column("close"),
            ))]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::PriceBar;
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;

    fn make_table(closes: &[f64]) -> SeriesTable {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let bars: Vec<PriceBar> = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar {
                timestamp: start + Duration::hours(i as i64),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 100.0,
            })
            .collect();
        SeriesTable::from_bars(&bars)
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(IndicatorKind::parse("ema"), Some(IndicatorKind::Ema));
        assert_eq!(IndicatorKind::parse(" Rsi "), Some(IndicatorKind::Rsi));
        assert_eq!(IndicatorKind::parse("bbands"), Some(IndicatorKind::Bollinger));
        assert_eq!(
            IndicatorKind::parse("Bollinger Bands"),
            Some(IndicatorKind::Bollinger)
        );
        assert_eq!(IndicatorKind::parse("ichimoku"), None);
    }

    #[test]
    fn display_round_trips_through_parse() {
        for kind in [
            IndicatorKind::Sma,
            IndicatorKind::Ema,
            IndicatorKind::Rsi,
            IndicatorKind::Macd,
            IndicatorKind::Bollinger,
            IndicatorKind::Vwap,
            IndicatorKind::FairValueGap,
            IndicatorKind::BreakOfStructure,
            IndicatorKind::OrderBlock,
        ] {
            assert_eq!(IndicatorKind::parse(&kind.to_string()), Some(kind));
        }
    }

    #[test]
    fn unknown_kind_is_all_undefined() {
        let table = make_table(&[1.0, 2.0, 3.0]);
        let outputs = compute("EMAA", &IndicatorParams::default(), &table);
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].suffix, None);
        assert_eq!(outputs[0].values.len(), 3);
        assert!(outputs[0].values.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn sma_uses_length_param() {
        let table = make_table(&[1.0, 2.0, 3.0, 4.0]);
        let params = IndicatorParams::from([("length", json!(2))]);
        let outputs = compute("SMA", &params, &table);
        assert!(outputs[0].values[0].is_nan());
        assert!((outputs[0].values[3] - 3.5).abs() < 1e-9);
    }

    #[test]
    fn source_param_selects_column() {
        let table = make_table(&[1.0, 2.0, 3.0]);
        let params = IndicatorParams::from([("length", json!(1)), ("source", json!("high"))]);
        let outputs = compute("SMA", &params, &table);
        assert_eq!(outputs[0].values, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn missing_source_falls_back_to_close() {
        let table = make_table(&[1.0, 2.0, 3.0]);
        let params = IndicatorParams::from([("length", json!(1)), ("source", json!("hlc3"))]);
        let outputs = compute("EMA", &params, &table);
        assert_eq!(outputs[0].values, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn macd_has_three_named_outputs() {
        let closes: Vec<f64> = (0..50).map(|i| 100.0 + i as f64).collect();
        let outputs = compute("MACD", &IndicatorParams::default(), &make_table(&closes));
        let suffixes: Vec<_> = outputs.iter().map(|o| o.suffix).collect();
        assert_eq!(
            suffixes,
            vec![Some("macd"), Some("signal"), Some("histogram")]
        );
        assert!(outputs.iter().all(|o| o.values.len() == 50));
    }

    #[test]
    fn bollinger_has_three_named_outputs() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + (i % 5) as f64).collect();
        let params = IndicatorParams::from([("length", json!(5)), ("std", json!(1.0))]);
        let outputs = compute("Bollinger", &params, &make_table(&closes));
        let suffixes: Vec<_> = outputs.iter().map(|o| o.suffix).collect();
        assert_eq!(suffixes, vec![Some("upper"), Some("middle"), Some("lower")]);
        assert!(outputs[0].values[4] >= outputs[1].values[4]);
        assert!(outputs[2].values[4] <= outputs[1].values[4]);
    }

    #[test]
    fn vwap_reads_ohlcv_columns() {
        let table = make_table(&[10.0, 20.0]);
        let outputs = compute("vwap", &IndicatorParams::default(), &table);
        assert!((outputs[0].values[0] - 10.0).abs() < 1e-9);
        assert!((outputs[0].values[1] - 15.0).abs() < 1e-9);
    }

    #[test]
    fn empty_table_yields_empty_outputs() {
        let table = SeriesTable::default();
        for kind in ["SMA", "EMA", "RSI", "MACD", "BBANDS", "VWAP", "FVG", "BOS", "OB", "nope"] {
            let outputs = compute(kind, &IndicatorParams::default(), &table);
            assert!(outputs.iter().all(|o| o.values.is_empty()), "{kind}");
        }
    }

    #[test]
    fn compute_suffixes_match_output_suffixes() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + (i % 7) as f64).collect();
        let table = make_table(&closes);
        for kind in ["SMA", "MACD", "BBANDS", "VWAP", "FVG"] {
            let outputs = compute(kind, &IndicatorParams::default(), &table);
            let expected = IndicatorKind::parse(kind).unwrap().output_suffixes();
            let suffixes: Vec<&str> = outputs.iter().filter_map(|o| o.suffix).collect();
            assert_eq!(suffixes.as_slice(), expected, "{kind}");
        }
    }

    #[test]
    fn ict_kinds_are_zero_one_series() {
        let closes = [10.0, 9.0, 10.5, 12.0, 11.0, 13.0, 12.5, 14.0];
        let table = make_table(&closes);
        let params = IndicatorParams::from([("lookback", json!(2))]);
        for kind in ["fvg", "BOS", "order_block"] {
            let outputs = compute(kind, &params, &table);
            assert_eq!(outputs.len(), 1);
            assert_eq!(outputs[0].suffix, None);
            assert_eq!(outputs[0].values.len(), closes.len());
            assert!(
                outputs[0].values.iter().all(|v| *v == 0.0 || *v == 1.0),
                "{kind}"
            );
        }
        let bos = compute("BOS", &params, &table);
        assert_eq!(bos[0].values[3], 1.0);
        assert_eq!(bos[0].values[4], 0.0);
    }
}
