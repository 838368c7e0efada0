//! JSON report adapter.
//!
//! Pretty-printed JSON to a file, or to standard output when the path is `-`.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::AlgoedgeError;
use crate::domain::optimizer::SearchOutcome;
use crate::domain::strategy::StrategyDocument;
use crate::ports::report_port::ReportPort;
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

pub const STDOUT_PATH: &str = "-";

#[derive(Serialize)]
struct BacktestReport<'a> {
    strategy: &'a str,
    version: &'a str,
    #[serde(flatten)]
    result: &'a BacktestResult,
}

pub struct JsonReportAdapter;

impl JsonReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JsonReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn emit<T: Serialize>(value: &T, output_path: &str) -> Result<(), AlgoedgeError> {
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');

    if output_path == STDOUT_PATH {
        let mut stdout = io::stdout().lock();
        stdout.write_all(json.as_bytes())?;
        stdout.flush()?;
        return Ok(());
    }

    if let Some(parent) = Path::new(output_path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(output_path, json)?;
    Ok(())
}

impl ReportPort for JsonReportAdapter {
    fn write_backtest(
        &self,
        result: &BacktestResult,
        strategy: &StrategyDocument,
        output_path: &str,
    ) -> Result<(), AlgoedgeError> {
        let report = BacktestReport {
            strategy: &strategy.name,
            version: &strategy.version,
            result,
        };
        emit(&report, output_path)
    }

    fn write_optimization(
        &self,
        outcome: &SearchOutcome,
        output_path: &str,
    ) -> Result<(), AlgoedgeError> {
        emit(outcome, output_path)
    }
}
