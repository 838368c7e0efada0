//! Report output port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::AlgoedgeError;
use crate::domain::optimizer::SearchOutcome;
use crate::domain::strategy::StrategyDocument;

/// Port for writing run results. An `output_path` of `-` means standard output.
pub trait ReportPort {
    fn write_backtest(
        &self,
        result: &BacktestResult,
        strategy: &StrategyDocument,
        output_path: &str,
    ) -> Result<(), AlgoedgeError>;

    fn write_optimization(
        &self,
        outcome: &SearchOutcome,
        output_path: &str,
    ) -> Result<(), AlgoedgeError>;
}
