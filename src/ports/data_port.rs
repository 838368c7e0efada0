//! Price data access port trait.

use crate::domain::backtest::RunParameters;
use crate::domain::error::AlgoedgeError;
use crate::domain::ohlcv::PriceBar;

pub trait DataPort {
    /// Bars for `params.symbol` at `params.timeframe`, oldest first, covering the last `params.years` years.
    fn fetch_bars(&self, params: &RunParameters) -> Result<Vec<PriceBar>, AlgoedgeError>;
}
