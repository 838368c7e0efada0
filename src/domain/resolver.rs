//! Indicator resolution: strategy document + bars → aligned `SeriesTable`.

use log::debug;

use crate::domain::indicator::compute;
use crate::domain::ohlcv::PriceBar;
use crate::domain::series::SeriesTable;
use crate::domain::strategy::StrategyDocument;

/// Build the evaluation table for `doc` over `bars`.
///
/// Indicators are computed in declaration order against the raw OHLCV columns
/// only. A single output is stored under the block id, multi outputs under
/// `<id>_<output>`. Every column then gets a `<name>_prev` companion.
pub fn resolve(doc: &StrategyDocument, bars: &[PriceBar]) -> SeriesTable {
    let base = SeriesTable::from_bars(bars);
    let mut table = base.clone();

    for block in doc.indicators() {
        let outputs = compute(block.indicator, block.params, &base);
        for output in outputs {
            let name = match output.suffix {
                Some(suffix) => format!("{}_{suffix}", block.id),
                None => block.id.to_string(),
            };
            debug!(
                "resolved {name} ({}) with {} defined samples",
                block.indicator,
                output.values.iter().filter(|v| v.is_finite()).count()
            );
            table.insert(name, output.values);
        }
    }

    table.add_prev_companions();
    table
}
