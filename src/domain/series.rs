//! Named, bar-aligned numeric series.
//!
//! A `SeriesTable` holds one `Vec<f64>` per column, each exactly as long as the
//! bar sequence it was built from. `NaN` marks an undefined sample (indicator
//! warm-up, missing previous value).

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::domain::ohlcv::PriceBar;

pub const PREV_SUFFIX: &str = "_prev";
pub const BASE_COLUMNS: [&str; 5] = ["open", "high", "low", "close", "volume"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesTable {
    timestamps: Vec<DateTime<Utc>>,
    names: Vec<String>,
    columns: HashMap<String, Vec<f64>>,
}

impl SeriesTable {
    pub fn new(timestamps: Vec<DateTime<Utc>>) -> Self {
        Self {
            timestamps,
            names: Vec::new(),
            columns: HashMap::new(),
        }
    }

    /// Base table with the five raw OHLCV columns.
    pub fn from_bars(bars: &[PriceBar]) -> Self {
        let mut table = Self::new(bars.iter().map(|b| b.timestamp).collect());
        table.insert("open", bars.iter().map(|b| b.open).collect());
        table.insert("high", bars.iter().map(|b| b.high).collect());
        table.insert("low", bars.iter().map(|b| b.low).collect());
        table.insert("close", bars.iter().map(|b| b.close).collect());
        table.insert("volume", bars.iter().map(|b| b.volume).collect());
        table
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    /// Insert or replace a column. Replacing keeps the original column position.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) {
        let name = name.into();
        debug_assert_eq!(values.len(), self.len(), "column {name} is misaligned");
        if !self.columns.contains_key(&name) {
            self.names.push(name.clone());
        }
        self.columns.insert(name, values);
    }

    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Column names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Price source lookup: the requested column, else `close`, else the first column.
    pub fn source(&self, requested: Option<&str>) -> Option<&[f64]> {
        requested
            .and_then(|name| self.get(name))
            .or_else(|| self.get("close"))
            .or_else(|| self.names.first().and_then(|name| self.get(name)))
    }

    /// Add a `<name>_prev` companion, shifted by one bar, for every column that lacks one.
    pub fn add_prev_companions(&mut self) {
        let names: Vec<String> = self
            .names
            .iter()
            .filter(|name| !name.ends_with(PREV_SUFFIX))
            .cloned()
            .collect();
        for name in names {
            let prev_name = format!("{name}{PREV_SUFFIX}");
            if self.contains(&prev_name) {
                continue;
            }
            let shifted = self.get(&name).map(shift_one).unwrap_or_default();
            self.insert(prev_name, shifted);
        }
    }

    pub fn row(&self, index: usize) -> TableRow<'_> {
        TableRow { table: self, index }
    }
}

/// Shift a series forward by one bar, leaving `NaN` at index 0.
pub fn shift_one(values: &[f64]) -> Vec<f64> {
    let mut shifted = Vec::with_capacity(values.len());
    if !values.is_empty() {
        shifted.push(f64::NAN);
        shifted.extend_from_slice(&values[..values.len() - 1]);
    }
    shifted
}

/// Name lookup at one point in time.
pub trait SeriesLookup {
    fn lookup(&self, name: &str) -> Option<f64>;
}

/// A view of every column at a single bar.
#[derive(Debug, Clone, Copy)]
pub struct TableRow<'a> {
    table: &'a SeriesTable,
    index: usize,
}

impl<'a> TableRow<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.table.timestamps[self.index]
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.table.get(name).and_then(|col| col.get(self.index).copied())
    }
}

impl SeriesLookup for TableRow<'_> {
    fn lookup(&self, name: &str) -> Option<f64> {
        self.get(name)
    }
}

impl SeriesLookup for HashMap<String, f64> {
    fn lookup(&self, name: &str) -> Option<f64> {
        self.get(name).copied()
    }
}
