//! StockSeries — the date-ordered bars of one stock.

use super::bar::{Bar, FIELD_COUNT};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SeriesError {
    #[error("series for '{symbol}' has non-increasing dates at row {index}: {previous} then {current}")]
    UnorderedDates {
        symbol: String,
        index: usize,
        previous: NaiveDate,
        current: NaiveDate,
    },

    #[error("series symbol must not be empty")]
    EmptySymbol,
}

/// Daily bars for one stock, dates strictly increasing.
///
/// The invariant is checked once at construction; the bars are not mutable
/// afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSeries")]
pub struct StockSeries {
    symbol: String,
    bars: Vec<Bar>,
}

#[derive(Deserialize)]
struct RawSeries {
    symbol: String,
    bars: Vec<Bar>,
}

impl TryFrom<RawSeries> for StockSeries {
    type Error = SeriesError;

    fn try_from(raw: RawSeries) -> Result<Self, Self::Error> {
        StockSeries::new(raw.symbol, raw.bars)
    }
}

impl StockSeries {
    pub fn new(symbol: impl Into<String>, bars: Vec<Bar>) -> Result<Self, SeriesError> {
        let symbol = symbol.into();
        if symbol.is_empty() {
            return Err(SeriesError::EmptySymbol);
        }
        if let Some(index) = bars.windows(2).position(|w| w[1].date <= w[0].date) {
            return Err(SeriesError::UnorderedDates {
                symbol,
                index: index + 1,
                previous: bars[index].date,
                current: bars[index + 1].date,
            });
        }
        Ok(Self { symbol, bars })
    }

    /// Build a series from bars in arbitrary order: sorts by date and keeps the
    /// first bar for any duplicated date.
    pub fn from_unsorted(
        symbol: impl Into<String>,
        mut bars: Vec<Bar>,
    ) -> Result<Self, SeriesError> {
        bars.sort_by_key(|b| b.date);
        bars.dedup_by_key(|b| b.date);
        Self::new(symbol, bars)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    /// Number of rows (trading days).
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Numeric fields of row `index`.
    pub fn row(&self, index: usize) -> Option<[f64; FIELD_COUNT]> {
        self.bars.get(index).map(Bar::row)
    }

    /// Closing price of row `index`.
    pub fn close(&self, index: usize) -> Option<f64> {
        self.bars.get(index).map(|b| b.close)
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }
}
