//! Synthetic data provider for offline runs and tests.
//!
//! Produces a deterministic random walk from a starting price of 10.0,
//! weekdays only, seeded from the symbol name. Series built here are tagged
//! [`DataSource::Synthetic`].

use super::provider::{DataError, DataProvider, DataSource, FetchResult};
use crate::domain::{Bar, StockSeries};
use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone, Default)]
pub struct SyntheticProvider {
    /// Symbols that behave as delisted (no data in any range).
    delisted: Vec<String>,
}

impl SyntheticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat these symbols as having no trading data.
    pub fn with_delisted(mut self, symbols: &[&str]) -> Self {
        self.delisted = symbols.iter().map(|s| s.to_string()).collect();
        self
    }
}

/// Generate weekday bars for `symbol` between `start` and `end` inclusive.
pub fn synthetic_bars(symbol: &str, start: NaiveDate, end: NaiveDate) -> Vec<Bar> {
    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut bars = Vec::new();
    let mut price = 10.0_f64;
    let mut current = start;

    while current <= end {
        if matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            current += chrono::Duration::days(1);
            continue;
        }

        let daily_return: f64 = rng.gen_range(-0.03..0.03);
        let open = price;
        let close = price * (1.0 + daily_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(50_000.0..2_000_000.0_f64).round();

        bars.push(Bar {
            date: current,
            open,
            close,
            high,
            low,
            volume,
        });

        price = close;
        current += chrono::Duration::days(1);
    }

    bars
}

impl DataProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        let bars = if self.delisted.iter().any(|s| s == symbol) {
            Vec::new()
        } else {
            synthetic_bars(symbol, start, end)
        };
        if bars.is_empty() {
            return Err(DataError::NoDataInRange {
                symbol: symbol.to_string(),
                start,
                end,
            });
        }
        Ok(FetchResult {
            series: StockSeries::new(symbol, bars)?,
            source: DataSource::Synthetic,
        })
    }
}
