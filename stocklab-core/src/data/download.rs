//! Download orchestrator — fetches many symbols on a worker pool and caches
//! each fresh series.

use super::cache::SeriesCache;
use super::provider::{DataError, DataProvider, DownloadProgress};
use crate::domain::StockSeries;
use chrono::NaiveDate;
use rayon::prelude::*;
use std::collections::HashSet;

/// Default number of download workers.
pub const DEFAULT_WORKERS: usize = 6;

/// What happened to one symbol.
#[derive(Debug)]
pub enum SymbolOutcome {
    /// Already in the cache; nothing was fetched.
    AlreadyCached,
    /// Fetched and written to the cache.
    Downloaded(StockSeries),
    Failed(DataError),
}

/// Inclusive date range to download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Download every symbol not yet cached, `workers` at a time.
///
/// Repeated symbols are fetched once. Outcomes are returned in first-seen
/// input order regardless of completion order.
pub fn download_universe(
    provider: &dyn DataProvider,
    cache: &SeriesCache,
    symbols: &[&str],
    range: DateRange,
    workers: usize,
    progress: &dyn DownloadProgress,
) -> Result<DownloadSummary, DataError> {
    let mut seen = HashSet::new();
    let symbols: Vec<&str> = symbols.iter().copied().filter(|s| seen.insert(*s)).collect();
    let total = symbols.len();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()
        .map_err(|e| DataError::WorkerPool(e.to_string()))?;

    let outcomes: Vec<(String, SymbolOutcome)> = pool.install(|| {
        symbols
            .par_iter()
            .enumerate()
            .map(|(i, symbol)| {
                progress.on_start(symbol, i, total);
                let outcome = download_single(provider, cache, symbol, range);
                let error = match &outcome {
                    SymbolOutcome::Failed(e) => Some(e),
                    _ => None,
                };
                progress.on_complete(symbol, i, total, error);
                (symbol.to_string(), outcome)
            })
            .collect()
    });

    let summary = DownloadSummary { outcomes };
    progress.on_batch_complete(
        summary.downloaded_count(),
        summary.cached_count(),
        summary.failed_count(),
        total,
    );
    Ok(summary)
}

/// Fetch → cache for a single symbol, skipping symbols already cached.
fn download_single(
    provider: &dyn DataProvider,
    cache: &SeriesCache,
    symbol: &str,
    range: DateRange,
) -> SymbolOutcome {
    if cache.contains(symbol) {
        tracing::debug!("{symbol} already cached");
        return SymbolOutcome::AlreadyCached;
    }

    let fetched = match provider.fetch(symbol, range.start, range.end) {
        Ok(fetched) => fetched,
        Err(e) => return SymbolOutcome::Failed(e),
    };
    if let Err(e) = cache.write(&fetched.series, fetched.source) {
        return SymbolOutcome::Failed(e);
    }
    SymbolOutcome::Downloaded(fetched.series)
}

/// Per-symbol outcomes of a batch download, in input order.
#[derive(Debug)]
pub struct DownloadSummary {
    pub outcomes: Vec<(String, SymbolOutcome)>,
}

impl DownloadSummary {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn downloaded_count(&self) -> usize {
        self.downloaded().count()
    }

    pub fn cached_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, SymbolOutcome::AlreadyCached))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.failures().count()
    }

    /// Freshly downloaded series.
    pub fn downloaded(&self) -> impl Iterator<Item = &StockSeries> {
        self.outcomes.iter().filter_map(|(_, o)| match o {
            SymbolOutcome::Downloaded(series) => Some(series),
            _ => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &DataError)> {
        self.outcomes.iter().filter_map(|(symbol, o)| match o {
            SymbolOutcome::Failed(e) => Some((symbol.as_str(), e)),
            _ => None,
        })
    }

    /// Split into (fresh series, failures), both in input order.
    pub fn into_parts(self) -> (Vec<StockSeries>, Vec<(String, DataError)>) {
        let mut series = Vec::new();
        let mut failed = Vec::new();
        for (symbol, outcome) in self.outcomes {
            match outcome {
                SymbolOutcome::Downloaded(s) => series.push(s),
                SymbolOutcome::Failed(e) => failed.push((symbol, e)),
                SymbolOutcome::AlreadyCached => {}
            }
        }
        (series, failed)
    }

    pub fn all_failed(&self) -> bool {
        self.total() > 0 && self.failed_count() == self.total()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::{DataSource, NoProgress};
    use crate::data::synthetic::SyntheticProvider;

    fn range() -> DateRange {
        DateRange {
            start: NaiveDate::from_ymd_opt(2018, 1, 3).unwrap(),
            end: NaiveDate::from_ymd_opt(2018, 5, 25).unwrap(),
        }
    }

    #[test]
    fn downloads_in_input_order_and_caches() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SeriesCache::new(dir.path());
        let provider = SyntheticProvider::new();
        let symbols = ["600519.SS", "000001.SZ", "601318.SS", "000858.SZ"];

        let summary =
            download_universe(&provider, &cache, &symbols, range(), 3, &NoProgress).unwrap();

        let order: Vec<&str> = summary.downloaded().map(|s| s.symbol()).collect();
        assert_eq!(order, symbols.to_vec());
        assert_eq!(cache.symbols().unwrap().len(), 4);
        assert_eq!(
            cache.get_meta("000001.SZ").unwrap().source,
            DataSource::Synthetic
        );
    }

    #[test]
    fn cached_symbols_are_not_refetched() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SeriesCache::new(dir.path());
        let provider = SyntheticProvider::new();

        download_universe(&provider, &cache, &["600000.SS"], range(), 2, &NoProgress).unwrap();
        let again = download_universe(
            &provider,
            &cache,
            &["600000.SS", "600036.SS"],
            range(),
            2,
            &NoProgress,
        )
        .unwrap();

        assert!(matches!(again.outcomes[0].1, SymbolOutcome::AlreadyCached));
        assert_eq!(again.downloaded_count(), 1);
        assert_eq!(again.cached_count(), 1);
    }

    #[test]
    fn failures_are_reported_per_symbol() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SeriesCache::new(dir.path());
        let provider = SyntheticProvider::new().with_delisted(&["600087.SS"]);

        let summary = download_universe(
            &provider,
            &cache,
            &["600087.SS", "600000.SS"],
            range(),
            2,
            &NoProgress,
        )
        .unwrap();

        assert_eq!(summary.failed_count(), 1);
        assert!(!summary.all_failed());
        let (series, failed) = summary.into_parts();
        assert_eq!(series.len(), 1);
        assert_eq!(failed[0].0, "600087.SS");
        assert!(!cache.contains("600087.SS"));
    }

    #[test]
    fn repeated_symbols_are_fetched_once() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SeriesCache::new(dir.path());
        let provider = SyntheticProvider::new();

        let summary =
            download_universe(&provider, &cache, &["600000.SS"; 4], range(), 4, &NoProgress)
                .unwrap();
        assert_eq!(summary.total(), 1);
        assert_eq!(summary.downloaded_count(), 1);
        assert_eq!(summary.failed_count(), 0);

        let mixed = ["600036.SS", "000001.SZ", "600036.SS", "000001.SZ", "601318.SS"];
        let summary = download_universe(&provider, &cache, &mixed, range(), 4, &NoProgress)
            .unwrap();
        let order: Vec<&str> = summary.outcomes.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(order, vec!["600036.SS", "000001.SZ", "601318.SS"]);
        assert_eq!(summary.failed_count(), 0);
        assert_eq!(cache.symbols().unwrap().len(), 4);
    }
}
