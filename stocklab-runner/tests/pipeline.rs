//! Integration tests for the dataset pipeline: load → build → export.
//!
//! A mock provider stands in for the network so the download, fallback and
//! failure paths can be driven deterministically against a temp cache.

use chrono::NaiveDate;
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use stocklab_core::data::{
    synthetic::synthetic_bars, DataError, DataProvider, DataSource, DateRange, DownloadProgress,
    FetchResult, NoProgress, SeriesCache,
};
use stocklab_core::domain::StockSeries;
use stocklab_core::sampling::{decode_one_hot, TensorLayout};
use stocklab_runner::{
    build_rolling, build_split, load_universe, read_manifest, write_rolling, write_split,
    DatasetKind, LoadError, LoadOptions, SamplingConfig, UniverseSource,
};

// ── Fixtures ─────────────────────────────────────────────────────────

/// Serves synthetic bars, fails for listed symbols, counts requests.
struct MockProvider {
    unreachable: Vec<&'static str>,
    requests: AtomicUsize,
}

impl MockProvider {
    fn new(unreachable: &[&'static str]) -> Self {
        Self {
            unreachable: unreachable.to_vec(),
            requests: AtomicUsize::new(0),
        }
    }
}

impl DataProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.unreachable.contains(&symbol) {
            return Err(DataError::NetworkUnreachable(format!("{symbol}: timed out")));
        }
        Ok(FetchResult {
            series: StockSeries::new(symbol, synthetic_bars(symbol, start, end))?,
            source: DataSource::YahooFinance,
        })
    }
}

/// Records which callbacks fired.
#[derive(Default)]
struct RecordingProgress {
    started: AtomicUsize,
    failed: Mutex<Vec<String>>,
    batch: Mutex<Option<(usize, usize, usize, usize)>>,
}

impl DownloadProgress for RecordingProgress {
    fn on_start(&self, _symbol: &str, _index: usize, _total: usize) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    fn on_complete(&self, symbol: &str, _index: usize, _total: usize, error: Option<&DataError>) {
        if error.is_some() {
            self.failed.lock().unwrap().push(symbol.to_string());
        }
    }

    fn on_batch_complete(&self, downloaded: usize, cached: usize, failed: usize, total: usize) {
        *self.batch.lock().unwrap() = Some((downloaded, cached, failed, total));
    }
}

/// 2018-01-03 ..= 2018-05-14 is exactly 94 weekdays.
fn full_period() -> DateRange {
    DateRange {
        start: NaiveDate::from_ymd_opt(2018, 1, 3).unwrap(),
        end: NaiveDate::from_ymd_opt(2018, 5, 14).unwrap(),
    }
}

// ── Loading ──────────────────────────────────────────────────────────

#[test]
fn partial_failure_returns_fresh_series_and_reports_failures() {
    let dir = tempfile::tempdir().unwrap();
    let cache = SeriesCache::new(dir.path());
    let provider = MockProvider::new(&["000002.SZ"]);
    let progress = RecordingProgress::default();
    let symbols = ["600000.SS", "000002.SZ", "601318.SS"];

    let loaded = load_universe(
        &provider,
        &cache,
        &symbols,
        &LoadOptions::new(full_period()).with_workers(3),
        &progress,
    )
    .unwrap();

    assert_eq!(loaded.source, UniverseSource::Fresh);
    let got: Vec<&str> = loaded.series.iter().map(|s| s.symbol()).collect();
    assert_eq!(got, vec!["600000.SS", "601318.SS"]);
    assert_eq!(loaded.failed.len(), 1);
    assert_eq!(loaded.failed[0].0, "000002.SZ");
    assert!(matches!(loaded.failed[0].1, DataError::NetworkUnreachable(_)));

    assert_eq!(progress.started.load(Ordering::SeqCst), 3);
    assert_eq!(*progress.failed.lock().unwrap(), vec!["000002.SZ".to_string()]);
    assert_eq!(*progress.batch.lock().unwrap(), Some((2, 0, 1, 3)));
}

#[test]
fn total_outage_falls_back_to_previous_cache() {
    let dir = tempfile::tempdir().unwrap();
    let cache = SeriesCache::new(dir.path());

    // First run populates the cache.
    let healthy = MockProvider::new(&[]);
    let first = load_universe(
        &healthy,
        &cache,
        &["600000.SS", "600036.SS"],
        &LoadOptions::new(full_period()),
        &NoProgress,
    )
    .unwrap();

    // Second run asks for new symbols while the network is down.
    let down = MockProvider::new(&["600519.SS", "601988.SS"]);
    let second = load_universe(
        &down,
        &cache,
        &["600519.SS", "601988.SS"],
        &LoadOptions::new(full_period()),
        &NoProgress,
    )
    .unwrap();

    assert_eq!(second.source, UniverseSource::Cache);
    assert_eq!(second.failed.len(), 2);
    let cached: Vec<&str> = second.series.iter().map(|s| s.symbol()).collect();
    assert_eq!(cached, vec!["600000.SS", "600036.SS"]);
    assert_eq!(second.dataset_hash, first.dataset_hash);
}

#[test]
fn cached_symbols_are_not_requested_again() {
    let dir = tempfile::tempdir().unwrap();
    let cache = SeriesCache::new(dir.path());
    let provider = MockProvider::new(&[]);
    let opts = LoadOptions::new(full_period());

    load_universe(&provider, &cache, &["600000.SS"], &opts, &NoProgress).unwrap();
    let again = load_universe(&provider, &cache, &["600000.SS"], &opts, &NoProgress).unwrap();

    assert_eq!(provider.requests.load(Ordering::SeqCst), 1);
    assert_eq!(again.source, UniverseSource::Cache);
}

#[test]
fn outage_with_empty_cache_is_nothing_available() {
    let dir = tempfile::tempdir().unwrap();
    let cache = SeriesCache::new(dir.path());
    let provider = MockProvider::new(&["600000.SS"]);

    let err = load_universe(
        &provider,
        &cache,
        &["600000.SS"],
        &LoadOptions::new(full_period()),
        &NoProgress,
    )
    .unwrap_err();
    assert!(matches!(err, LoadError::NothingAvailable { .. }));
}

// ── End to end ───────────────────────────────────────────────────────

#[test]
fn full_period_universe_to_rolling_export() {
    let dir = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let cache = SeriesCache::new(dir.path());
    let provider = MockProvider::new(&[]);

    let loaded = load_universe(
        &provider,
        &cache,
        &["600000.SS", "000001.SZ"],
        &LoadOptions::new(full_period()),
        &NoProgress,
    )
    .unwrap();
    assert!(loaded.series.iter().all(|s| s.len() == 94));

    let dataset = build_rolling(&loaded.series, &SamplingConfig::default()).unwrap();
    assert_eq!(dataset.len(), 2 * (94 - 10 - 1));
    assert_eq!(dataset.features.dim(), (166, 10, 5));

    // Each label is the close right after its window.
    let first = &loaded.series[0];
    assert_eq!(dataset.labels[0], first.bars()[10].close);
    assert_eq!(dataset.features[[0, 9, 1]], first.bars()[9].close);

    let manifest = write_rolling(&dataset, &loaded.dataset_hash, out.path()).unwrap();
    assert_eq!(manifest.kind, DatasetKind::Rolling);
    assert_eq!(manifest.feature_shape, [166, 10, 5]);
    assert_eq!(read_manifest(out.path()).unwrap().dataset_hash, loaded.dataset_hash);
}

#[test]
fn universe_to_time_major_split_export() {
    let dir = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let cache = SeriesCache::new(dir.path());
    let provider = MockProvider::new(&[]);
    let symbols = ["600000.SS", "600016.SS", "600028.SS", "600030.SS"];

    let loaded = load_universe(
        &provider,
        &cache,
        &symbols,
        &LoadOptions::new(full_period()),
        &NoProgress,
    )
    .unwrap();
    let dataset = build_split(&loaded.series, TensorLayout::TimeMajor).unwrap();

    assert_eq!(dataset.features.dim(), (10, 4, 5));
    assert_eq!(dataset.labels.dim(), (4, 2));

    let mean = dataset.raw_labels.iter().sum::<f64>() / 4.0;
    let expected: Vec<usize> = dataset
        .raw_labels
        .iter()
        .map(|&v| usize::from(v > mean))
        .collect();
    assert_eq!(decode_one_hot(&dataset.labels), expected);

    let manifest = write_split(&dataset, &loaded.dataset_hash, out.path()).unwrap();
    assert_eq!(manifest.layout, TensorLayout::TimeMajor);
    assert_eq!(manifest.symbols.len(), 4);
    assert!(out.path().join("features.csv").exists());
    assert!(out.path().join("labels.csv").exists());
}

// ── Properties ───────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn rolling_count_matches_full_period_series(
        lengths in prop::collection::vec(15usize..40, 0..6),
        window in 1usize..12,
        expected in 15usize..40,
    ) {
        let start = NaiveDate::from_ymd_opt(2018, 1, 3).unwrap();
        let universe: Vec<StockSeries> = lengths
            .iter()
            .enumerate()
            .map(|(i, &n)| {
                let symbol = format!("S{i}");
                let mut bars = synthetic_bars(&symbol, start, start + chrono::Duration::days(90));
                bars.truncate(n);
                StockSeries::new(symbol, bars).unwrap()
            })
            .collect();

        let cfg = SamplingConfig { window_length: window, expected_series_len: expected };
        let dataset = build_rolling(&universe, &cfg).unwrap();

        let full = lengths.iter().filter(|&&n| n == expected).count();
        prop_assert_eq!(dataset.len(), full * expected.saturating_sub(window + 1));
        prop_assert_eq!(dataset.labels.len(), dataset.len());
    }
}
