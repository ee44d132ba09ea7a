//! Universe loading with cache fallback.
//!
//! Two stages, run in order:
//! 1. Download every symbol not yet cached, in parallel, caching each one.
//! 2. If stage 1 produced no fresh series (everything was already cached,
//!    every request failed, or `offline` is set) → load the whole cache.
//!
//! Stage 2 failing to find anything is the only hard error.

use serde::{Deserialize, Serialize};
use stocklab_core::data::{
    download_universe, DataError, DataProvider, DateRange, DownloadProgress, SeriesCache,
    DEFAULT_WORKERS,
};
use stocklab_core::domain::StockSeries;
use thiserror::Error;

/// Errors from the universe loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no fresh downloads and the cache at {cache_dir} is empty")]
    NothingAvailable { cache_dir: String },

    #[error("data error: {0}")]
    Data(#[from] DataError),
}

/// Options controlling how the universe is loaded.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub range: DateRange,
    /// Concurrent download workers.
    pub workers: usize,
    /// If true, never make network requests: go straight to the cache.
    pub offline: bool,
}

impl LoadOptions {
    pub fn new(range: DateRange) -> Self {
        Self {
            range,
            workers: DEFAULT_WORKERS,
            offline: false,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }
}

/// Which stage produced the series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UniverseSource {
    /// Downloaded during this call.
    Fresh,
    /// Read back from the local cache.
    Cache,
}

impl UniverseSource {
    pub fn as_str(self) -> &'static str {
        match self {
            UniverseSource::Fresh => "fresh",
            UniverseSource::Cache => "cache",
        }
    }
}

/// A loaded universe and its provenance.
#[derive(Debug)]
pub struct LoadedUniverse {
    pub series: Vec<StockSeries>,
    pub source: UniverseSource,
    /// Symbols whose download failed in stage 1, in input order.
    pub failed: Vec<(String, DataError)>,
    /// BLAKE3 over every symbol, date and field, in series order.
    pub dataset_hash: String,
}

/// Load the universe for `symbols`, falling back to the cache.
///
/// This is the primary entry point for building datasets.
pub fn load_universe(
    provider: &dyn DataProvider,
    cache: &SeriesCache,
    symbols: &[&str],
    opts: &LoadOptions,
    progress: &dyn DownloadProgress,
) -> Result<LoadedUniverse, LoadError> {
    let mut failed = Vec::new();

    // Stage 1: parallel download
    if !opts.offline {
        tracing::info!(
            provider = provider.name(),
            symbols = symbols.len(),
            workers = opts.workers,
            "downloading universe"
        );
        let summary =
            download_universe(provider, cache, symbols, opts.range, opts.workers, progress)?;
        let (fresh, failures) = summary.into_parts();
        failed = failures;

        if !fresh.is_empty() {
            return Ok(finish(fresh, UniverseSource::Fresh, failed));
        }
        tracing::warn!(
            failed = failed.len(),
            "no fresh series downloaded, falling back to cache"
        );
    }

    // Stage 2: whole cache
    let cached = cache.load_all()?;
    if cached.is_empty() {
        return Err(LoadError::NothingAvailable {
            cache_dir: cache.cache_dir().display().to_string(),
        });
    }
    tracing::info!(series = cached.len(), "loaded universe from cache");
    Ok(finish(cached, UniverseSource::Cache, failed))
}

fn finish(
    series: Vec<StockSeries>,
    source: UniverseSource,
    failed: Vec<(String, DataError)>,
) -> LoadedUniverse {
    let dataset_hash = compute_dataset_hash(&series);
    LoadedUniverse {
        series,
        source,
        failed,
        dataset_hash,
    }
}

/// Compute a deterministic BLAKE3 hash over all series.
///
/// Series order matters: the same bars in a different order hash differently,
/// matching the sample order of the tensors built from them.
pub fn compute_dataset_hash(series: &[StockSeries]) -> String {
    let mut hasher = blake3::Hasher::new();

    for s in series {
        hasher.update(s.symbol().as_bytes());
        for bar in s.bars() {
            hasher.update(bar.date.to_string().as_bytes());
            for value in bar.row() {
                hasher.update(&value.to_le_bytes());
            }
        }
    }

    hasher.finalize().to_hex().to_string()
}
