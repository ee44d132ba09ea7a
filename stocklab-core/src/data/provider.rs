//! Data provider trait and structured error types.
//!
//! A provider turns (symbol, date range) into a [`StockSeries`]. The cache sits
//! above this trait; providers know nothing about it.

use crate::domain::{SeriesError, StockSeries};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("HTTP {status} for {symbol}")]
    Http { symbol: String, status: u16 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("{symbol} has no trading data between {start} and {end}")]
    NoDataInRange {
        symbol: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("invalid series: {0}")]
    Series(#[from] SeriesError),

    #[error("cache error: {0}")]
    CacheError(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("parquet I/O error: {0}")]
    ParquetError(String),

    #[error("no cached data for symbol '{symbol}'")]
    NoCachedData { symbol: String },

    #[error("failed to start download workers: {0}")]
    WorkerPool(String),
}

/// Result of a successful fetch for a single symbol.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub series: StockSeries,
    pub source: DataSource,
}

/// Where a series came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    YahooFinance,
    Cache,
    Synthetic,
}

impl DataSource {
    pub fn as_str(self) -> &'static str {
        match self {
            DataSource::YahooFinance => "yahoo_finance",
            DataSource::Cache => "cache",
            DataSource::Synthetic => "synthetic",
        }
    }
}

/// A source of daily bars.
///
/// Implementations must be shareable across the download worker pool.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch daily bars for a symbol over an inclusive date range.
    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate)
        -> Result<FetchResult, DataError>;
}

/// Progress callbacks for multi-symbol downloads. Called from worker threads.
pub trait DownloadProgress: Send + Sync {
    fn on_start(&self, symbol: &str, index: usize, total: usize);

    /// `error` is `None` when the symbol ended up in the cache.
    fn on_complete(&self, symbol: &str, index: usize, total: usize, error: Option<&DataError>);

    fn on_batch_complete(&self, downloaded: usize, cached: usize, failed: usize, total: usize);
}

/// Reports download progress through `tracing`.
pub struct LogProgress;

impl DownloadProgress for LogProgress {
    fn on_start(&self, symbol: &str, index: usize, total: usize) {
        tracing::debug!("[{}/{}] fetching {symbol}", index + 1, total);
    }

    fn on_complete(&self, symbol: &str, index: usize, total: usize, error: Option<&DataError>) {
        match error {
            None => tracing::info!("[{}/{}] {symbol} ok", index + 1, total),
            Some(e) => tracing::warn!("[{}/{}] {symbol} failed: {e}", index + 1, total),
        }
    }

    fn on_batch_complete(&self, downloaded: usize, cached: usize, failed: usize, total: usize) {
        tracing::info!(
            "download complete: {downloaded} downloaded, {cached} already cached, {failed} failed ({total} total)"
        );
    }
}

/// Progress sink that drops every event.
pub struct NoProgress;

impl DownloadProgress for NoProgress {
    fn on_start(&self, _symbol: &str, _index: usize, _total: usize) {}

    fn on_complete(&self, _: &str, _: usize, _: usize, _: Option<&DataError>) {}

    fn on_batch_complete(&self, _: usize, _: usize, _: usize, _: usize) {}
}
