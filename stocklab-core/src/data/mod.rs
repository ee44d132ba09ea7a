//! Data acquisition and caching

pub mod cache;
pub mod download;
pub mod provider;
pub mod synthetic;
pub mod universe;
pub mod yahoo;

pub use cache::{CacheMeta, CacheStatus, SeriesCache};
pub use download::{download_universe, DateRange, DownloadSummary, SymbolOutcome, DEFAULT_WORKERS};
pub use provider::{
    DataError, DataProvider, DataSource, DownloadProgress, FetchResult, LogProgress, NoProgress,
};
pub use synthetic::SyntheticProvider;
pub use universe::{SymbolUniverse, UniverseError};
pub use yahoo::YahooProvider;
