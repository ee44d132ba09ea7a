//! Parquet cache of per-symbol series.
//!
//! Layout: `{cache_dir}/{SYMBOL}.parquet` plus `{cache_dir}/{SYMBOL}.meta.json`.
//!
//! - Atomic writes (write to .tmp, rename into place)
//! - Integrity validation on load (expected columns, row count > 0, date order)
//! - Quarantine for corrupt files (`{SYMBOL}.parquet.quarantined`)
//! - Metadata sidecar per symbol (hash, date range, source)

use super::provider::{DataError, DataSource};
use crate::domain::{Bar, StockSeries};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const PARQUET_EXT: &str = "parquet";
const COLUMNS: [&str; 6] = ["date", "open", "close", "high", "low", "volume"];

/// Metadata sidecar for a cached symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMeta {
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub bar_count: usize,
    pub data_hash: String,
    pub source: DataSource,
    pub cached_at: chrono::NaiveDateTime,
}

/// Cache status for a single symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatus {
    pub symbol: String,
    pub cached: bool,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub bar_count: Option<usize>,
}

/// Disk cache keyed by stock symbol.
#[derive(Debug, Clone)]
pub struct SeriesCache {
    cache_dir: PathBuf,
}

impl SeriesCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Root directory of the cache.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn data_path(&self, symbol: &str) -> PathBuf {
        self.cache_dir.join(format!("{symbol}.{PARQUET_EXT}"))
    }

    fn meta_path(&self, symbol: &str) -> PathBuf {
        self.cache_dir.join(format!("{symbol}.meta.json"))
    }

    /// True if a data file exists for the symbol.
    pub fn contains(&self, symbol: &str) -> bool {
        self.data_path(symbol).is_file()
    }

    /// Write a series to the cache, replacing any previous entry.
    pub fn write(&self, series: &StockSeries, source: DataSource) -> Result<(), DataError> {
        let symbol = series.symbol();
        validate_symbol(symbol)?;
        let (Some(start_date), Some(end_date)) = (series.first_date(), series.last_date()) else {
            return Err(DataError::CacheError(format!("no bars to cache for {symbol}")));
        };

        fs::create_dir_all(&self.cache_dir)
            .map_err(|e| DataError::CacheError(format!("failed to create dir: {e}")))?;

        let mut df = series_to_dataframe(series)?;
        let path = self.data_path(symbol);
        let tmp_path = path.with_extension("parquet.tmp");

        write_parquet(&mut df, &tmp_path)?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::CacheError(format!("atomic rename failed: {e}"))
        })?;

        let bars_json = serde_json::to_vec(series.bars())
            .map_err(|e| DataError::CacheError(format!("hash serialization: {e}")))?;
        let meta = CacheMeta {
            symbol: symbol.to_string(),
            start_date,
            end_date,
            bar_count: series.len(),
            data_hash: blake3::hash(&bars_json).to_hex().to_string(),
            source,
            cached_at: chrono::Local::now().naive_local(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| DataError::CacheError(format!("meta serialization: {e}")))?;
        fs::write(self.meta_path(symbol), meta_json)
            .map_err(|e| DataError::CacheError(format!("meta write: {e}")))?;

        Ok(())
    }

    /// Load the cached series for a symbol.
    ///
    /// A file that cannot be decoded or fails validation is quarantined and
    /// reported as an error. Failing to open the file leaves it in place.
    pub fn load(&self, symbol: &str) -> Result<StockSeries, DataError> {
        validate_symbol(symbol)?;
        let path = self.data_path(symbol);
        if !path.is_file() {
            return Err(DataError::NoCachedData {
                symbol: symbol.to_string(),
            });
        }

        let file = open_cached(symbol, &path)?;
        match decode_and_validate(symbol, file) {
            Ok(series) => Ok(series),
            Err(e) => {
                quarantine(&path, &e);
                Err(e)
            }
        }
    }

    /// Cached symbols, sorted.
    pub fn symbols(&self) -> Result<Vec<String>, DataError> {
        if !self.cache_dir.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.cache_dir)
            .map_err(|e| DataError::CacheError(format!("read dir: {e}")))?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| DataError::CacheError(format!("dir entry: {e}")))?;
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(symbol) = name.strip_suffix(".parquet") {
                if entry.path().is_file() && !symbol.is_empty() {
                    symbols.push(symbol.to_string());
                }
            }
        }
        symbols.sort();
        Ok(symbols)
    }

    /// Load every cached series in symbol order. Unreadable entries are
    /// skipped with a warning.
    pub fn load_all(&self) -> Result<Vec<StockSeries>, DataError> {
        let mut all = Vec::new();
        for symbol in self.symbols()? {
            match self.load(&symbol) {
                Ok(series) => all.push(series),
                Err(e) => tracing::warn!("skipping cached {symbol}: {e}"),
            }
        }
        Ok(all)
    }

    /// Metadata sidecar for a symbol, if present and readable.
    pub fn get_meta(&self, symbol: &str) -> Option<CacheMeta> {
        let content = fs::read_to_string(self.meta_path(symbol)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Cache status for each requested symbol.
    pub fn status(&self, symbols: &[&str]) -> Vec<CacheStatus> {
        symbols
            .iter()
            .map(|sym| {
                let meta = self.get_meta(sym);
                CacheStatus {
                    symbol: sym.to_string(),
                    cached: self.contains(sym),
                    start_date: meta.as_ref().map(|m| m.start_date),
                    end_date: meta.as_ref().map(|m| m.end_date),
                    bar_count: meta.as_ref().map(|m| m.bar_count),
                }
            })
            .collect()
    }
}

fn validate_symbol(symbol: &str) -> Result<(), DataError> {
    if symbol.is_empty() || symbol.contains(['/', '\\']) || symbol.starts_with('.') {
        return Err(DataError::ValidationError(format!(
            "invalid symbol for cache key: '{symbol}'"
        )));
    }
    Ok(())
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

fn epoch() -> NaiveDate {
    NaiveDate::default()
}

fn series_to_dataframe(series: &StockSeries) -> Result<DataFrame, DataError> {
    let bars = series.bars();
    let dates: Vec<i32> = bars
        .iter()
        .map(|b| (b.date - epoch()).num_days() as i32)
        .collect();
    let column = |f: fn(&Bar) -> f64| bars.iter().map(f).collect::<Vec<f64>>();

    DataFrame::new(vec![
        Column::new("date".into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| DataError::ParquetError(format!("date cast: {e}")))?,
        Column::new("open".into(), column(|b| b.open)),
        Column::new("close".into(), column(|b| b.close)),
        Column::new("high".into(), column(|b| b.high)),
        Column::new("low".into(), column(|b| b.low)),
        Column::new("volume".into(), column(|b| b.volume)),
    ])
    .map_err(|e| DataError::ParquetError(format!("dataframe creation: {e}")))
}

fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<(), DataError> {
    let file =
        fs::File::create(path).map_err(|e| DataError::ParquetError(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(df)
        .map_err(|e| DataError::ParquetError(format!("write parquet: {e}")))?;
    Ok(())
}

/// Open a cache file. A file removed since the existence check reads as
/// not cached; any other I/O failure is passed through untouched.
fn open_cached(symbol: &str, path: &Path) -> Result<fs::File, DataError> {
    fs::File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => DataError::NoCachedData {
            symbol: symbol.to_string(),
        },
        _ => DataError::CacheError(format!("open {}: {e}", path.display())),
    })
}

/// Move a bad cache file aside so it is refetched on the next download.
fn quarantine(path: &Path, cause: &DataError) {
    let target = path.with_extension("parquet.quarantined");
    tracing::warn!("quarantining corrupt cache file {}: {cause}", path.display());
    if let Err(e) = fs::rename(path, &target) {
        tracing::warn!("failed to quarantine {}: {e}", path.display());
    }
}

fn decode_and_validate(symbol: &str, file: fs::File) -> Result<StockSeries, DataError> {
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| DataError::ParquetError(format!("read: {e}")))?;

    if df.height() == 0 {
        return Err(DataError::ValidationError("empty parquet file".into()));
    }
    for col_name in COLUMNS {
        if df.column(col_name).is_err() {
            return Err(DataError::ValidationError(format!(
                "missing column '{col_name}'"
            )));
        }
    }

    let bars = dataframe_to_bars(&df)?;
    StockSeries::new(symbol, bars)
        .map_err(|e| DataError::ValidationError(format!("cached series: {e}")))
}

fn dataframe_to_bars(df: &DataFrame) -> Result<Vec<Bar>, DataError> {
    let map_err = |e: PolarsError| DataError::ParquetError(format!("column read: {e}"));
    let f64_col = |name: &str| -> Result<Float64Chunked, DataError> {
        Ok(df.column(name).map_err(map_err)?.f64().map_err(map_err)?.clone())
    };

    let date_ca = df
        .column("date")
        .map_err(map_err)?
        .date()
        .map_err(|e| DataError::ParquetError(format!("date column type: {e}")))?;
    let open = f64_col("open")?;
    let close = f64_col("close")?;
    let high = f64_col("high")?;
    let low = f64_col("low")?;
    let volume = f64_col("volume")?;

    let mut bars = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let days = date_ca
            .get(i)
            .ok_or_else(|| DataError::ParquetError(format!("null date at row {i}")))?;

        bars.push(Bar {
            date: epoch() + chrono::Duration::days(days as i64),
            open: open.get(i).unwrap_or(f64::NAN),
            close: close.get(i).unwrap_or(f64::NAN),
            high: high.get(i).unwrap_or(f64::NAN),
            low: low.get(i).unwrap_or(f64::NAN),
            volume: volume.get(i).unwrap_or(0.0),
        });
    }

    Ok(bars)
}
