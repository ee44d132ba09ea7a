//! Serializable dataset-build configuration.
//!
//! A single TOML file describes where series are cached, which date range
//! to download, and how the universe is sampled:
//!
//! ```toml
//! [data]
//! cache_dir = "data/cache"
//! start_date = "2018-01-03"
//! end_date = "2018-05-26"
//! workers = 6
//!
//! [sampling]
//! window_length = 10
//! expected_series_len = 94
//!
//! [split]
//! layout = "time_major"
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use stocklab_core::data::{DateRange, DEFAULT_WORKERS};
use stocklab_core::sampling::{TensorLayout, DEFAULT_WINDOW_LEN, EXPECTED_SERIES_LEN};
use thiserror::Error;

/// Errors from loading or validating a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("start_date {start} is after end_date {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("workers must be at least 1")]
    NoWorkers,

    #[error("window_length must be at least 1")]
    EmptyWindow,
}

/// Top-level configuration for one dataset build.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatasetConfig {
    pub data: DataConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub split: SplitConfig,
}

/// Acquisition settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataConfig {
    /// Directory holding the per-symbol Parquet cache.
    pub cache_dir: PathBuf,
    /// First trading day to download (inclusive).
    pub start_date: NaiveDate,
    /// Last trading day to download (inclusive).
    pub end_date: NaiveDate,
    /// Concurrent download workers.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Symbol universe TOML. The built-in CSI 300 sample is used when absent.
    #[serde(default)]
    pub universe_file: Option<PathBuf>,
}

/// Rolling-window sampler settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SamplingConfig {
    #[serde(default = "default_window_length")]
    pub window_length: usize,
    /// Only series with exactly this many rows are sampled.
    #[serde(default = "default_expected_series_len")]
    pub expected_series_len: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            window_length: DEFAULT_WINDOW_LEN,
            expected_series_len: EXPECTED_SERIES_LEN,
        }
    }
}

/// Feature/label split settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SplitConfig {
    #[serde(default)]
    pub layout: TensorLayout,
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

fn default_window_length() -> usize {
    DEFAULT_WINDOW_LEN
}

fn default_expected_series_len() -> usize {
    EXPECTED_SERIES_LEN
}

impl DatasetConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data.start_date > self.data.end_date {
            return Err(ConfigError::InvalidDateRange {
                start: self.data.start_date,
                end: self.data.end_date,
            });
        }
        if self.data.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.sampling.window_length == 0 {
            return Err(ConfigError::EmptyWindow);
        }
        Ok(())
    }

    pub fn date_range(&self) -> DateRange {
        DateRange {
            start: self.data.start_date,
            end: self.data.end_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [data]
        cache_dir = "cache"
        start_date = "2018-01-03"
        end_date = "2018-05-26"
    "#;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = DatasetConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(config.data.workers, 6);
        assert_eq!(config.data.universe_file, None);
        assert_eq!(config.sampling.window_length, 10);
        assert_eq!(config.sampling.expected_series_len, 94);
        assert_eq!(config.split.layout, TensorLayout::BatchMajor);
    }

    #[test]
    fn full_config_parses() {
        let config = DatasetConfig::from_toml(
            r#"
            [data]
            cache_dir = "/tmp/stocklab"
            start_date = "2018-01-03"
            end_date = "2018-05-26"
            workers = 3
            universe_file = "universe.toml"

            [sampling]
            window_length = 5
            expected_series_len = 40

            [split]
            layout = "time_major"
            "#,
        )
        .unwrap();

        assert_eq!(config.data.workers, 3);
        assert_eq!(
            config.data.universe_file.as_deref(),
            Some(Path::new("universe.toml"))
        );
        assert_eq!(config.sampling.window_length, 5);
        assert_eq!(config.split.layout, TensorLayout::TimeMajor);
        assert_eq!(
            config.date_range().start,
            NaiveDate::from_ymd_opt(2018, 1, 3).unwrap()
        );
    }

    #[test]
    fn reversed_dates_rejected() {
        let err = DatasetConfig::from_toml(
            r#"
            [data]
            cache_dir = "cache"
            start_date = "2018-05-26"
            end_date = "2018-01-03"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDateRange { .. }));
    }

    #[test]
    fn zero_workers_and_zero_window_rejected() {
        let mut config = DatasetConfig::from_toml(MINIMAL).unwrap();
        config.data.workers = 0;
        assert!(matches!(config.validate(), Err(ConfigError::NoWorkers)));

        config.data.workers = 1;
        config.sampling.window_length = 0;
        assert!(matches!(config.validate(), Err(ConfigError::EmptyWindow)));
    }

    #[test]
    fn unknown_layout_is_parse_error() {
        let err = DatasetConfig::from_toml(&format!("{MINIMAL}\n[split]\nlayout = \"sideways\"\n"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = DatasetConfig::from_file(Path::new("/nonexistent/stocklab.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
