//! StockLab Runner — dataset builds on top of `stocklab-core`.
//!
//! This crate provides:
//! - TOML dataset configuration
//! - Universe loading: parallel download with whole-cache fallback
//! - Rolling-window and feature/label dataset builders
//! - CSV/JSON export with a manifest carrying the dataset hash

pub mod config;
pub mod data_loader;
pub mod dataset;
pub mod export;

pub use config::{ConfigError, DataConfig, DatasetConfig, SamplingConfig, SplitConfig};
pub use data_loader::{
    compute_dataset_hash, load_universe, LoadError, LoadOptions, LoadedUniverse, UniverseSource,
};
pub use dataset::{build_rolling, build_split, RollingDataset, SampleOrigin, SplitDataset};
pub use export::{
    read_manifest, write_rolling, write_split, DatasetKind, DatasetManifest, ExportError,
};
