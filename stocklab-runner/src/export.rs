//! Dataset export — CSV tensors plus a JSON manifest.
//!
//! Each export directory contains:
//! - `features.csv` — one row per sample, steps × fields flattened step-major
//! - `labels.csv` — one row per sample with its provenance
//! - `manifest.json` — shapes, layout, threshold and dataset hash
//!
//! Time-major split features are written per sample as well; the manifest
//! records the in-memory layout so readers can rebuild the tensor.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use ndarray::{ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use stocklab_core::domain::Field;
use stocklab_core::sampling::TensorLayout;
use thiserror::Error;

use crate::dataset::{RollingDataset, SplitDataset};

/// Current schema version for the manifest.
pub const SCHEMA_VERSION: u32 = 1;

pub const FEATURES_FILE: &str = "features.csv";
pub const LABELS_FILE: &str = "labels.csv";
pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("manifest serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Which builder produced the export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    Rolling,
    Split,
}

/// Contents of `manifest.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetManifest {
    pub schema_version: u32,
    pub kind: DatasetKind,
    pub samples: usize,
    /// In-memory feature tensor shape.
    pub feature_shape: [usize; 3],
    pub label_shape: Vec<usize>,
    /// Only meaningful for split exports; rolling tensors are batch-major.
    pub layout: TensorLayout,
    pub threshold: Option<f64>,
    pub symbols: Vec<String>,
    pub dataset_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Write a rolling dataset to `dir`, creating it if needed.
pub fn write_rolling(
    dataset: &RollingDataset,
    dataset_hash: &str,
    dir: &Path,
) -> Result<DatasetManifest, ExportError> {
    create_dir(dir)?;

    let mut features = csv::Writer::from_path(dir.join(FEATURES_FILE))?;
    features.write_record(feature_header(dataset.window_length))?;
    for sample in dataset.features.axis_iter(Axis(0)) {
        write_feature_row(&mut features, sample)?;
    }
    features.flush().map_err(|source| io_error(dir.join(FEATURES_FILE), source))?;

    let mut labels = csv::Writer::from_path(dir.join(LABELS_FILE))?;
    labels.write_record(["symbol", "start", "label"])?;
    for (origin, label) in dataset.origins.iter().zip(dataset.labels.iter()) {
        labels.write_record([
            origin.symbol.clone(),
            origin.start.to_string(),
            label.to_string(),
        ])?;
    }
    labels.flush().map_err(|source| io_error(dir.join(LABELS_FILE), source))?;

    let (n, steps, fields) = dataset.features.dim();
    let manifest = DatasetManifest {
        schema_version: SCHEMA_VERSION,
        kind: DatasetKind::Rolling,
        samples: n,
        feature_shape: [n, steps, fields],
        label_shape: vec![dataset.labels.len()],
        layout: TensorLayout::BatchMajor,
        threshold: None,
        symbols: distinct_symbols(dataset.origins.iter().map(|o| o.symbol.as_str())),
        dataset_hash: dataset_hash.to_string(),
        created_at: Utc::now(),
    };
    write_manifest(&manifest, dir)?;
    tracing::info!(dir = %dir.display(), samples = n, "wrote rolling dataset");
    Ok(manifest)
}

/// Write a feature/label split to `dir`, creating it if needed.
pub fn write_split(
    dataset: &SplitDataset,
    dataset_hash: &str,
    dir: &Path,
) -> Result<DatasetManifest, ExportError> {
    create_dir(dir)?;

    let sample_axis = match dataset.layout {
        TensorLayout::BatchMajor => Axis(0),
        TensorLayout::TimeMajor => Axis(1),
    };
    let steps = match dataset.layout {
        TensorLayout::BatchMajor => dataset.features.dim().1,
        TensorLayout::TimeMajor => dataset.features.dim().0,
    };

    let mut features = csv::Writer::from_path(dir.join(FEATURES_FILE))?;
    features.write_record(feature_header(steps))?;
    for sample in dataset.features.axis_iter(sample_axis) {
        write_feature_row(&mut features, sample)?;
    }
    features.flush().map_err(|source| io_error(dir.join(FEATURES_FILE), source))?;

    let mut labels = csv::Writer::from_path(dir.join(LABELS_FILE))?;
    labels.write_record(["symbol", "raw_label", "class_0", "class_1"])?;
    for ((symbol, raw), row) in dataset
        .symbols
        .iter()
        .zip(&dataset.raw_labels)
        .zip(dataset.labels.rows())
    {
        labels.write_record([
            symbol.clone(),
            raw.to_string(),
            row[0].to_string(),
            row[1].to_string(),
        ])?;
    }
    labels.flush().map_err(|source| io_error(dir.join(LABELS_FILE), source))?;

    let (a, b, c) = dataset.features.dim();
    let manifest = DatasetManifest {
        schema_version: SCHEMA_VERSION,
        kind: DatasetKind::Split,
        samples: dataset.len(),
        feature_shape: [a, b, c],
        label_shape: dataset.labels.shape().to_vec(),
        layout: dataset.layout,
        threshold: dataset.threshold,
        symbols: dataset.symbols.clone(),
        dataset_hash: dataset_hash.to_string(),
        created_at: Utc::now(),
    };
    write_manifest(&manifest, dir)?;
    tracing::info!(
        dir = %dir.display(),
        samples = dataset.len(),
        layout = %dataset.layout,
        "wrote split dataset"
    );
    Ok(manifest)
}

/// Read back a manifest written by [`write_rolling`] or [`write_split`].
pub fn read_manifest(dir: &Path) -> Result<DatasetManifest, ExportError> {
    let path = dir.join(MANIFEST_FILE);
    let json = std::fs::read_to_string(&path).map_err(|source| io_error(path, source))?;
    Ok(serde_json::from_str(&json)?)
}

// ─── Helpers ────────────────────────────────────────────────────────

/// `t0_open, t0_close, ..., t{steps-1}_volume`
fn feature_header(steps: usize) -> Vec<String> {
    (0..steps)
        .flat_map(|t| Field::ALL.into_iter().map(move |f| format!("t{t}_{}", f.name())))
        .collect()
}

/// One sample's `(steps, fields)` view as a flat CSV row.
fn write_feature_row<W: std::io::Write>(
    wtr: &mut csv::Writer<W>,
    sample: ArrayView2<'_, f64>,
) -> Result<(), ExportError> {
    wtr.write_record(sample.iter().map(|v| v.to_string()))?;
    Ok(())
}

fn write_manifest(manifest: &DatasetManifest, dir: &Path) -> Result<(), ExportError> {
    let path = dir.join(MANIFEST_FILE);
    let json = serde_json::to_string_pretty(manifest)?;
    std::fs::write(&path, json).map_err(|source| io_error(path, source))
}

fn distinct_symbols<'a>(symbols: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for s in symbols {
        if out.last().map(String::as_str) != Some(s) {
            out.push(s.to_string());
        }
    }
    out
}

fn create_dir(dir: &Path) -> Result<(), ExportError> {
    std::fs::create_dir_all(dir).map_err(|source| io_error(dir.to_path_buf(), source))
}

fn io_error(path: PathBuf, source: std::io::Error) -> ExportError {
    ExportError::Io { path, source }
}
