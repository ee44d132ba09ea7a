//! Owned, export-ready datasets built from a loaded universe.

use ndarray::{Array1, Array2, Array3};
use serde::{Deserialize, Serialize};
use stocklab_core::domain::StockSeries;
use stocklab_core::sampling::{
    is_full_period, FeatureLabelSplitter, SamplingError, TensorLayout, WindowSampler,
};

use crate::config::SamplingConfig;

/// Where one rolling sample came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleOrigin {
    pub symbol: String,
    /// Row index of the first window row in the source series.
    pub start: usize,
}

/// Rolling-window samples stacked batch-major.
#[derive(Debug, Clone)]
pub struct RollingDataset {
    /// `(samples, window_length, FIELD_COUNT)`
    pub features: Array3<f64>,
    /// Close following each window.
    pub labels: Array1<f64>,
    pub origins: Vec<SampleOrigin>,
    pub window_length: usize,
}

impl RollingDataset {
    pub fn len(&self) -> usize {
        self.origins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }
}

/// Feature/label split with its batch statistics.
#[derive(Debug, Clone)]
pub struct SplitDataset {
    pub features: Array3<f64>,
    /// One-hot, `(samples, 2)`.
    pub labels: Array2<f64>,
    pub layout: TensorLayout,
    pub raw_labels: Vec<f64>,
    pub threshold: Option<f64>,
    pub symbols: Vec<String>,
}

impl SplitDataset {
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

pub fn build_rolling(
    universe: &[StockSeries],
    cfg: &SamplingConfig,
) -> Result<RollingDataset, SamplingError> {
    let sampler =
        WindowSampler::new(cfg.window_length)?.with_expected_len(cfg.expected_series_len);
    let samples = sampler.sample(universe);

    let included = universe
        .iter()
        .filter(|s| is_full_period(s, cfg.expected_series_len))
        .count();
    tracing::info!(
        series = universe.len(),
        included,
        samples = samples.len(),
        window_length = cfg.window_length,
        "built rolling dataset"
    );

    Ok(RollingDataset {
        features: samples.to_feature_tensor(),
        labels: samples.label_vector(),
        origins: samples
            .samples()
            .iter()
            .map(|s| SampleOrigin {
                symbol: s.symbol.to_string(),
                start: s.start,
            })
            .collect(),
        window_length: sampler.window_length(),
    })
}

pub fn build_split(
    universe: &[StockSeries],
    layout: TensorLayout,
) -> Result<SplitDataset, SamplingError> {
    let out = FeatureLabelSplitter::split_with_threshold(universe, layout)?;
    tracing::info!(
        series = universe.len(),
        included = out.symbols.len(),
        threshold = ?out.threshold,
        layout = %layout,
        "built split dataset"
    );

    Ok(SplitDataset {
        features: out.features,
        labels: out.labels,
        layout: out.layout,
        raw_labels: out.raw_labels,
        threshold: out.threshold,
        symbols: out.symbols,
    })
}
