//! Feature/label split for the above-mean classifier.
//!
//! Every series with enough history contributes one sample: its first
//! `SPLIT_WINDOW_LEN` rows as features and the close at `SPLIT_LABEL_INDEX` as
//! the raw label. Raw labels are binarized against the mean of the current
//! batch, so the same series can get a different class in a different batch.

use super::encode::{batch_mean, binarize_above, one_hot, NUM_CLASSES};
use super::filter::{has_min_history, MIN_SPLIT_SERIES_LEN, SPLIT_LABEL_INDEX, SPLIT_WINDOW_LEN};
use super::SamplingError;
use crate::domain::{StockSeries, FIELD_COUNT};
use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Dense feature tensor, batch-major or time-major.
pub type FeatureTensor = Array3<f64>;

/// One-hot label tensor, `(samples, NUM_CLASSES)`.
pub type LabelTensor = Array2<f64>;

/// Axis order of a [`FeatureTensor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TensorLayout {
    /// `(samples, steps, fields)`
    #[default]
    BatchMajor,
    /// `(steps, samples, fields)`
    TimeMajor,
}

impl TensorLayout {
    /// Feature tensor shape for `samples` samples of `steps` rows.
    pub fn feature_shape(self, samples: usize, steps: usize) -> (usize, usize, usize) {
        match self {
            TensorLayout::BatchMajor => (samples, steps, FIELD_COUNT),
            TensorLayout::TimeMajor => (steps, samples, FIELD_COUNT),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TensorLayout::BatchMajor => "batch_major",
            TensorLayout::TimeMajor => "time_major",
        }
    }
}

impl fmt::Display for TensorLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TensorLayout {
    type Err = SamplingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "batch_major" | "batch-major" => Ok(TensorLayout::BatchMajor),
            "time_major" | "time-major" => Ok(TensorLayout::TimeMajor),
            other => Err(SamplingError::UnknownLayout(other.to_string())),
        }
    }
}

/// Split result with the batch statistics used to build it.
#[derive(Debug, Clone)]
pub struct SplitOutput {
    pub features: FeatureTensor,
    pub labels: LabelTensor,
    pub layout: TensorLayout,
    /// Close at `SPLIT_LABEL_INDEX` per included series.
    pub raw_labels: Vec<f64>,
    /// Binarization threshold; `None` when no series qualified.
    pub threshold: Option<f64>,
    /// Symbols of the included series, in sample order.
    pub symbols: Vec<String>,
}

/// Builds model-ready (features, labels) from a universe.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureLabelSplitter;

impl FeatureLabelSplitter {
    /// Feature and one-hot label tensors for every series with at least
    /// `MIN_SPLIT_SERIES_LEN` rows.
    pub fn split(
        universe: &[StockSeries],
        layout: TensorLayout,
    ) -> Result<(FeatureTensor, LabelTensor), SamplingError> {
        let out = Self::split_with_threshold(universe, layout)?;
        Ok((out.features, out.labels))
    }

    /// Same as [`split`](Self::split), also returning raw labels and threshold.
    pub fn split_with_threshold(
        universe: &[StockSeries],
        layout: TensorLayout,
    ) -> Result<SplitOutput, SamplingError> {
        let included: Vec<&StockSeries> = universe
            .iter()
            .filter(|s| has_min_history(s, MIN_SPLIT_SERIES_LEN))
            .collect();
        split_series(&included, layout)
    }
}

/// Split already-filtered series. Fails if any series lacks the label row.
pub(crate) fn split_series(
    included: &[&StockSeries],
    layout: TensorLayout,
) -> Result<SplitOutput, SamplingError> {
    let n = included.len();
    let mut features = Array3::<f64>::zeros((n, SPLIT_WINDOW_LEN, FIELD_COUNT));
    let mut raw_labels = Vec::with_capacity(n);

    for (i, series) in included.iter().enumerate() {
        let label = series
            .close(SPLIT_LABEL_INDEX)
            .ok_or_else(|| SamplingError::LabelOutOfRange {
                symbol: series.symbol().to_string(),
                index: SPLIT_LABEL_INDEX,
                len: series.len(),
            })?;

        for (t, bar) in series.bars()[..SPLIT_WINDOW_LEN].iter().enumerate() {
            for (f, value) in bar.row().into_iter().enumerate() {
                features[[i, t, f]] = value;
            }
        }
        raw_labels.push(label);
    }

    let threshold = batch_mean(&raw_labels);
    let classes = match threshold {
        Some(mean) => binarize_above(&raw_labels, mean),
        None => Vec::new(),
    };
    let labels = one_hot(&classes, NUM_CLASSES)?;

    let features = match layout {
        TensorLayout::BatchMajor => features,
        TensorLayout::TimeMajor => features
            .permuted_axes([1, 0, 2])
            .as_standard_layout()
            .into_owned(),
    };

    Ok(SplitOutput {
        features,
        labels,
        layout,
        raw_labels,
        threshold,
        symbols: included.iter().map(|s| s.symbol().to_string()).collect(),
    })
}
