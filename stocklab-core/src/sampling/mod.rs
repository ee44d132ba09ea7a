//! Sampling core: rolling windows and the feature/label split.
//!
//! Pure in-memory transformations of already-fetched series. Nothing here
//! performs I/O or logs; length filters drop series silently, shape
//! violations fail the whole call.

pub mod encode;
pub mod filter;
pub mod split;
pub mod window;

use thiserror::Error;

pub use encode::{batch_mean, binarize_above, decode_one_hot, one_hot, NUM_CLASSES};
pub use filter::{
    has_min_history, is_full_period, DEFAULT_WINDOW_LEN, EXPECTED_SERIES_LEN,
    MIN_SPLIT_SERIES_LEN, SPLIT_LABEL_INDEX, SPLIT_WINDOW_LEN,
};
pub use split::{FeatureLabelSplitter, FeatureTensor, LabelTensor, SplitOutput, TensorLayout};
pub use window::{RollingSamples, Sample, WindowSampler};

#[derive(Debug, Error, PartialEq)]
pub enum SamplingError {
    #[error("window length must be at least 1 (got {window_length})")]
    InvalidWindow { window_length: usize },

    #[error("label row {index} out of range for '{symbol}' ({len} rows)")]
    LabelOutOfRange {
        symbol: String,
        index: usize,
        len: usize,
    },

    #[error("class {class} out of range for {num_classes}-class encoding")]
    ClassOutOfRange { class: usize, num_classes: usize },

    #[error("unknown tensor layout '{0}' (expected batch_major or time_major)")]
    UnknownLayout(String),
}
