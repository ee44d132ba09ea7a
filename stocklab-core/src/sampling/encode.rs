//! Batch-relative binarization and one-hot encoding of labels.

use super::SamplingError;
use ndarray::Array2;

/// Class alphabet size: `0` = not above the batch mean, `1` = above it.
pub const NUM_CLASSES: usize = 2;

/// Arithmetic mean of a batch of raw labels, `None` for an empty batch.
pub fn batch_mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// `1` where the value is strictly greater than `threshold`, else `0`.
pub fn binarize_above(values: &[f64], threshold: f64) -> Vec<usize> {
    values.iter().map(|&v| usize::from(v > threshold)).collect()
}

/// Indicator matrix of shape `(labels.len(), num_classes)`.
pub fn one_hot(labels: &[usize], num_classes: usize) -> Result<Array2<f64>, SamplingError> {
    let mut encoded = Array2::zeros((labels.len(), num_classes));
    for (row, &class) in labels.iter().enumerate() {
        if class >= num_classes {
            return Err(SamplingError::ClassOutOfRange { class, num_classes });
        }
        encoded[[row, class]] = 1.0;
    }
    Ok(encoded)
}

/// Column index of the largest entry in each row (first wins on ties).
pub fn decode_one_hot(encoded: &Array2<f64>) -> Vec<usize> {
    encoded
        .rows()
        .into_iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |best, (i, &v)| {
                    if v > best.1 {
                        (i, v)
                    } else {
                        best
                    }
                })
                .0
        })
        .collect()
}
