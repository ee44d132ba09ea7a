//! Rolling-window sampling.
//!
//! Slides a fixed-length window with stride 1 over each full-period series and
//! pairs every window with the close of the row immediately after it.

use super::filter::{is_full_period, DEFAULT_WINDOW_LEN, EXPECTED_SERIES_LEN};
use super::SamplingError;
use crate::domain::{Bar, StockSeries, FIELD_COUNT};
use ndarray::{Array1, Array3};
use serde::{Deserialize, Serialize};

/// One (window, next-step label) pair borrowed from a series.
#[derive(Debug, Clone, Copy)]
pub struct Sample<'a> {
    pub symbol: &'a str,
    /// Row index of the first bar in the window.
    pub start: usize,
    pub window: &'a [Bar],
    /// Close of the row at `start + window.len()`.
    pub label: f64,
}

impl Sample<'_> {
    /// Row index the label was taken from.
    pub fn label_index(&self) -> usize {
        self.start + self.window.len()
    }
}

/// Rolling-window sampler over a universe of series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSampler {
    window_length: usize,
    expected_len: usize,
}

impl Default for WindowSampler {
    fn default() -> Self {
        Self {
            window_length: DEFAULT_WINDOW_LEN,
            expected_len: EXPECTED_SERIES_LEN,
        }
    }
}

impl WindowSampler {
    pub fn new(window_length: usize) -> Result<Self, SamplingError> {
        if window_length == 0 {
            return Err(SamplingError::InvalidWindow { window_length });
        }
        Ok(Self {
            window_length,
            ..Self::default()
        })
    }

    /// Only series with exactly `expected_len` rows are sampled.
    pub fn with_expected_len(mut self, expected_len: usize) -> Self {
        self.expected_len = expected_len;
        self
    }

    pub fn window_length(&self) -> usize {
        self.window_length
    }

    pub fn expected_len(&self) -> usize {
        self.expected_len
    }

    /// Samples produced from a series of `len` rows, if it passes the filter.
    pub fn samples_per_series(&self, len: usize) -> usize {
        len.saturating_sub(self.window_length + 1)
    }

    /// Sample every full-period series in order, series first then start index.
    ///
    /// Series of any other length are skipped without error.
    pub fn sample<'a>(&self, universe: &'a [StockSeries]) -> RollingSamples<'a> {
        let mut samples = Vec::new();

        for series in universe
            .iter()
            .filter(|s| is_full_period(s, self.expected_len))
        {
            let bars = series.bars();
            for start in 0..self.samples_per_series(bars.len()) {
                let end = start + self.window_length;
                samples.push(Sample {
                    symbol: series.symbol(),
                    start,
                    window: &bars[start..end],
                    label: bars[end].close,
                });
            }
        }

        RollingSamples {
            window_length: self.window_length,
            samples,
        }
    }
}

/// Ordered output of [`WindowSampler::sample`].
#[derive(Debug, Clone)]
pub struct RollingSamples<'a> {
    window_length: usize,
    samples: Vec<Sample<'a>>,
}

impl<'a> RollingSamples<'a> {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn window_length(&self) -> usize {
        self.window_length
    }

    pub fn samples(&self) -> &[Sample<'a>] {
        &self.samples
    }

    pub fn windows(&self) -> Vec<&'a [Bar]> {
        self.samples.iter().map(|s| s.window).collect()
    }

    pub fn labels(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.label).collect()
    }

    /// The (windows, labels) list pair.
    pub fn into_parts(self) -> (Vec<&'a [Bar]>, Vec<f64>) {
        self.samples.into_iter().map(|s| (s.window, s.label)).unzip()
    }

    /// Windows stacked batch-major: `(samples, window_length, FIELD_COUNT)`.
    pub fn to_feature_tensor(&self) -> Array3<f64> {
        Array3::from_shape_fn(
            (self.samples.len(), self.window_length, FIELD_COUNT),
            |(s, t, f)| self.samples[s].window[t].row()[f],
        )
    }

    pub fn label_vector(&self) -> Array1<f64> {
        self.samples.iter().map(|s| s.label).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn series(symbol: &str, n: usize) -> StockSeries {
        let start = NaiveDate::from_ymd_opt(2018, 1, 3).unwrap();
        let bars = (0..n)
            .map(|i| Bar {
                date: start + chrono::Duration::days(i as i64),
                open: i as f64,
                close: 100.0 + i as f64,
                high: i as f64 + 0.5,
                low: i as f64 - 0.5,
                volume: 1_000.0,
            })
            .collect();
        StockSeries::new(symbol, bars).unwrap()
    }

    #[test]
    fn rejects_zero_window() {
        assert!(matches!(
            WindowSampler::new(0),
            Err(SamplingError::InvalidWindow { window_length: 0 })
        ));
    }

    #[test]
    fn samples_full_period_series_only() {
        let universe = vec![series("A", 94), series("B", 60), series("C", 94)];
        let out = WindowSampler::default().sample(&universe);

        assert_eq!(out.len(), 2 * (94 - 10 - 1));
        assert!(out.samples().iter().all(|s| s.symbol != "B"));
        // Series order is preserved.
        assert_eq!(out.samples()[0].symbol, "A");
        assert_eq!(out.samples()[out.len() - 1].symbol, "C");
    }

    #[test]
    fn label_is_row_after_window() {
        let universe = vec![series("A", 94)];
        let out = WindowSampler::default().sample(&universe);

        for (i, s) in out.samples().iter().enumerate() {
            assert_eq!(s.start, i);
            assert_eq!(s.window.len(), 10);
            assert_eq!(s.label_index(), i + 10);
            assert_eq!(s.label, 100.0 + (i + 10) as f64);
            assert!(s.window.iter().all(|b| b.close < s.label));
        }
        // Last start index is n - W - 2; the final row is never a label.
        let last = out.samples().last().unwrap();
        assert_eq!(last.start, 94 - 10 - 2);
        assert_eq!(last.label_index(), 92);
    }

    #[test]
    fn empty_universe_yields_empty_pair() {
        let (windows, labels) = WindowSampler::default().sample(&[]).into_parts();
        assert!(windows.is_empty());
        assert!(labels.is_empty());
    }

    #[test]
    fn window_longer_than_series_yields_nothing() {
        let universe = vec![series("A", 5)];
        let sampler = WindowSampler::new(5).unwrap().with_expected_len(5);
        assert!(sampler.sample(&universe).is_empty());
    }

    #[test]
    fn feature_tensor_matches_windows() {
        let universe = vec![series("A", 20)];
        let sampler = WindowSampler::new(4).unwrap().with_expected_len(20);
        let out = sampler.sample(&universe);
        let tensor = out.to_feature_tensor();

        assert_eq!(tensor.dim(), (15, 4, FIELD_COUNT));
        assert_eq!(tensor[[3, 2, 1]], out.samples()[3].window[2].close);
        assert_eq!(out.label_vector().len(), 15);
    }
}
