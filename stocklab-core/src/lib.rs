//! StockLab Core — stock series, rolling-window sampling, feature/label split.
//!
//! This crate contains:
//! - Domain types (bars, per-stock series with strictly increasing dates)
//! - The sampling core: rolling windows and the above-mean feature/label split
//! - Data acquisition: provider trait, Yahoo and synthetic providers
//! - Parquet cache keyed by symbol and the parallel downloader

pub mod data;
pub mod domain;
pub mod sampling;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: types handed to worker threads are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::StockSeries>();
        require_sync::<domain::StockSeries>();

        require_send::<data::SeriesCache>();
        require_sync::<data::SeriesCache>();
        require_send::<data::YahooProvider>();
        require_sync::<data::YahooProvider>();
        require_send::<data::SyntheticProvider>();
        require_sync::<data::SyntheticProvider>();
        require_send::<data::DataError>();
        require_sync::<data::DataError>();

        require_send::<sampling::WindowSampler>();
        require_sync::<sampling::WindowSampler>();
        require_send::<sampling::SplitOutput>();
        require_sync::<sampling::SplitOutput>();
    }

    /// The sampling core runs on plain series slices, with no provider or
    /// cache in scope.
    #[test]
    fn sampling_runs_on_plain_series() {
        fn sample_counts(universe: &[domain::StockSeries]) -> (usize, usize) {
            let rolling = sampling::WindowSampler::default().sample(universe).len();
            let split = sampling::FeatureLabelSplitter::split(
                universe,
                sampling::TensorLayout::BatchMajor,
            )
            .map(|(features, _)| features.dim().0)
            .unwrap_or(0);
            (rolling, split)
        }

        let start = chrono::NaiveDate::from_ymd_opt(2018, 1, 3).unwrap();
        let end = start + chrono::Duration::days(200);
        let series = |symbol: &str, len: usize| {
            let mut bars = data::synthetic::synthetic_bars(symbol, start, end);
            bars.truncate(len);
            domain::StockSeries::new(symbol, bars).unwrap()
        };

        let universe = vec![
            series("600000.SS", sampling::EXPECTED_SERIES_LEN),
            series("000001.SZ", 30),
        ];
        // Only the full-period series is rolled; both are long enough to split.
        assert_eq!(sample_counts(&universe), (83, 2));
        assert_eq!(sample_counts(&[]), (0, 0));
    }
}
