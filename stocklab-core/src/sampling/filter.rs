//! Length filters applied before sampling.
//!
//! Both filters drop series silently. A series that is too short or covers a
//! partial period (listed or delisted mid-period) is expected input, not an
//! error. The two thresholds differ on purpose: rolling sampling wants exactly
//! one full period, the feature/label split only needs enough rows for its
//! fixed window and lookahead label.

use crate::domain::StockSeries;

/// Trading days in one full sampling period (2018-01-03 .. 2018-05-25 on the
/// Shanghai/Shenzhen calendar).
pub const EXPECTED_SERIES_LEN: usize = 94;

/// Default rolling window length.
pub const DEFAULT_WINDOW_LEN: usize = 10;

/// Minimum rows a series needs to enter the feature/label split.
pub const MIN_SPLIT_SERIES_LEN: usize = 20;

/// Rows `[0, SPLIT_WINDOW_LEN)` form the split's feature block.
pub const SPLIT_WINDOW_LEN: usize = 10;

/// Row whose close is the split's raw label: one past the window plus a
/// one-row gap.
pub const SPLIT_LABEL_INDEX: usize = 11;

// The split filter must always leave the label row in range.
const _: () = assert!(MIN_SPLIT_SERIES_LEN > SPLIT_LABEL_INDEX);
const _: () = assert!(SPLIT_LABEL_INDEX >= SPLIT_WINDOW_LEN);

/// True when the series covers exactly one full period.
pub fn is_full_period(series: &StockSeries, expected_len: usize) -> bool {
    series.len() == expected_len
}

/// True when the series has at least `min_len` rows.
pub fn has_min_history(series: &StockSeries, min_len: usize) -> bool {
    series.len() >= min_len
}
