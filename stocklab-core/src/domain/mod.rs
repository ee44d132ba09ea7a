//! Domain types: bars and per-stock series.

pub mod bar;
pub mod series;

pub use bar::{Bar, Field, FIELD_COUNT};
pub use series::{SeriesError, StockSeries};
