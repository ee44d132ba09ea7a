//! Bar — one trading day of price data for a single stock.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Number of numeric fields carried by every bar.
pub const FIELD_COUNT: usize = 5;

/// Numeric fields of a bar, in feature-column order.
///
/// The order matches the daily k-line layout (`open, close, high, low, volume`)
/// and is the column order of every feature tensor built from bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Open,
    Close,
    High,
    Low,
    Volume,
}

impl Field {
    /// All fields in column order.
    pub const ALL: [Field; FIELD_COUNT] = [
        Field::Open,
        Field::Close,
        Field::High,
        Field::Low,
        Field::Volume,
    ];

    /// Column index of this field in a bar row.
    pub fn index(self) -> usize {
        match self {
            Field::Open => 0,
            Field::Close => 1,
            Field::High => 2,
            Field::Low => 3,
            Field::Volume => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Field::Open => "open",
            Field::Close => "close",
            Field::High => "high",
            Field::Low => "low",
            Field::Volume => "volume",
        }
    }
}

/// Daily OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    pub volume: f64,
}

impl Bar {
    /// Value of a single field.
    pub fn field(&self, field: Field) -> f64 {
        match field {
            Field::Open => self.open,
            Field::Close => self.close,
            Field::High => self.high,
            Field::Low => self.low,
            Field::Volume => self.volume,
        }
    }

    /// All numeric fields in column order.
    pub fn row(&self) -> [f64; FIELD_COUNT] {
        [self.open, self.close, self.high, self.low, self.volume]
    }

    /// Returns true if any price field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.close.is_nan() || self.high.is_nan() || self.low.is_nan()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar() -> Bar {
        Bar {
            date: NaiveDate::from_ymd_opt(2018, 1, 3).unwrap(),
            open: 12.6,
            close: 12.9,
            high: 13.1,
            low: 12.5,
            volume: 310_000.0,
        }
    }

    #[test]
    fn row_follows_field_order() {
        let bar = sample_bar();
        let row = bar.row();
        for field in Field::ALL {
            assert_eq!(row[field.index()], bar.field(field));
        }
        assert_eq!(row[Field::Close.index()], 12.9);
    }

    #[test]
    fn detects_void_bar() {
        let mut bar = sample_bar();
        assert!(!bar.is_void());
        bar.close = f64::NAN;
        assert!(bar.is_void());
    }

    #[test]
    fn bar_serialization_roundtrip() {
        let bar = sample_bar();
        let json = serde_json::to_string(&bar).unwrap();
        let deser: Bar = serde_json::from_str(&json).unwrap();
        assert_eq!(bar, deser);
    }
}
