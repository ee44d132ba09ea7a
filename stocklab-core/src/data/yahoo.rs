//! Yahoo Finance data provider.
//!
//! Fetches daily bars from the v8 chart API. One request per symbol; failed
//! requests are reported, not retried. Shanghai and Shenzhen listings use the
//! `.SS` and `.SZ` suffixes.

use super::provider::{DataError, DataProvider, DataSource, FetchResult};
use crate::domain::{Bar, StockSeries};
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<f64>>,
}

/// Yahoo Finance data provider.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl YahooProvider {
    pub fn new() -> Result<Self, DataError> {
        Self::with_base_url("https://query2.finance.yahoo.com")
    }

    /// Provider pointed at a different chart API host.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::NetworkUnreachable(format!("http client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn chart_url(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
        let end_ts = end
            .succ_opt()
            .unwrap_or(end)
            .and_time(chrono::NaiveTime::MIN)
            .and_utc()
            .timestamp();
        format!(
            "{}/v8/finance/chart/{symbol}?period1={start_ts}&period2={end_ts}&interval=1d",
            self.base_url
        )
    }
}

/// Parse a chart API response body into a series.
///
/// Rows without a close (suspended days) are dropped. Missing open/high/low
/// become NaN, missing volume becomes 0.
fn parse_chart(
    symbol: &str,
    body: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<StockSeries, DataError> {
    let resp: ChartResponse = serde_json::from_str(body).map_err(|e| {
        DataError::ResponseFormatChanged(format!("failed to parse response for {symbol}: {e}"))
    })?;

    let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
        Some(err) if err.code == "Not Found" => DataError::SymbolNotFound {
            symbol: symbol.to_string(),
        },
        Some(err) => DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description)),
        None => DataError::ResponseFormatChanged("empty result with no error".into()),
    })?;

    let data = result
        .into_iter()
        .next()
        .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;

    let no_data = || DataError::NoDataInRange {
        symbol: symbol.to_string(),
        start,
        end,
    };

    // A listed symbol with no trades in range comes back without timestamps.
    let timestamps = data.timestamp.ok_or_else(no_data)?;
    let offset = data.meta.and_then(|m| m.gmtoffset).unwrap_or(0);
    let quote = data
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| DataError::ResponseFormatChanged("no quote data".into()))?;

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let Some(close) = quote.close.get(i).copied().flatten() else {
            continue;
        };
        let date = chrono::DateTime::from_timestamp(ts + offset, 0)
            .map(|dt| dt.date_naive())
            .ok_or_else(|| DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}")))?;

        bars.push(Bar {
            date,
            open: quote.open.get(i).copied().flatten().unwrap_or(f64::NAN),
            close,
            high: quote.high.get(i).copied().flatten().unwrap_or(f64::NAN),
            low: quote.low.get(i).copied().flatten().unwrap_or(f64::NAN),
            volume: quote.volume.get(i).copied().flatten().unwrap_or(0.0),
        });
    }

    if bars.is_empty() {
        return Err(no_data());
    }
    let void = bars.iter().filter(|b| b.is_void()).count();
    if void > 0 {
        tracing::warn!("{symbol}: {void} of {} bars have missing prices", bars.len());
    }

    Ok(StockSeries::from_unsorted(symbol, bars)?)
}

impl DataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        let url = self.chart_url(symbol, start, end);
        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(DataError::RateLimited {
                retry_after_secs: retry_after,
            });
        }
        if !status.is_success() {
            return Err(DataError::Http {
                symbol: symbol.to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp
            .text()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;
        let series = parse_chart(symbol, &body, start, end)?;

        Ok(FetchResult {
            series,
            source: DataSource::YahooFinance,
        })
    }
}
