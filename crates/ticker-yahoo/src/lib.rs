#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Yahoo Finance data provider.
//!
//! This crate provides a Yahoo Finance data provider that implements the
//! [`DataProvider`] and [`PriceHistoryProvider`] traits from `ticker-core`.
//!
//! # Features
//!
//! - Fetch daily OHLCV history using Yahoo Finance's chart API
//! - Full history (`range=max`) or an explicit date range
//! - Built-in rate limiting (1 request per second by default)
//! - Trading days computed in the exchange's local time
//!
//! # Example
//!
//! ```no_run
//! use ticker_yahoo::YahooProvider;
//! use ticker_core::{HistoryRange, PriceHistoryProvider, Symbol};
//!
//! # async fn example() -> ticker_core::Result<()> {
//! let provider = YahooProvider::new()?;
//! let symbol = Symbol::new("AAPL");
//!
//! let df = provider.fetch_history(&symbol, HistoryRange::Max).await?;
//! println!("Fetched {} rows", df.height());
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use polars::prelude::*;
use serde::Deserialize;
use ticker_core::{DataError, DataProvider, HistoryRange, PriceHistoryProvider, Result, Symbol};
use tokio::time::sleep;
use tracing::debug;

/// Yahoo Finance chart API base URL.
const CHART_API_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Default rate limit delay in milliseconds.
const DEFAULT_RATE_LIMIT_MS: u64 = 1000;

/// User agent for HTTP requests.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

const SECONDS_PER_DAY: i64 = 86_400;

/// Yahoo Finance data provider.
///
/// Implements [`DataProvider`] and [`PriceHistoryProvider`].
#[derive(Debug)]
pub struct YahooProvider {
    client: reqwest::Client,
    rate_limit_ms: u64,
    last_request_time: AtomicU64,
}

impl YahooProvider {
    /// Create a new Yahoo Finance provider with default settings.
    ///
    /// Uses built-in rate limiting of 1 request per second.
    ///
    /// # Errors
    /// Returns [`DataError::Network`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self> {
        Self::with_rate_limit(Duration::from_millis(DEFAULT_RATE_LIMIT_MS))
    }

    /// Create a new Yahoo Finance provider with a custom HTTP client.
    ///
    /// Uses the provided client for all HTTP requests. Rate limiting
    /// is still applied.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            rate_limit_ms: DEFAULT_RATE_LIMIT_MS,
            last_request_time: AtomicU64::new(0),
        }
    }

    /// Create a new Yahoo Finance provider with custom rate limiting.
    ///
    /// # Errors
    /// Returns [`DataError::Network`] if the HTTP client cannot be built.
    pub fn with_rate_limit(rate_limit: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DataError::Network(e.to_string()))?;

        Ok(Self {
            client,
            rate_limit_ms: rate_limit.as_millis() as u64,
            last_request_time: AtomicU64::new(0),
        })
    }

    /// Apply rate limiting before making a request.
    async fn apply_rate_limit(&self) {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        let last = self.last_request_time.load(Ordering::Relaxed);
        let elapsed = now.saturating_sub(last);

        if elapsed < self.rate_limit_ms {
            let wait_time = self.rate_limit_ms - elapsed;
            debug!("Rate limiting: waiting {}ms", wait_time);
            sleep(Duration::from_millis(wait_time)).await;
        }

        self.last_request_time.store(
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64,
            Ordering::Relaxed,
        );
    }

    /// Build the chart API URL for a symbol and history range.
    fn build_chart_url(&self, symbol: &Symbol, range: HistoryRange) -> String {
        let span = match range {
            HistoryRange::Max => "range=max".to_string(),
            HistoryRange::Between { start, end } => {
                let start_ts = start
                    .and_hms_opt(0, 0, 0)
                    .map(|dt| Utc.from_utc_datetime(&dt).timestamp())
                    .unwrap_or(0);

                let end_ts = end
                    .and_hms_opt(23, 59, 59)
                    .map(|dt| Utc.from_utc_datetime(&dt).timestamp())
                    .unwrap_or(0);

                format!("period1={start_ts}&period2={end_ts}")
            }
        };

        format!(
            "{}/{}?{}&interval=1d",
            CHART_API_URL,
            symbol.as_str(),
            span
        )
    }

    /// Parse Yahoo Finance chart response into a DataFrame.
    fn parse_chart_response(&self, symbol: &Symbol, response: ChartResponse) -> Result<DataFrame> {
        // Check for API-level errors
        if let Some(error) = response.chart.error {
            if error.code == "Not Found" {
                return Err(DataError::SymbolNotFound(symbol.to_string()));
            }
            return Err(DataError::Other(format!(
                "{}: {}",
                error.code, error.description
            )));
        }

        let Some(result) = response.chart.result.and_then(|r| r.into_iter().next()) else {
            return Ok(empty_history());
        };

        let timestamps = result.timestamp.unwrap_or_default();
        if timestamps.is_empty() {
            debug!(symbol = %symbol, "Chart response has no timestamps");
            return Ok(empty_history());
        }

        let quote = result
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| DataError::Parse("Missing quote data".to_string()))?;

        let n = timestamps.len();
        for (field, len) in [
            ("open", quote.open.len()),
            ("high", quote.high.len()),
            ("low", quote.low.len()),
            ("close", quote.close.len()),
            ("volume", quote.volume.len()),
        ] {
            if len != n {
                return Err(DataError::Parse(format!(
                    "{symbol}: {field} has {len} values for {n} timestamps"
                )));
            }
        }

        // Trading days in exchange-local time, as days since the Unix epoch
        let offset = result.meta.and_then(|m| m.gmtoffset).unwrap_or(0);
        let dates: Vec<i32> = timestamps
            .iter()
            .map(|&ts| (ts + offset).div_euclid(SECONDS_PER_DAY) as i32)
            .collect();

        let date_col = Column::new("date".into(), dates).cast(&DataType::Date)?;

        let df = DataFrame::new(vec![
            date_col,
            Column::new("open".into(), quote.open),
            Column::new("high".into(), quote.high),
            Column::new("low".into(), quote.low),
            Column::new("close".into(), quote.close),
            Column::new("volume".into(), quote.volume),
        ])?;

        Ok(df)
    }
}

/// Zero-row frame with the columns this provider returns.
fn empty_history() -> DataFrame {
    DataFrame::empty_with_schema(&Schema::from_iter([
        Field::new("date".into(), DataType::Date),
        Field::new("open".into(), DataType::Float64),
        Field::new("high".into(), DataType::Float64),
        Field::new("low".into(), DataType::Float64),
        Field::new("close".into(), DataType::Float64),
        Field::new("volume".into(), DataType::UInt64),
    ]))
}

impl DataProvider for YahooProvider {
    fn name(&self) -> &str {
        "Yahoo Finance"
    }

    fn description(&self) -> &str {
        "Yahoo Finance daily price history"
    }
}

#[async_trait]
impl PriceHistoryProvider for YahooProvider {
    async fn fetch_history(&self, symbol: &Symbol, range: HistoryRange) -> Result<DataFrame> {
        range.validate()?;

        // Apply rate limiting
        self.apply_rate_limit().await;

        let url = self.build_chart_url(symbol, range);
        debug!("Fetching history: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| DataError::Network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(DataError::RateLimited {
                provider: "Yahoo Finance".to_string(),
                retry_after: Some(Duration::from_secs(60)),
            });
        }

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(DataError::SymbolNotFound(symbol.to_string()));
        }

        if !response.status().is_success() {
            return Err(DataError::Network(format!(
                "HTTP {} for {}",
                response.status(),
                symbol
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| DataError::Network(e.to_string()))?;

        let chart_response: ChartResponse =
            serde_json::from_str(&body).map_err(|e| DataError::Parse(format!("{symbol}: {e}")))?;

        self.parse_chart_response(symbol, chart_response)
    }
}

// ============================================================================
// Yahoo Finance API Response Types
// ============================================================================

/// Chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
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
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}
