//! Provider traits for fetching external data.
//!
//! This module defines the traits implemented by external sources:
//!
//! - [`DataProvider`] - Base trait for all data providers
//! - [`UniverseProvider`] - The ticker universe table
//! - [`PriceHistoryProvider`] - Daily price history for one symbol

use async_trait::async_trait;
use chrono::NaiveDate;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::{
    error::{DataError, Result},
    types::Symbol,
};

/// Base trait for all data providers.
pub trait DataProvider: Send + Sync + Debug {
    /// Returns the name of this provider (e.g., "Yahoo Finance").
    fn name(&self) -> &str;

    /// Returns a description of this provider.
    fn description(&self) -> &str;
}

/// Provider for the ticker universe.
///
/// Implement this trait to supply the roster of tickers to ingest.
#[async_trait]
pub trait UniverseProvider: DataProvider {
    /// Fetches the universe as a table.
    ///
    /// The returned frame must contain the provider's symbol column. Symbols
    /// are returned as published; normalization happens in the pipeline.
    async fn fetch_universe(&self) -> Result<DataFrame>;

    /// Returns the name of the column that holds ticker symbols.
    fn symbol_column(&self) -> &str;
}

/// Date span to request from a price history provider.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryRange {
    /// Everything the provider has.
    #[default]
    Max,
    /// An inclusive calendar date range.
    Between {
        /// First day to include.
        start: NaiveDate,
        /// Last day to include.
        end: NaiveDate,
    },
}

impl HistoryRange {
    /// Checks that a bounded range is not inverted.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Between { start, end } if start > end => Err(DataError::InvalidParameter(
                format!("Start date {start} is after end date {end}"),
            )),
            _ => Ok(()),
        }
    }
}

/// Provider for daily price history.
///
/// Implement this trait to provide historical OHLCV data.
#[async_trait]
pub trait PriceHistoryProvider: DataProvider {
    /// Fetches daily history for a single symbol.
    ///
    /// Returns a DataFrame holding at least date, open, high, low, close and
    /// volume equivalents. A symbol without data yields a zero-row frame, not
    /// an error.
    async fn fetch_history(&self, symbol: &Symbol, range: HistoryRange) -> Result<DataFrame>;
}
