//! Folder-aware persistence for the ticker pipeline.

use polars::prelude::*;
use ticker_core::{PriceSchema, Result, Symbol, TradingDataConfig};
use tracing::{debug, info, instrument};

use crate::{
    scan::{PriceScan, scan_price_directory, scan_ticker_list},
    writer::{WriteOutcome, write_parquet},
};

/// Reads and writes the files described by a [`TradingDataConfig`].
#[derive(Debug, Clone)]
pub struct TickerStore {
    config: TradingDataConfig,
}

impl TickerStore {
    /// Creates a store over the folders of `config`.
    #[must_use]
    pub const fn new(config: TradingDataConfig) -> Self {
        Self { config }
    }

    /// The folder layout used by this store.
    #[must_use]
    pub const fn config(&self) -> &TradingDataConfig {
        &self.config
    }

    /// Persists the ticker table to the configured ticker list file.
    ///
    /// An empty table leaves any existing file untouched.
    ///
    /// # Errors
    /// Returns [`ticker_core::DataError::Persistence`] if the write fails.
    #[instrument(skip(self, table), fields(rows = table.height()))]
    pub fn save_ticker_table(&self, table: &DataFrame) -> Result<WriteOutcome> {
        let path = self.config.ticker_list_file();
        let outcome = write_parquet(table, &path)?;

        match &outcome {
            WriteOutcome::Written { path, rows } => {
                info!(path = %path.display(), rows, "Saved ticker table");
            }
            WriteOutcome::Empty => info!("Ticker table has no rows, nothing saved"),
        }
        Ok(outcome)
    }

    /// Persists one ticker's price history as `<ticker folder>/<SYMBOL>.parquet`.
    ///
    /// The frame is conformed to [`PriceSchema`] first. An empty frame is not
    /// written.
    ///
    /// # Errors
    /// Returns [`ticker_core::DataError::MissingColumn`] if the frame lacks a
    /// price column, or [`ticker_core::DataError::Persistence`] if the write
    /// fails.
    #[instrument(skip(self, symbol, prices), fields(symbol = %symbol, rows = prices.height()))]
    pub fn save_price_series(&self, symbol: &Symbol, prices: &DataFrame) -> Result<WriteOutcome> {
        if prices.height() == 0 {
            debug!("No price rows to save");
            return Ok(WriteOutcome::Empty);
        }

        let conformed = PriceSchema::conform(prices)?;
        write_parquet(&conformed, &self.config.price_file(symbol))
    }

    /// Lazily scans every stored price file.
    ///
    /// See [`scan_price_directory`].
    ///
    /// # Errors
    /// Returns [`ticker_core::DataError::Io`] if the ticker folder cannot be
    /// listed.
    pub fn scan_prices(
        &self,
        predicate: Option<Expr>,
        projection: Option<Vec<Expr>>,
    ) -> Result<LazyFrame> {
        scan_price_directory(self.config.ticker_folder(), predicate, projection)
    }

    /// Starts a [`PriceScan`] over the ticker folder.
    #[must_use]
    pub fn price_scan(&self) -> PriceScan {
        PriceScan::new(self.config.ticker_folder())
    }

    /// Lazily scans the stored ticker table.
    ///
    /// # Errors
    /// Returns [`ticker_core::DataError::Polars`] if the scan cannot be planned.
    pub fn scan_ticker_list(&self) -> Result<LazyFrame> {
        scan_ticker_list(self.config.ticker_list_file())
    }
}
