//! Folder layout and source settings.
//!
//! [`TradingDataConfig`] is passed explicitly to the store and the pipeline.
//! It can be built in code with the `with_*` setters or loaded from TOML:
//!
//! ```toml
//! data_folder = "/var/lib/trading"
//! yfinance_files_folder = "yfinance"
//! tickers_file_name = "tickers.parquet"
//! tickers_column = "Symbol"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{
    error::{DataError, Result},
    provider::HistoryRange,
    types::Symbol,
};

/// Wikipedia list of S&P 500 constituents.
pub const DEFAULT_TICKERS_URL: &str = "https://en.wikipedia.org/wiki/List_of_S%26P_500_companies";

/// Column of the constituents table that holds ticker symbols.
pub const DEFAULT_TICKERS_COLUMN: &str = "Symbol";

/// Extension of every file written by the store.
pub const PARQUET_EXTENSION: &str = "parquet";

const DEFAULT_FILES_FOLDER: &str = "yfinance";
const DEFAULT_TICKERS_FILE: &str = "tickers.parquet";

/// Configuration for ingestion and retrieval.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingDataConfig {
    /// Root directory holding every persisted file.
    pub data_folder: PathBuf,
    /// Subdirectory of `data_folder` with one Parquet file per ticker.
    pub yfinance_files_folder: String,
    /// File name of the ticker table inside `data_folder`.
    pub tickers_file_name: String,
    /// Column of the ticker table that holds symbols. Used to build the
    /// default universe provider.
    pub tickers_column: String,
    /// Page whose first HTML table is the ticker universe. Used to build the
    /// default universe provider.
    pub tickers_url: String,
    /// Span of history requested for every ticker.
    pub history: HistoryRange,
}

impl Default for TradingDataConfig {
    fn default() -> Self {
        Self {
            data_folder: PathBuf::from("data"),
            yfinance_files_folder: DEFAULT_FILES_FOLDER.to_string(),
            tickers_file_name: DEFAULT_TICKERS_FILE.to_string(),
            tickers_column: DEFAULT_TICKERS_COLUMN.to_string(),
            tickers_url: DEFAULT_TICKERS_URL.to_string(),
            history: HistoryRange::Max,
        }
    }
}

impl TradingDataConfig {
    /// Creates a configuration rooted at `data_folder` with default names.
    #[must_use]
    pub fn new(data_folder: impl Into<PathBuf>) -> Self {
        Self {
            data_folder: data_folder.into(),
            ..Default::default()
        }
    }

    /// Parses a configuration from TOML text. Missing keys take defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| DataError::Config(e.to_string()))
    }

    /// Loads a configuration from a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| DataError::io(path, e))?;
        Self::from_toml_str(&text)
    }

    /// Sets the per-ticker subdirectory name.
    #[must_use]
    pub fn with_files_folder(mut self, folder: impl Into<String>) -> Self {
        self.yfinance_files_folder = folder.into();
        self
    }

    /// Sets the ticker table file name.
    #[must_use]
    pub fn with_tickers_file_name(mut self, name: impl Into<String>) -> Self {
        self.tickers_file_name = name.into();
        self
    }

    /// Sets the symbol column name.
    #[must_use]
    pub fn with_tickers_column(mut self, column: impl Into<String>) -> Self {
        self.tickers_column = column.into();
        self
    }

    /// Sets the universe page URL.
    #[must_use]
    pub fn with_tickers_url(mut self, url: impl Into<String>) -> Self {
        self.tickers_url = url.into();
        self
    }

    /// Sets the requested history span.
    #[must_use]
    pub const fn with_history(mut self, history: HistoryRange) -> Self {
        self.history = history;
        self
    }

    /// Directory holding the per-ticker files.
    #[must_use]
    pub fn ticker_folder(&self) -> PathBuf {
        self.data_folder.join(&self.yfinance_files_folder)
    }

    /// Location of the ticker table file.
    #[must_use]
    pub fn ticker_list_file(&self) -> PathBuf {
        self.data_folder.join(&self.tickers_file_name)
    }

    /// Location of the price file for `symbol`.
    #[must_use]
    pub fn price_file(&self, symbol: &Symbol) -> PathBuf {
        self.ticker_folder()
            .join(format!("{}.{PARQUET_EXTENSION}", symbol.as_str()))
    }
}
