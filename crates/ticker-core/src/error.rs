//! Error types for ingestion and retrieval.
//!
//! This module defines [`DataError`] which covers every failure that can occur
//! while fetching the ticker universe, downloading price history, writing
//! Parquet files or building lazy scans over them.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during data operations.
#[derive(Error, Debug)]
pub enum DataError {
    /// Network-related errors (connection failures, timeouts, HTTP status).
    #[error("Network error: {0}")]
    Network(String),

    /// Rate limit exceeded by a provider.
    #[error("Rate limited by {provider}: retry after {retry_after:?}")]
    RateLimited {
        /// The provider that rate limited the request.
        provider: String,
        /// Suggested time to wait before retrying.
        retry_after: Option<std::time::Duration>,
    },

    /// The requested symbol was not found.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// Error parsing data from a provider.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A table is missing a column that the caller requires.
    #[error("Column '{column}' not found in {table}")]
    MissingColumn {
        /// Description of the table that was inspected.
        table: String,
        /// The column that was expected.
        column: String,
    },

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Filesystem error outside of a Parquet write.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// The path being accessed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Writing a Parquet file failed.
    #[error("Failed to persist {}: {message}", path.display())]
    Persistence {
        /// Destination of the write.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// Error raised by polars while building or transforming a frame.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// The configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl DataError {
    /// Builds an [`DataError::Io`] for the given path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns true if the error came from an external source rather than
    /// from local persistence.
    #[must_use]
    pub const fn is_source_error(&self) -> bool {
        matches!(
            self,
            Self::Network(_)
                | Self::RateLimited { .. }
                | Self::SymbolNotFound(_)
                | Self::Parse(_)
                | Self::MissingColumn { .. }
        )
    }
}

/// Result type alias using [`DataError`].
pub type Result<T> = std::result::Result<T, DataError>;
