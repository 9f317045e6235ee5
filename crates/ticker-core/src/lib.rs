#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for ticker ingestion.
//!
//! This crate provides the foundational abstractions shared by the providers,
//! the Parquet store and the ingestion pipeline:
//!
//! - [`UniverseProvider`](provider::UniverseProvider) - The ticker universe table
//! - [`PriceHistoryProvider`](provider::PriceHistoryProvider) - Daily price history
//! - [`PriceSchema`](schema::PriceSchema) - Fixed layout of per-ticker files
//! - [`TradingDataConfig`](config::TradingDataConfig) - Folder layout and sources

/// Folder layout and source configuration.
pub mod config;
/// Error types for data operations.
pub mod error;
/// Provider traits for fetching external data.
pub mod provider;
/// Fixed schema of per-ticker price files.
pub mod schema;
/// Core data types (Symbol, symbol normalization).
pub mod types;

// Re-export commonly used items at crate root
pub use config::{DEFAULT_TICKERS_COLUMN, DEFAULT_TICKERS_URL, PARQUET_EXTENSION, TradingDataConfig};
pub use error::{DataError, Result};
pub use provider::{DataProvider, HistoryRange, PriceHistoryProvider, UniverseProvider};
pub use schema::{PriceSchema, TICKER_COLUMN};
pub use types::{Symbol, normalize_symbol};
