#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Ticker universe and daily price ingestion.
//!
//! This crate re-exports the core types, the Parquet store and the provider
//! implementations, and provides [`TradingData`], the ingestion pipeline.
//!
//! # Example
//!
//! ```rust,ignore
//! use ticker_data::{TradingData, TradingDataConfig};
//! use polars::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> ticker_data::Result<()> {
//!     let pipeline = TradingData::from_config(TradingDataConfig::new("data"))?;
//!
//!     let report = pipeline.download_all_tickers().await?;
//!     println!("{} written, {} failed", report.written.len(), report.failed.len());
//!
//!     let closes = pipeline
//!         .scan_prices(None, Some(vec![col("date"), col("close")]))?
//!         .collect()?;
//!     println!("{closes}");
//!
//!     Ok(())
//! }
//! ```

// Core types and traits
pub use ticker_core::*;

// Storage
pub use ticker_store::{
    PriceScan, TickerStore, WriteOutcome, list_price_files, scan_price_directory,
    scan_ticker_list, write_parquet,
};

// Providers
#[cfg(feature = "html")]
pub use ticker_html::HtmlTableProvider;
#[cfg(feature = "yahoo")]
pub use ticker_yahoo::YahooProvider;

mod pipeline;
pub use pipeline::{BatchReport, TradingData, normalize_symbol_column};
