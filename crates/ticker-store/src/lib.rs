#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Parquet storage for ticker tables and price series.
//!
//! - [`TickerStore`] - Writes and scans the folders of a `TradingDataConfig`
//! - [`write_parquet`] - Atomic Parquet write that skips empty frames
//! - [`scan_price_directory`] / [`PriceScan`] - Lazy union of per-ticker files
//! - [`scan_ticker_list`] - Lazy scan of the ticker table

/// Lazy retrieval.
pub mod scan;
/// Folder-aware store.
pub mod store;
/// Parquet writing.
pub mod writer;

pub use scan::{PriceScan, list_price_files, scan_price_directory, scan_ticker_list};
pub use store::TickerStore;
pub use writer::{WriteOutcome, write_parquet};
