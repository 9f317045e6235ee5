//! Lazy retrieval over persisted Parquet files.
//!
//! Scans are built eagerly from the directory listing, but no file content is
//! read until the returned [`LazyFrame`] is collected. Missing, unreadable or
//! mismatched files therefore fail at collection time.

use polars::prelude::*;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use ticker_core::{DataError, PARQUET_EXTENSION, PriceSchema, Result, TICKER_COLUMN};
use tracing::{debug, warn};

/// Builder for a combined scan over a directory of per-ticker price files.
///
/// ```no_run
/// use polars::prelude::*;
/// use ticker_store::PriceScan;
///
/// # fn example() -> ticker_core::Result<()> {
/// let prices = PriceScan::new("data/yfinance")
///     .filter(col("close").gt(lit(100.0)))
///     .select([col("date"), col("close")])
///     .finish()?
///     .collect()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct PriceScan {
    directory: PathBuf,
    predicate: Option<Expr>,
    projection: Option<Vec<Expr>>,
}

impl PriceScan {
    /// Scan every price file in `directory`, all rows and columns.
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            predicate: None,
            projection: None,
        }
    }

    /// Keep only rows matching `predicate`. Repeated calls are combined with AND.
    #[must_use]
    pub fn filter(mut self, predicate: Expr) -> Self {
        self.predicate = Some(match self.predicate.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    /// Keep only the given columns. The `ticker` column is always appended.
    #[must_use]
    pub fn select<E: AsRef<[Expr]>>(mut self, projection: E) -> Self {
        self.projection = Some(projection.as_ref().to_vec());
        self
    }

    /// The directory being scanned.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Builds the combined lazy frame.
    ///
    /// # Errors
    /// Returns [`DataError::Io`] if the directory exists but cannot be listed.
    pub fn finish(self) -> Result<LazyFrame> {
        scan_price_directory(&self.directory, self.predicate, self.projection)
    }
}

/// Builds one lazy frame over every `*.parquet` file directly in `directory`.
///
/// For each file the predicate is applied, then the projection, then a
/// `ticker` column holding the file stem is appended. The per-file frames are
/// concatenated in path order. A directory without price files, or one that
/// does not exist, yields an empty frame with the projected price columns and
/// `ticker`.
///
/// # Errors
/// Returns [`DataError::Io`] if the directory exists but cannot be listed, or
/// [`DataError::Polars`] if a scan cannot be planned.
pub fn scan_price_directory(
    directory: impl AsRef<Path>,
    predicate: Option<Expr>,
    projection: Option<Vec<Expr>>,
) -> Result<LazyFrame> {
    let directory = directory.as_ref();
    let files = list_price_files(directory)?;

    if files.is_empty() {
        debug!(directory = %directory.display(), "No price files to scan");
        let empty = PriceSchema::empty_frame().lazy();
        let empty = shape(empty, predicate.as_ref(), projection.as_deref());
        return Ok(empty.with_column(lit(NULL).cast(DataType::String).alias(TICKER_COLUMN)));
    }

    let mut frames = Vec::with_capacity(files.len());
    for (ticker, path) in &files {
        let scan = LazyFrame::scan_parquet(path, ScanArgsParquet::default())?;
        let scan = shape(scan, predicate.as_ref(), projection.as_deref());
        frames.push(scan.with_column(lit(ticker.as_str()).alias(TICKER_COLUMN)));
    }

    debug!(
        directory = %directory.display(),
        files = frames.len(),
        "Planned combined price scan"
    );
    Ok(concat(frames, UnionArgs::default())?)
}

/// Builds a lazy frame over the ticker table file at `path`.
///
/// No filter or projection is applied. A missing file is reported when the
/// frame is collected.
///
/// # Errors
/// Returns [`DataError::Polars`] if the scan cannot be planned.
pub fn scan_ticker_list(path: impl AsRef<Path>) -> Result<LazyFrame> {
    Ok(LazyFrame::scan_parquet(
        path.as_ref(),
        ScanArgsParquet::default(),
    )?)
}

/// Lists `(ticker, path)` for every price file directly in `directory`,
/// sorted by path.
///
/// A missing directory has no files.
///
/// # Errors
/// Returns [`DataError::Io`] for any other listing failure.
pub fn list_price_files(directory: &Path) -> Result<Vec<(String, PathBuf)>> {
    let entries = match fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(DataError::io(directory, e)),
    };

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| DataError::io(directory, e))?.path();

        if path.extension().and_then(|e| e.to_str()) != Some(PARQUET_EXTENSION) || !path.is_file() {
            continue;
        }

        match path.file_stem().and_then(|s| s.to_str()) {
            Some(stem) if !stem.is_empty() => files.push((stem.to_string(), path)),
            _ => warn!(path = %path.display(), "Skipping price file without a usable name"),
        }
    }

    files.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(files)
}

fn shape(frame: LazyFrame, predicate: Option<&Expr>, projection: Option<&[Expr]>) -> LazyFrame {
    let frame = match predicate {
        Some(predicate) => frame.filter(predicate.clone()),
        None => frame,
    };
    match projection {
        Some(columns) => frame.select(columns),
        None => frame,
    }
}
