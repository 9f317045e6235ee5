//! Parquet file writing.

use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use ticker_core::{DataError, Result};
use tracing::debug;

/// Result of a write request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The frame was written to `path`.
    Written {
        /// Final location of the file.
        path: PathBuf,
        /// Number of rows written.
        rows: usize,
    },
    /// The frame had no rows; nothing was written.
    Empty,
}

impl WriteOutcome {
    /// Returns true if a file was written.
    #[must_use]
    pub const fn is_written(&self) -> bool {
        matches!(self, Self::Written { .. })
    }
}

/// Writes `df` to `path` as Parquet, replacing any existing file.
///
/// Zero-row frames are skipped and reported as [`WriteOutcome::Empty`]. The
/// parent directory is created if needed. Data goes to `<path>.tmp` first
/// and is renamed into place, so `path` never holds a partial file.
///
/// # Errors
/// Returns [`DataError::Persistence`] if the directory, the temporary file or
/// the rename fails.
pub fn write_parquet(df: &DataFrame, path: &Path) -> Result<WriteOutcome> {
    if df.height() == 0 {
        return Ok(WriteOutcome::Empty);
    }

    let persistence = |message: String| DataError::Persistence {
        path: path.to_path_buf(),
        message,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| persistence(format!("create dir: {e}")))?;
    }

    let tmp_path = temporary_path(path).ok_or_else(|| persistence("not a file path".into()))?;

    let file = fs::File::create(&tmp_path).map_err(|e| persistence(format!("create file: {e}")))?;
    if let Err(e) = ParquetWriter::new(file).finish(&mut df.clone()) {
        let _ = fs::remove_file(&tmp_path);
        return Err(persistence(format!("write parquet: {e}")));
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        persistence(format!("atomic rename failed: {e}"))
    })?;

    debug!(path = %path.display(), rows = df.height(), "Wrote parquet file");
    Ok(WriteOutcome::Written {
        path: path.to_path_buf(),
        rows: df.height(),
    })
}

fn temporary_path(path: &Path) -> Option<PathBuf> {
    let mut name = path.file_name()?.to_os_string();
    name.push(".tmp");
    Some(path.with_file_name(name))
}
