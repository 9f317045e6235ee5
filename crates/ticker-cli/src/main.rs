//! `ticker-data` command line.
//!
//! Commands:
//! - `download` - fetch the ticker universe and every ticker's daily history
//! - `scan` - print the combined price files, optionally filtered
//! - `tickers` - print the saved ticker table

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use polars::prelude::*;
use std::path::PathBuf;
use ticker_data::{TradingData, TradingDataConfig, scan_price_directory, scan_ticker_list};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Debug, Parser)]
#[command(
    name = "ticker-data",
    about = "Download ticker price history to Parquet and query it"
)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Root data folder, overriding the configuration.
    #[arg(long, global = true)]
    data_folder: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch the ticker table and download daily history for every ticker.
    Download {
        /// First day of history (YYYY-MM-DD). Full history when omitted.
        #[arg(long, requires = "end")]
        start: Option<NaiveDate>,

        /// Last day of history (YYYY-MM-DD).
        #[arg(long, requires = "start")]
        end: Option<NaiveDate>,
    },
    /// Print the combined per-ticker price files.
    Scan {
        /// Keep rows on or after this day (YYYY-MM-DD).
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Keep rows on or before this day (YYYY-MM-DD).
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Columns to keep, comma separated (e.g. date,close).
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,

        /// Directory to scan. Defaults to the configured ticker folder.
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Print the saved ticker table.
    Tickers {
        /// Ticker table file. Defaults to the configured location.
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config, cli.data_folder)?;

    match cli.command {
        Commands::Download { start, end } => run_download(config, start, end).await,
        Commands::Scan {
            start,
            end,
            columns,
            dir,
        } => run_scan(&config, start, end, &columns, dir),
        Commands::Tickers { file } => run_tickers(&config, file),
    }
}

fn load_config(path: Option<PathBuf>, data_folder: Option<PathBuf>) -> Result<TradingDataConfig> {
    let mut config = match path {
        Some(path) => TradingDataConfig::from_path(&path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => TradingDataConfig::default(),
    };
    if let Some(folder) = data_folder {
        config.data_folder = folder;
    }
    Ok(config)
}

async fn run_download(
    config: TradingDataConfig,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<()> {
    let config = match (start, end) {
        (Some(start), Some(end)) => {
            config.with_history(ticker_data::HistoryRange::Between { start, end })
        }
        _ => config,
    };
    config.history.validate()?;

    let pipeline = TradingData::from_config(config)?;
    let report = pipeline
        .download_all_tickers()
        .await
        .context("ticker universe could not be obtained")?;

    for (symbol, error) in &report.failed {
        warn!(symbol = %symbol, error = %error, "Ticker not downloaded");
    }
    info!(
        written = report.written.len(),
        empty = report.empty.len(),
        failed = report.failed.len(),
        "Download complete"
    );
    Ok(())
}

fn run_scan(
    config: &TradingDataConfig,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    columns: &[String],
    dir: Option<PathBuf>,
) -> Result<()> {
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            bail!("--start {start} is after --end {end}");
        }
    }

    let predicate = date_predicate(start, end);
    let projection = (!columns.is_empty())
        .then(|| columns.iter().map(|name| col(name.as_str())).collect());
    let dir = dir.unwrap_or_else(|| config.ticker_folder());

    let prices = scan_price_directory(&dir, predicate, projection)?
        .collect()
        .with_context(|| format!("reading price files in {}", dir.display()))?;

    println!("{prices}");
    Ok(())
}

fn run_tickers(config: &TradingDataConfig, file: Option<PathBuf>) -> Result<()> {
    let file = file.unwrap_or_else(|| config.ticker_list_file());
    let tickers = scan_ticker_list(&file)?
        .collect()
        .with_context(|| format!("reading ticker table {}", file.display()))?;

    println!("{tickers}");
    Ok(())
}

fn date_predicate(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Option<Expr> {
    let lower = start.map(|start| col("date").gt_eq(lit(start)));
    let upper = end.map(|end| col("date").lt_eq(lit(end)));

    match (lower, upper) {
        (Some(lower), Some(upper)) => Some(lower.and(upper)),
        (lower, upper) => lower.or(upper),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scan_arguments() {
        let cli = Cli::try_parse_from([
            "ticker-data",
            "--data-folder",
            "/srv/trading",
            "scan",
            "--start",
            "2024-01-02",
            "--columns",
            "date,close",
        ])
        .unwrap();

        assert_eq!(cli.data_folder, Some(PathBuf::from("/srv/trading")));
        match cli.command {
            Commands::Scan { start, columns, .. } => {
                assert_eq!(start, NaiveDate::from_ymd_opt(2024, 1, 2));
                assert_eq!(columns, ["date", "close"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_download_range_requires_both_ends() {
        let parsed = Cli::try_parse_from(["ticker-data", "download", "--start", "2024-01-02"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_data_folder_overrides_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "data_folder = \"/from/file\"\ntickers_column = \"Ticker\"\n")
            .unwrap();

        let config = load_config(Some(path), Some(PathBuf::from("/override"))).unwrap();

        assert_eq!(config.data_folder, PathBuf::from("/override"));
        assert_eq!(config.tickers_column, "Ticker");
    }

    #[test]
    fn test_date_predicate() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 2);
        assert!(date_predicate(None, None).is_none());
        assert!(date_predicate(day, None).is_some());
        assert!(date_predicate(None, day).is_some());
        assert!(date_predicate(day, day).is_some());
    }
}
