//! Ingestion pipeline: universe, ticker table, per-ticker price files.

use std::sync::Arc;

use polars::prelude::*;
use tracing::{debug, info, warn};

use ticker_core::{
    DataError, PriceHistoryProvider, Result, Symbol, TradingDataConfig, UniverseProvider,
    normalize_symbol,
};
use ticker_store::{PriceScan, TickerStore, WriteOutcome};

/// Number of symbols between progress log lines.
const PROGRESS_INTERVAL: usize = 100;

/// Outcome of a batch of per-ticker downloads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Symbols processed, whatever the outcome.
    pub attempted: usize,
    /// Symbols whose price file was written.
    pub written: Vec<Symbol>,
    /// Symbols for which the provider returned no rows.
    pub empty: Vec<Symbol>,
    /// Symbols that failed, with the error message.
    pub failed: Vec<(Symbol, String)>,
}

impl BatchReport {
    /// Returns true if no symbol failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// Symbols that failed, in processing order.
    #[must_use]
    pub fn failed_symbols(&self) -> Vec<Symbol> {
        self.failed.iter().map(|(symbol, _)| symbol.clone()).collect()
    }
}

/// Ingestion pipeline over a universe provider, a price provider and a store.
///
/// Symbols are processed one at a time, in universe order. A failure for one
/// symbol is logged and recorded; only a failure to obtain the universe
/// aborts a run.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use ticker_data::{HtmlTableProvider, TradingData, TradingDataConfig, YahooProvider};
///
/// let config = TradingDataConfig::new("/srv/trading");
/// let pipeline = TradingData::new(
///     config,
///     Arc::new(HtmlTableProvider::sp500()?),
///     Arc::new(YahooProvider::new()?),
/// );
/// let report = pipeline.download_all_tickers().await?;
/// ```
pub struct TradingData {
    universe: Arc<dyn UniverseProvider>,
    prices: Arc<dyn PriceHistoryProvider>,
    store: TickerStore,
}

impl std::fmt::Debug for TradingData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TradingData")
            .field("universe", &self.universe.name())
            .field("prices", &self.prices.name())
            .field("store", &self.store)
            .finish()
    }
}

impl TradingData {
    /// Create a pipeline from explicit providers.
    ///
    /// The universe provider decides the page and the symbol column;
    /// `tickers_url` and `tickers_column` of `config` are only read by
    /// [`TradingData::from_config`]. A provider whose symbol column differs
    /// from the configured one is logged.
    #[must_use]
    pub fn new(
        config: TradingDataConfig,
        universe: Arc<dyn UniverseProvider>,
        prices: Arc<dyn PriceHistoryProvider>,
    ) -> Self {
        debug!(
            universe = universe.name(),
            prices = prices.name(),
            data_folder = %config.data_folder.display(),
            "Creating ingestion pipeline"
        );
        if universe.symbol_column() != config.tickers_column {
            warn!(
                provider = universe.symbol_column(),
                configured = %config.tickers_column,
                "Universe provider overrides the configured symbol column"
            );
        }
        Self {
            universe,
            prices,
            store: TickerStore::new(config),
        }
    }

    /// Create a pipeline reading the configured page and Yahoo Finance.
    ///
    /// # Errors
    /// Returns [`DataError::Network`] if an HTTP client cannot be built.
    #[cfg(all(feature = "html", feature = "yahoo"))]
    pub fn from_config(config: TradingDataConfig) -> Result<Self> {
        let universe =
            ticker_html::HtmlTableProvider::new(&config.tickers_url, &config.tickers_column)?;
        let prices = ticker_yahoo::YahooProvider::new()?;
        Ok(Self::new(config, Arc::new(universe), Arc::new(prices)))
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &TradingDataConfig {
        self.store.config()
    }

    /// Column of the universe table that holds symbols.
    #[must_use]
    pub fn symbol_column(&self) -> &str {
        self.universe.symbol_column()
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &TickerStore {
        &self.store
    }

    /// Fetch the ticker universe with its symbol column normalized.
    ///
    /// # Errors
    /// Propagates the provider error, or [`DataError::MissingColumn`] if the
    /// table has no symbol column.
    pub async fn fetch_universe(&self) -> Result<DataFrame> {
        debug!(provider = self.universe.name(), "Fetching ticker universe");
        let table = self.universe.fetch_universe().await?;
        normalize_symbol_column(table, self.universe.symbol_column())
    }

    /// Persist the ticker table. An empty table is not written.
    ///
    /// # Errors
    /// Returns [`DataError::Persistence`] if the write fails.
    pub fn save_ticker_table(&self, table: &DataFrame) -> Result<WriteOutcome> {
        self.store.save_ticker_table(table)
    }

    /// Symbols of the universe table, in row order. Null and blank cells are
    /// skipped.
    ///
    /// # Errors
    /// Returns [`DataError::MissingColumn`] if the symbol column is absent,
    /// or [`DataError::Polars`] if it does not hold strings.
    pub fn symbols(&self, table: &DataFrame) -> Result<Vec<Symbol>> {
        let values = symbol_values(table, self.symbol_column())?;

        Ok(values
            .into_iter()
            .flatten()
            .map(Symbol::new)
            .filter(|symbol| !symbol.is_empty())
            .collect())
    }

    /// Download and save price history for each symbol, in order.
    ///
    /// Empty results produce no file. Errors are logged and recorded in the
    /// report; they never stop the batch.
    pub async fn fetch_and_save_tickers(&self, symbols: &[Symbol]) -> BatchReport {
        let total = symbols.len();
        let range = self.config().history;
        let mut report = BatchReport::default();

        info!(
            total,
            provider = self.prices.name(),
            directory = %self.config().ticker_folder().display(),
            "Downloading price history"
        );

        for symbol in symbols {
            report.attempted += 1;

            let result = match self.prices.fetch_history(symbol, range).await {
                Ok(prices) => self.store.save_price_series(symbol, &prices),
                Err(e) => Err(e),
            };

            match result {
                Ok(WriteOutcome::Written { path, rows }) => {
                    debug!(symbol = %symbol, rows, path = %path.display(), "Saved price history");
                    report.written.push(symbol.clone());
                }
                Ok(WriteOutcome::Empty) => {
                    info!(symbol = %symbol, "No data for ticker, skipping");
                    report.empty.push(symbol.clone());
                }
                Err(e) if e.is_source_error() => {
                    warn!(symbol = %symbol, error = %e, "Failed to download ticker");
                    report.failed.push((symbol.clone(), e.to_string()));
                }
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "Failed to save ticker");
                    report.failed.push((symbol.clone(), e.to_string()));
                }
            }

            if report.attempted % PROGRESS_INTERVAL == 0 && report.attempted < total {
                info!(done = report.attempted, total, "Download progress");
            }
        }

        info!(
            attempted = report.attempted,
            written = report.written.len(),
            empty = report.empty.len(),
            failed = report.failed.len(),
            "Finished downloading price history"
        );
        report
    }

    /// Run a full ingestion: universe, ticker table, then every symbol.
    ///
    /// # Errors
    /// Fails only if the universe cannot be fetched or its table cannot be
    /// saved. Per-symbol failures are reported in the [`BatchReport`].
    pub async fn download_all_tickers(&self) -> Result<BatchReport> {
        let table = self.fetch_universe().await?;
        self.save_ticker_table(&table)?;

        let symbols = self.symbols(&table)?;
        Ok(self.fetch_and_save_tickers(&symbols).await)
    }

    /// Lazily scan every saved price file. See
    /// [`ticker_store::scan_price_directory`].
    ///
    /// # Errors
    /// Returns [`DataError::Io`] if the ticker folder cannot be listed.
    pub fn scan_prices(
        &self,
        predicate: Option<Expr>,
        projection: Option<Vec<Expr>>,
    ) -> Result<LazyFrame> {
        self.store.scan_prices(predicate, projection)
    }

    /// Start a [`PriceScan`] over the saved price files.
    #[must_use]
    pub fn price_scan(&self) -> PriceScan {
        self.store.price_scan()
    }

    /// Lazily scan the saved ticker table.
    ///
    /// # Errors
    /// Returns [`DataError::Polars`] if the scan cannot be planned.
    pub fn scan_ticker_list(&self) -> Result<LazyFrame> {
        self.store.scan_ticker_list()
    }
}

/// Replaces every `.` with `-` in the symbol column of `table`.
///
/// Other columns are left untouched.
///
/// # Errors
/// Returns [`DataError::MissingColumn`] if `column` is absent, or
/// [`DataError::Polars`] if it does not hold strings.
pub fn normalize_symbol_column(mut table: DataFrame, column: &str) -> Result<DataFrame> {
    let normalized: Vec<Option<String>> = symbol_values(&table, column)?
        .into_iter()
        .map(|value| value.map(|raw| normalize_symbol(&raw)))
        .collect();

    table.with_column(Column::new(column.into(), normalized))?;
    Ok(table)
}

fn symbol_values(table: &DataFrame, column: &str) -> Result<Vec<Option<String>>> {
    let values = table
        .column(column)
        .map_err(|_| DataError::MissingColumn {
            table: "ticker universe".to_string(),
            column: column.to_string(),
        })?
        .str()?;

    Ok(values
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::path::Path;
    use ticker_core::{DataProvider, HistoryRange, TICKER_COLUMN};

    #[derive(Debug)]
    struct MockUniverse {
        table: Option<DataFrame>,
    }

    impl MockUniverse {
        fn with_symbols(symbols: &[&str]) -> Self {
            let names: Vec<String> = symbols.iter().map(|s| format!("{s} Corp")).collect();
            let table = DataFrame::new(vec![
                Column::new("Symbol".into(), symbols.to_vec()),
                Column::new("Security".into(), names),
            ])
            .unwrap();
            Self { table: Some(table) }
        }

        fn failing() -> Self {
            Self { table: None }
        }
    }

    impl DataProvider for MockUniverse {
        fn name(&self) -> &str {
            "mock universe"
        }

        fn description(&self) -> &str {
            "In-memory ticker table"
        }
    }

    #[async_trait]
    impl UniverseProvider for MockUniverse {
        async fn fetch_universe(&self) -> Result<DataFrame> {
            self.table
                .clone()
                .ok_or_else(|| DataError::Network("connection refused".to_string()))
        }

        fn symbol_column(&self) -> &str {
            "Symbol"
        }
    }

    #[derive(Debug, Clone, Copy)]
    enum Reply {
        Rows(usize),
        Fail,
    }

    #[derive(Debug)]
    struct MockPrices {
        replies: HashMap<String, Reply>,
    }

    impl MockPrices {
        fn new(replies: &[(&str, Reply)]) -> Self {
            Self {
                replies: replies
                    .iter()
                    .map(|(symbol, reply)| ((*symbol).to_string(), *reply))
                    .collect(),
            }
        }
    }

    impl DataProvider for MockPrices {
        fn name(&self) -> &str {
            "mock prices"
        }

        fn description(&self) -> &str {
            "Synthetic daily bars"
        }
    }

    #[async_trait]
    impl PriceHistoryProvider for MockPrices {
        async fn fetch_history(&self, symbol: &Symbol, range: HistoryRange) -> Result<DataFrame> {
            range.validate()?;
            match self.replies.get(symbol.as_str()).copied() {
                Some(Reply::Rows(rows)) => Ok(bars(rows)),
                Some(Reply::Fail) => Err(DataError::Parse("malformed chart".to_string())),
                None => Err(DataError::SymbolNotFound(symbol.to_string())),
            }
        }
    }

    fn bars(rows: usize) -> DataFrame {
        let dates: Vec<i32> = (0..rows).map(|i| 19_723 + i as i32).collect();
        let prices: Vec<f64> = (0..rows).map(|i| 10.0 + i as f64).collect();
        let volumes: Vec<u64> = (0..rows).map(|i| 100 + i as u64).collect();

        DataFrame::new(vec![
            Column::new("date".into(), dates)
                .cast(&DataType::Date)
                .unwrap(),
            Column::new("open".into(), prices.clone()),
            Column::new("high".into(), prices.clone()),
            Column::new("low".into(), prices.clone()),
            Column::new("close".into(), prices),
            Column::new("volume".into(), volumes),
        ])
        .unwrap()
    }

    fn pipeline(root: &Path, universe: MockUniverse, prices: MockPrices) -> TradingData {
        TradingData::new(
            TradingDataConfig::new(root),
            Arc::new(universe),
            Arc::new(prices),
        )
    }

    fn symbols(raw: &[&str]) -> Vec<Symbol> {
        raw.iter().map(|s| Symbol::new(*s)).collect()
    }

    #[test]
    fn test_normalize_symbol_column() {
        let table = DataFrame::new(vec![
            Column::new("Symbol".into(), vec![Some("BRK.B"), Some("A.B.C"), None]),
            Column::new("Security".into(), vec!["Berkshire", "Dotted Inc.", "Blank"]),
        ])
        .unwrap();

        let df = normalize_symbol_column(table, "Symbol").unwrap();

        let symbols = df.column("Symbol").unwrap().str().unwrap();
        assert_eq!(symbols.get(0), Some("BRK-B"));
        assert_eq!(symbols.get(1), Some("A-B-C"));
        assert_eq!(symbols.get(2), None);
        let security = df.column("Security").unwrap().str().unwrap();
        assert_eq!(security.get(1), Some("Dotted Inc."));
    }

    #[test]
    fn test_normalize_missing_column() {
        let table = DataFrame::new(vec![Column::new("Ticker".into(), vec!["AAPL"])]).unwrap();
        let err = normalize_symbol_column(table, "Symbol").unwrap_err();
        assert!(matches!(err, DataError::MissingColumn { .. }));
    }

    #[tokio::test]
    async fn test_fetch_universe_normalizes() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(
            dir.path(),
            MockUniverse::with_symbols(&["MMM", "BRK.B", "BF.B"]),
            MockPrices::new(&[]),
        );

        let table = pipeline.fetch_universe().await.unwrap();

        assert_eq!(
            pipeline.symbols(&table).unwrap(),
            symbols(&["MMM", "BRK-B", "BF-B"])
        );
    }

    #[tokio::test]
    async fn test_empty_result_writes_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(
            dir.path(),
            MockUniverse::failing(),
            MockPrices::new(&[("NEWCO", Reply::Rows(0))]),
        );

        let report = pipeline.fetch_and_save_tickers(&symbols(&["NEWCO"])).await;

        assert_eq!(report.attempted, 1);
        assert_eq!(report.empty, symbols(&["NEWCO"]));
        assert!(report.is_clean());
        assert!(
            !pipeline
                .config()
                .price_file(&Symbol::new("NEWCO"))
                .exists()
        );
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_batch() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(
            dir.path(),
            MockUniverse::failing(),
            MockPrices::new(&[
                ("AAPL", Reply::Rows(5)),
                ("BAD", Reply::Fail),
                ("MSFT", Reply::Rows(3)),
            ]),
        );

        let report = pipeline
            .fetch_and_save_tickers(&symbols(&["AAPL", "BAD", "GONE", "MSFT"]))
            .await;

        assert_eq!(report.attempted, 4);
        assert_eq!(report.written, symbols(&["AAPL", "MSFT"]));
        assert_eq!(report.failed_symbols(), symbols(&["BAD", "GONE"]));

        let df = pipeline.scan_prices(None, None).unwrap().collect().unwrap();
        assert_eq!(df.height(), 8);
        let tickers = df.column(TICKER_COLUMN).unwrap().str().unwrap();
        assert_eq!(tickers.into_iter().filter(|t| *t == Some("MSFT")).count(), 3);
    }

    #[tokio::test]
    async fn test_rerun_writes_only_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let first = pipeline(
            dir.path(),
            MockUniverse::failing(),
            MockPrices::new(&[("AAPL", Reply::Rows(5)), ("MSFT", Reply::Fail)]),
        );
        let report = first
            .fetch_and_save_tickers(&symbols(&["AAPL", "MSFT"]))
            .await;
        assert_eq!(report.failed_symbols(), symbols(&["MSFT"]));

        let aapl = first.config().price_file(&Symbol::new("AAPL"));
        let before = std::fs::read(&aapl).unwrap();

        let second = pipeline(
            dir.path(),
            MockUniverse::failing(),
            MockPrices::new(&[("AAPL", Reply::Rows(7)), ("MSFT", Reply::Rows(3))]),
        );
        let report = second
            .fetch_and_save_tickers(&report.failed_symbols())
            .await;

        assert_eq!(report.written, symbols(&["MSFT"]));
        assert_eq!(std::fs::read(&aapl).unwrap(), before);
        let files = ticker_store::list_price_files(&second.config().ticker_folder()).unwrap();
        assert_eq!(files.len(), 2);
    }

    #[tokio::test]
    async fn test_download_all_tickers() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(
            dir.path(),
            MockUniverse::with_symbols(&["AAPL", "BRK.B"]),
            MockPrices::new(&[("AAPL", Reply::Rows(2)), ("BRK-B", Reply::Rows(4))]),
        );

        let report = pipeline.download_all_tickers().await.unwrap();

        assert_eq!(report.written, symbols(&["AAPL", "BRK-B"]));
        let tickers = pipeline.scan_ticker_list().unwrap().collect().unwrap();
        let saved = tickers.column("Symbol").unwrap().str().unwrap();
        assert_eq!(saved.get(1), Some("BRK-B"));
        assert!(
            pipeline
                .config()
                .price_file(&Symbol::new("BRK-B"))
                .exists()
        );
    }

    #[tokio::test]
    async fn test_universe_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(
            dir.path(),
            MockUniverse::failing(),
            MockPrices::new(&[("AAPL", Reply::Rows(2))]),
        );

        let err = pipeline.download_all_tickers().await.unwrap_err();

        assert!(matches!(err, DataError::Network(_)));
        assert!(!pipeline.config().ticker_list_file().exists());
        assert!(!pipeline.config().ticker_folder().exists());
    }

    #[tokio::test]
    async fn test_empty_universe_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(
            dir.path(),
            MockUniverse::with_symbols(&[]),
            MockPrices::new(&[]),
        );

        let report = pipeline.download_all_tickers().await.unwrap();

        assert_eq!(report.attempted, 0);
        assert!(!pipeline.config().ticker_list_file().exists());
    }

    #[tokio::test]
    async fn test_saved_symbols_match_file_stems() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(
            dir.path(),
            MockUniverse::with_symbols(&["brk.b", "AAPL"]),
            MockPrices::new(&[("brk-b", Reply::Rows(2)), ("AAPL", Reply::Rows(1))]),
        );

        pipeline.download_all_tickers().await.unwrap();

        let table = pipeline.scan_ticker_list().unwrap().collect().unwrap();
        let mut saved: Vec<String> = table
            .column("Symbol")
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .flatten()
            .map(str::to_string)
            .collect();
        saved.sort();

        let files = ticker_store::list_price_files(&pipeline.config().ticker_folder()).unwrap();
        let stems: Vec<String> = files.into_iter().map(|(stem, _)| stem).collect();
        assert_eq!(stems, saved);

        let prices = pipeline.scan_prices(None, None).unwrap().collect().unwrap();
        let tickers = prices.column(TICKER_COLUMN).unwrap().str().unwrap();
        assert_eq!(tickers.into_iter().filter(|t| *t == Some("brk-b")).count(), 2);
    }

    #[tokio::test]
    async fn test_provider_symbol_column_wins() {
        let dir = tempfile::tempdir().unwrap();
        let config = TradingDataConfig::new(dir.path()).with_tickers_column("Ticker");
        let pipeline = TradingData::new(
            config,
            Arc::new(MockUniverse::with_symbols(&["MSFT"])),
            Arc::new(MockPrices::new(&[])),
        );

        assert_eq!(pipeline.symbol_column(), "Symbol");
        let table = pipeline.fetch_universe().await.unwrap();
        assert_eq!(pipeline.symbols(&table).unwrap(), symbols(&["MSFT"]));
    }
}
