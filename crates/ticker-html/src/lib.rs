#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! HTML table universe provider.
//!
//! This crate provides [`HtmlTableProvider`], an implementation of the
//! [`UniverseProvider`] trait from `ticker-core` that scrapes the first table
//! of a web page.
//!
//! # Example
//!
//! ```no_run
//! use ticker_html::HtmlTableProvider;
//! use ticker_core::UniverseProvider;
//!
//! # async fn example() -> ticker_core::Result<()> {
//! let provider = HtmlTableProvider::sp500()?;
//! let table = provider.fetch_universe().await?;
//! println!("Fetched {} tickers", table.height());
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use polars::prelude::*;
use scraper::{ElementRef, Html, Selector};
use ticker_core::{
    DEFAULT_TICKERS_COLUMN, DEFAULT_TICKERS_URL, DataError, DataProvider, Result, UniverseProvider,
};
use tracing::debug;

/// User agent for HTTP requests.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

/// Universe provider backed by the first `<table>` of a web page.
#[derive(Debug)]
pub struct HtmlTableProvider {
    client: reqwest::Client,
    url: String,
    symbol_column: String,
}

impl HtmlTableProvider {
    /// Create a provider for `url` whose symbols live in `symbol_column`.
    ///
    /// # Errors
    /// Returns [`DataError::Network`] if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, symbol_column: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DataError::Network(e.to_string()))?;

        Ok(Self::with_client(client, url, symbol_column))
    }

    /// Create a provider for the S&P 500 constituents page.
    ///
    /// # Errors
    /// Returns [`DataError::Network`] if the HTTP client cannot be built.
    pub fn sp500() -> Result<Self> {
        Self::new(DEFAULT_TICKERS_URL, DEFAULT_TICKERS_COLUMN)
    }

    /// Create a provider with a custom HTTP client.
    #[must_use]
    pub fn with_client(
        client: reqwest::Client,
        url: impl Into<String>,
        symbol_column: impl Into<String>,
    ) -> Self {
        Self {
            client,
            url: url.into(),
            symbol_column: symbol_column.into(),
        }
    }

    /// The page this provider reads.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn fetch_page(&self) -> Result<String> {
        debug!(url = %self.url, "Fetching universe page");

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| DataError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DataError::Network(format!(
                "HTTP {} for {}",
                response.status(),
                self.url
            )));
        }

        response
            .text()
            .await
            .map_err(|e| DataError::Network(e.to_string()))
    }
}

impl DataProvider for HtmlTableProvider {
    fn name(&self) -> &str {
        "HTML table"
    }

    fn description(&self) -> &str {
        "Ticker universe scraped from the first HTML table of a web page"
    }
}

#[async_trait]
impl UniverseProvider for HtmlTableProvider {
    async fn fetch_universe(&self) -> Result<DataFrame> {
        let page = self.fetch_page().await?;
        let table = parse_first_table(&page)?;
        require_column(&table, &self.symbol_column, &self.url)?;

        debug!(
            url = %self.url,
            rows = table.height(),
            columns = table.width(),
            "Parsed universe table"
        );
        Ok(table)
    }

    fn symbol_column(&self) -> &str {
        &self.symbol_column
    }
}

/// Parses the first `<table>` of an HTML document into a string frame.
///
/// Only rows that belong to the table itself are read, directly or through
/// its `thead`, `tbody` and `tfoot` sections, so tables nested in cells add no
/// rows. The first row containing a `<th>` supplies the column names; every
/// following row supplies values. Short rows are padded with nulls, long rows
/// are truncated. Blank header cells become `Unnamed: <index>` and repeated
/// names get a `.<n>` suffix.
///
/// # Errors
/// Returns [`DataError::Parse`] if the document has no table or the table has
/// no header row.
pub fn parse_first_table(html: &str) -> Result<DataFrame> {
    let document = Html::parse_document(html);
    let table_selector = selector("table")?;

    let table = document
        .select(&table_selector)
        .next()
        .ok_or_else(|| DataError::Parse("No HTML table found".to_string()))?;

    let rows = table_rows(table);
    let header_index = rows
        .iter()
        .position(|row| row_cells(*row).any(|cell| cell.value().name() == "th"))
        .ok_or_else(|| DataError::Parse("HTML table has no header row".to_string()))?;

    let names = header_names(row_cells(rows[header_index]).map(cell_text).collect());
    let mut values: Vec<Vec<Option<String>>> = vec![Vec::new(); names.len()];

    for row in &rows[header_index + 1..] {
        let mut cells = row_cells(*row).map(cell_text);
        for column in &mut values {
            column.push(cells.next());
        }
    }

    let columns = names
        .iter()
        .zip(values)
        .map(|(name, column)| Column::new(name.as_str().into(), column))
        .collect();

    Ok(DataFrame::new(columns)?)
}

/// Fails with [`DataError::MissingColumn`] unless `table` has `column`.
pub fn require_column(table: &DataFrame, column: &str, source: &str) -> Result<()> {
    if table.column(column).is_ok() {
        Ok(())
    } else {
        Err(DataError::MissingColumn {
            table: format!("first HTML table at {source}"),
            column: column.to_string(),
        })
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| DataError::Parse(format!("Invalid selector {css}: {e:?}")))
}

fn child_elements(parent: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    parent.children().filter_map(ElementRef::wrap)
}

/// `<tr>` elements owned by `table`, in document order.
fn table_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let mut rows = Vec::new();
    for child in child_elements(table) {
        match child.value().name() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => {
                rows.extend(child_elements(child).filter(|row| row.value().name() == "tr"));
            }
            _ => {}
        }
    }
    rows
}

fn row_cells(row: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    child_elements(row).filter(|cell| matches!(cell.value().name(), "th" | "td"))
}

/// Visible text of a cell with whitespace collapsed.
fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn header_names(raw: Vec<String>) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(raw.len());
    for (index, name) in raw.into_iter().enumerate() {
        let base = if name.is_empty() {
            format!("Unnamed: {index}")
        } else {
            name
        };

        let mut candidate = base.clone();
        let mut suffix = 1;
        while names.contains(&candidate) {
            candidate = format!("{base}.{suffix}");
            suffix += 1;
        }
        names.push(candidate);
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONSTITUENTS: &str = r#"
        <html><body>
        <p>Intro</p>
        <table class="wikitable sortable" id="constituents">
          <tbody>
            <tr><th>Symbol</th><th>Security</th><th>GICS Sector</th></tr>
            <tr><td><a href="/quote/MMM">MMM</a></td><td><a href="/wiki/3M">3M</a></td><td>Industrials</td></tr>
            <tr><td><a href="/quote/BRK.B">BRK.B</a></td><td>Berkshire
                Hathaway</td><td>Financials</td></tr>
            <tr><td>BF.B</td><td>Brown-Forman</td></tr>
          </tbody>
        </table>
        <table><tr><th>Date</th></tr><tr><td>2024-01-01</td></tr></table>
        </body></html>
    "#;

    #[test]
    fn test_parse_first_table() {
        let df = parse_first_table(CONSTITUENTS).unwrap();

        assert_eq!(df.height(), 3);
        let names: Vec<&str> = df.get_column_names().iter().map(|n| n.as_str()).collect();
        assert_eq!(names, ["Symbol", "Security", "GICS Sector"]);

        let symbols = df.column("Symbol").unwrap().str().unwrap();
        assert_eq!(symbols.get(0), Some("MMM"));
        assert_eq!(symbols.get(1), Some("BRK.B"));

        let security = df.column("Security").unwrap().str().unwrap();
        assert_eq!(security.get(1), Some("Berkshire Hathaway"));

        let sector = df.column("GICS Sector").unwrap().str().unwrap();
        assert_eq!(sector.get(2), None);
    }

    #[test]
    fn test_nested_table_adds_no_rows() {
        let html = r#"
            <table>
              <tr><th>Symbol</th><th>Notes</th></tr>
              <tr><td>AAPL</td><td><table><tr><td>inner</td><td>x</td></tr></table></td></tr>
              <tr><td>MSFT</td><td>plain</td></tr>
            </table>
        "#;

        let df = parse_first_table(html).unwrap();

        assert_eq!(df.height(), 2);
        let symbols = df.column("Symbol").unwrap().str().unwrap();
        assert_eq!(symbols.get(0), Some("AAPL"));
        assert_eq!(symbols.get(1), Some("MSFT"));
        let notes = df.column("Notes").unwrap().str().unwrap();
        assert_eq!(notes.get(0), Some("inner x"));
    }

    #[test]
    fn test_parse_without_table() {
        let err = parse_first_table("<html><body><p>nothing</p></body></html>").unwrap_err();
        assert!(matches!(err, DataError::Parse(_)));
    }

    #[test]
    fn test_parse_without_header() {
        let err = parse_first_table("<table><tr><td>AAPL</td></tr></table>").unwrap_err();
        assert!(matches!(err, DataError::Parse(_)));
    }

    #[test]
    fn test_parse_header_only() {
        let df = parse_first_table("<table><tr><th>Symbol</th></tr></table>").unwrap();
        assert_eq!(df.height(), 0);
        assert!(df.column("Symbol").is_ok());
    }

    #[test]
    fn test_header_names_deduplicated() {
        let names = header_names(vec![
            "Symbol".to_string(),
            String::new(),
            "Symbol".to_string(),
            "Symbol".to_string(),
        ]);
        assert_eq!(names, ["Symbol", "Unnamed: 1", "Symbol.1", "Symbol.2"]);
    }

    #[test]
    fn test_require_column() {
        let df = parse_first_table(CONSTITUENTS).unwrap();
        assert!(require_column(&df, "Symbol", "test").is_ok());

        let err = require_column(&df, "Ticker", "test").unwrap_err();
        assert!(matches!(err, DataError::MissingColumn { ref column, .. } if column == "Ticker"));
    }

    #[test]
    fn test_provider_info() {
        let provider = HtmlTableProvider::sp500().unwrap();

        assert_eq!(provider.name(), "HTML table");
        assert_eq!(provider.symbol_column(), "Symbol");
        assert_eq!(provider.url(), DEFAULT_TICKERS_URL);
    }

    #[tokio::test]
    async fn test_unreachable_page_is_network_error() {
        let provider = HtmlTableProvider::new("http://127.0.0.1:9/constituents", "Symbol").unwrap();
        let err = provider.fetch_universe().await.unwrap_err();
        assert!(matches!(err, DataError::Network(_)));
    }
}
