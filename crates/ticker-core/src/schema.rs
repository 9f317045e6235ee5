//! The fixed layout of per-ticker price files.
//!
//! Every file written by the pipeline has the same six columns in the same
//! order so that frames from different tickers can be unioned row-wise.

use polars::prelude::*;

use crate::error::{DataError, Result};

/// Name of the column appended by retrieval to identify the source ticker.
pub const TICKER_COLUMN: &str = "ticker";

/// Column names accepted as the trading day when conforming provider frames.
const DATE_ALIASES: [&str; 3] = ["date", "datetime", "timestamp"];

/// Fixed schema of a per-ticker price series.
#[derive(Debug, Clone, Copy, Default)]
pub struct PriceSchema;

impl PriceSchema {
    /// Trading day.
    pub const DATE: &'static str = "date";
    /// Opening price.
    pub const OPEN: &'static str = "open";
    /// Highest price of the day.
    pub const HIGH: &'static str = "high";
    /// Lowest price of the day.
    pub const LOW: &'static str = "low";
    /// Closing price.
    pub const CLOSE: &'static str = "close";
    /// Shares traded.
    pub const VOLUME: &'static str = "volume";

    /// Column names in file order.
    pub const COLUMNS: [&'static str; 6] = [
        Self::DATE,
        Self::OPEN,
        Self::HIGH,
        Self::LOW,
        Self::CLOSE,
        Self::VOLUME,
    ];

    fn fields() -> [(&'static str, DataType); 6] {
        [
            (Self::DATE, DataType::Date),
            (Self::OPEN, DataType::Float64),
            (Self::HIGH, DataType::Float64),
            (Self::LOW, DataType::Float64),
            (Self::CLOSE, DataType::Float64),
            (Self::VOLUME, DataType::Int64),
        ]
    }

    /// Returns the polars schema of a price file.
    #[must_use]
    pub fn schema() -> Schema {
        Schema::from_iter(
            Self::fields()
                .into_iter()
                .map(|(name, dtype)| Field::new(name.into(), dtype)),
        )
    }

    /// Returns a zero-row frame with the price schema.
    #[must_use]
    pub fn empty_frame() -> DataFrame {
        DataFrame::empty_with_schema(&Self::schema())
    }

    /// Renames, reorders and casts a provider frame into the fixed schema.
    ///
    /// Column lookup is case-insensitive, and `datetime` or `timestamp` are
    /// accepted for the date. Columns outside the schema are dropped.
    ///
    /// # Errors
    /// Returns [`DataError::MissingColumn`] if a schema column has no source,
    /// or [`DataError::Polars`] if a cast fails.
    pub fn conform(df: &DataFrame) -> Result<DataFrame> {
        let names: Vec<String> = df
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect();

        let mut columns = Vec::with_capacity(Self::COLUMNS.len());
        for (target, dtype) in Self::fields() {
            let source = find_source_column(&names, target).ok_or_else(|| {
                DataError::MissingColumn {
                    table: "price history".to_string(),
                    column: target.to_string(),
                }
            })?;
            columns.push(df.column(source)?.cast(&dtype)?.with_name(target.into()));
        }

        Ok(DataFrame::new(columns)?)
    }
}

fn find_source_column<'a>(names: &'a [String], target: &str) -> Option<&'a str> {
    let candidates: &[&str] = if target == PriceSchema::DATE {
        &DATE_ALIASES
    } else {
        std::slice::from_ref(&target)
    };

    candidates.iter().find_map(|candidate| {
        names
            .iter()
            .find(|name| name.eq_ignore_ascii_case(candidate))
            .map(String::as_str)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_frame() -> DataFrame {
        DataFrame::new(vec![
            Column::new("Date".into(), vec![19_724i32, 19_725])
                .cast(&DataType::Date)
                .unwrap(),
            Column::new("Close".into(), vec![101.0, 102.0]),
            Column::new("High".into(), vec![103.0, 104.0]),
            Column::new("Low".into(), vec![99.0, 100.0]),
            Column::new("Open".into(), vec![100.0, 101.5]),
            Column::new("Volume".into(), vec![1_000u64, 2_000]),
            Column::new("adjusted_close".into(), vec![100.5, 101.5]),
        ])
        .unwrap()
    }

    #[test]
    fn test_schema_order() {
        let schema = PriceSchema::schema();
        let names: Vec<&str> = schema.iter_names().map(|n| n.as_str()).collect();
        assert_eq!(names, PriceSchema::COLUMNS);
        assert_eq!(schema.get(PriceSchema::VOLUME), Some(&DataType::Int64));
    }

    #[test]
    fn test_conform_reorders_and_casts() {
        let df = PriceSchema::conform(&provider_frame()).unwrap();

        assert_eq!(df.height(), 2);
        let names: Vec<&str> = df.get_column_names().iter().map(|n| n.as_str()).collect();
        assert_eq!(names, PriceSchema::COLUMNS);
        assert_eq!(
            df.dtypes(),
            vec![
                DataType::Date,
                DataType::Float64,
                DataType::Float64,
                DataType::Float64,
                DataType::Float64,
                DataType::Int64,
            ]
        );

        let open = df.column("open").unwrap().f64().unwrap();
        assert_eq!(open.get(0), Some(100.0));
        let close = df.column("close").unwrap().f64().unwrap();
        assert_eq!(close.get(1), Some(102.0));
        let volume = df.column("volume").unwrap().i64().unwrap();
        assert_eq!(volume.get(1), Some(2_000));
    }

    #[test]
    fn test_conform_accepts_timestamp_alias() {
        let df = DataFrame::new(vec![
            Column::new("timestamp".into(), vec![19_724i32, 19_725])
                .cast(&DataType::Date)
                .unwrap(),
            Column::new("open".into(), vec![1.0, 2.0]),
            Column::new("high".into(), vec![1.5, 2.5]),
            Column::new("low".into(), vec![0.5, 1.5]),
            Column::new("close".into(), vec![1.2, 2.2]),
            Column::new("volume".into(), vec![10i64, 20]),
        ])
        .unwrap();

        let conformed = PriceSchema::conform(&df).unwrap();

        assert_eq!(conformed.get_column_names()[0].as_str(), "date");
        let dates = conformed.column("date").unwrap().date().unwrap();
        assert_eq!(dates.0.get(1), Some(19_725));
    }

    #[test]
    fn test_conform_missing_column() {
        let df = provider_frame().drop("Volume").unwrap();
        let err = PriceSchema::conform(&df).unwrap_err();
        assert!(matches!(
            err,
            DataError::MissingColumn { ref column, .. } if column == "volume"
        ));
    }

    #[test]
    fn test_empty_frame() {
        let df = PriceSchema::empty_frame();
        assert_eq!(df.height(), 0);
        assert_eq!(df.width(), 6);
    }
}
