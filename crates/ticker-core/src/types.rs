//! Core data types.
//!
//! - [`Symbol`] - Trading symbol/ticker
//! - [`normalize_symbol`] - Provider-compatible symbol spelling

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Separator used by index listings for share classes (`BRK.B`).
const LISTING_CLASS_SEPARATOR: char = '.';

/// Separator expected by the price provider for share classes (`BRK-B`).
const PROVIDER_CLASS_SEPARATOR: &str = "-";

/// Rewrites a symbol into the spelling the price provider expects.
///
/// Every `.` is replaced with `-`, not only the first one.
#[must_use]
pub fn normalize_symbol(raw: &str) -> String {
    raw.replace(LISTING_CLASS_SEPARATOR, PROVIDER_CLASS_SEPARATOR)
}

/// A trading symbol/ticker.
///
/// Symbols are trimmed on creation; case is preserved. They double as file stems
/// for per-ticker Parquet files.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol(String);

impl Symbol {
    /// Creates a new symbol from a string, trimming surrounding whitespace.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().trim().to_string())
    }

    /// Returns the symbol as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the symbol in provider spelling (see [`normalize_symbol`]).
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self(normalize_symbol(&self.0))
    }

    /// Returns true if the symbol is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Symbol {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_replaces_every_dot() {
        assert_eq!(normalize_symbol("BRK.B"), "BRK-B");
        assert_eq!(normalize_symbol("A.B.C"), "A-B-C");
        assert_eq!(normalize_symbol("AAPL"), "AAPL");
        assert_eq!(normalize_symbol(""), "");
    }

    #[test]
    fn test_symbol_trims_and_keeps_case() {
        let symbol = Symbol::new(" brk.b ");
        assert_eq!(symbol.as_str(), "brk.b");
        assert_eq!(symbol.normalized().as_str(), "brk-b");
        assert_ne!(Symbol::new("abc"), Symbol::new("ABC"));
    }

    #[test]
    fn test_symbol_conversions() {
        let a: Symbol = " MSFT".into();
        let b: Symbol = "MSFT".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "MSFT");
        assert!(Symbol::new("  ").is_empty());
    }
}
