//! Error types for scheme resolution and return computations.

use chrono::NaiveDate;
use derive_more::Display;
use thiserror::Error;

/// Result type for navroll operations.
pub type Result<T> = std::result::Result<T, ReturnsError>;

/// Market direction of a capture-ratio partition.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureSide {
    /// Rows where the benchmark return is non-negative
    Upside,
    /// Rows where the benchmark return is negative
    Downside,
}

/// Errors that can occur while resolving schemes or computing returns.
#[derive(Debug, Error)]
pub enum ReturnsError {
    /// Identifier matched more than one catalog row
    #[error("Ambiguous scheme '{identifier}': {matches} candidates, expected exactly 1")]
    AmbiguousScheme {
        /// Identifier as given by the caller
        identifier: String,
        /// Number of candidate rows
        matches: usize,
    },

    /// Identifier matched no catalog row
    #[error("Unresolved scheme: '{0}' matched no catalog row")]
    UnresolvedScheme(String),

    /// Scheme resolved but no benchmark directory row links to it
    #[error("No benchmark link for scheme '{scheme}' (identifier '{identifier}')")]
    UnresolvedBenchmarkLink {
        /// Identifier as given by the caller
        identifier: String,
        /// Prefix used against the benchmark directory
        scheme: String,
    },

    /// Period string carries no year, month or day token
    #[error("Invalid period: '{0}'")]
    InvalidPeriod(String),

    /// Capture ratio over an empty partition or a zero benchmark return
    #[error("Undefined {side} capture ratio for column '{column}'")]
    UndefinedRatio {
        /// Fund column the ratio belongs to
        column: String,
        /// Partition that could not be evaluated
        side: CaptureSide,
    },

    /// Missing required column in input data
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// Return columns of different lengths
    #[error("Column '{column}' has {len} rows, benchmark has {expected}")]
    ColumnLengthMismatch {
        /// Offending column
        column: String,
        /// Its length
        len: usize,
        /// Benchmark length
        expected: usize,
    },

    /// NAV value that is not a positive finite number
    #[error("Invalid NAV {nav} on {date}")]
    InvalidNav {
        /// Observation date
        date: NaiveDate,
        /// Offending value
        nav: f64,
    },

    /// Two NAV observations on the same date
    #[error("Duplicate NAV observation on {0}")]
    DuplicateDate(NaiveDate),

    /// Date cell that is not `%Y-%m-%d`
    #[error("Invalid date: '{0}'")]
    InvalidDate(String),

    /// Unknown sampling frequency alias
    #[error("Invalid sampling frequency: '{0}'")]
    InvalidSampling(String),

    /// Unknown return mode name
    #[error("Invalid return mode: '{0}'")]
    InvalidMode(String),

    /// Resolved record has no symbol to fetch NAV with
    #[error("Scheme '{0}' has no NAV symbol")]
    MissingSymbol(String),

    /// Polars DataFrame error
    #[error("DataFrame error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// NAV provider failure, passed through unchanged
    #[error(transparent)]
    NavSource(Box<dyn std::error::Error + Send + Sync>),
}

impl ReturnsError {
    /// Wrap a NAV provider error without altering it.
    pub fn nav_source<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::NavSource(err.into())
    }
}
