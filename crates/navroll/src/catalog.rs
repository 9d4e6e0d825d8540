//! Reference catalog of schemes and benchmarks.
//!
//! The catalog holds two read-only tables:
//!
//! - the scheme directory (`schemeCode`, `shortName`, `longName`, optionally
//!   `symbol`)
//! - the benchmark directory (`scheme_name`, `category`, `benchmark`)
//!
//! Tabular sources are mapped to typed rows once, at load time. Empty cells
//! become `None` and never satisfy a prefix or substring match.

use crate::{Result, ReturnsError};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Column names of the scheme directory.
pub const SCHEME_COLUMNS: [&str; 3] = ["schemeCode", "shortName", "longName"];

/// Optional scheme directory column holding the NAV quote symbol.
pub const SYMBOL_COLUMN: &str = "symbol";

/// Column names of the benchmark directory.
pub const BENCHMARK_COLUMNS: [&str; 3] = ["scheme_name", "category", "benchmark"];

/// One row of the scheme directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemeRow {
    /// Scheme code or quote ticker
    pub scheme_code: String,
    /// Display-truncated scheme name
    pub short_name: Option<String>,
    /// Full scheme name including plan and option
    pub long_name: Option<String>,
    /// Quote symbol NAV history is fetched with, when it differs from the code
    pub symbol: Option<String>,
}

impl SchemeRow {
    /// Create a row with all fields present.
    pub fn new(
        scheme_code: impl Into<String>,
        short_name: impl Into<String>,
        long_name: impl Into<String>,
    ) -> Self {
        Self {
            scheme_code: scheme_code.into(),
            short_name: Some(short_name.into()),
            long_name: Some(long_name.into()),
            symbol: None,
        }
    }

    /// Set the quote symbol.
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    /// Symbol to fetch NAV history with: the quote symbol if present, else
    /// the scheme code.
    pub fn nav_symbol(&self) -> &str {
        self.symbol.as_deref().unwrap_or(&self.scheme_code)
    }

    /// Whether the long name contains `needle`. Empty names never do.
    pub fn long_name_contains(&self, needle: &str) -> bool {
        self.long_name.as_deref().is_some_and(|n| n.contains(needle))
    }
}

/// One row of the benchmark directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkRow {
    /// Canonical scheme name
    pub scheme_name: Option<String>,
    /// Fund category
    pub category: Option<String>,
    /// Name of the benchmark index the scheme tracks
    pub benchmark: Option<String>,
}

impl BenchmarkRow {
    /// Create a row with all fields present.
    pub fn new(
        scheme_name: impl Into<String>,
        category: impl Into<String>,
        benchmark: impl Into<String>,
    ) -> Self {
        Self {
            scheme_name: Some(scheme_name.into()),
            category: Some(category.into()),
            benchmark: Some(benchmark.into()),
        }
    }
}

/// Read-only scheme and benchmark directories.
#[derive(Debug, Clone, Default)]
pub struct ReferenceCatalog {
    schemes: Vec<SchemeRow>,
    benchmarks: Vec<BenchmarkRow>,
}

impl ReferenceCatalog {
    /// Build a catalog from typed rows. Row order is preserved.
    pub const fn new(schemes: Vec<SchemeRow>, benchmarks: Vec<BenchmarkRow>) -> Self {
        Self {
            schemes,
            benchmarks,
        }
    }

    /// Build a catalog from two DataFrames.
    ///
    /// # Required Columns
    /// - schemes: `schemeCode`, `shortName`, `longName`
    /// - benchmarks: `scheme_name`, `category`, `benchmark`
    ///
    /// The scheme directory may also carry a `symbol` column; rows without
    /// one fetch NAV by scheme code.
    ///
    /// Non-string columns are cast to strings, so numeric scheme codes load
    /// as their decimal text.
    pub fn from_frames(schemes: &DataFrame, benchmarks: &DataFrame) -> Result<Self> {
        let [code, short, long] = SCHEME_COLUMNS.map(|name| text_column(schemes, name));
        let symbols = match schemes.column(SYMBOL_COLUMN) {
            Ok(_) => text_column(schemes, SYMBOL_COLUMN)?,
            Err(_) => vec![None; schemes.height()],
        };
        let scheme_rows = code?
            .into_iter()
            .zip(short?)
            .zip(long?)
            .zip(symbols)
            .map(|(((scheme_code, short_name), long_name), symbol)| SchemeRow {
                scheme_code: scheme_code.unwrap_or_default(),
                short_name,
                long_name,
                symbol,
            })
            .collect::<Vec<_>>();

        let [name, category, benchmark] =
            BENCHMARK_COLUMNS.map(|column| text_column(benchmarks, column));
        let benchmark_rows = name?
            .into_iter()
            .zip(category?)
            .zip(benchmark?)
            .map(|((scheme_name, category), benchmark)| BenchmarkRow {
                scheme_name,
                category,
                benchmark,
            })
            .collect::<Vec<_>>();

        debug!(
            schemes = scheme_rows.len(),
            benchmarks = benchmark_rows.len(),
            "loaded reference catalog"
        );

        Ok(Self::new(scheme_rows, benchmark_rows))
    }

    /// Load both directories from CSV files with header rows.
    pub fn from_csv(schemes: impl AsRef<Path>, benchmarks: impl AsRef<Path>) -> Result<Self> {
        let schemes = read_csv(schemes.as_ref())?;
        let benchmarks = read_csv(benchmarks.as_ref())?;
        Self::from_frames(&schemes, &benchmarks)
    }

    /// All scheme directory rows.
    pub fn schemes(&self) -> &[SchemeRow] {
        &self.schemes
    }

    /// All benchmark directory rows.
    pub fn benchmarks(&self) -> &[BenchmarkRow] {
        &self.benchmarks
    }

    /// Scheme rows whose code equals `code` exactly.
    pub fn schemes_by_code(&self, code: &str) -> Vec<&SchemeRow> {
        self.schemes
            .iter()
            .filter(|row| row.scheme_code == code)
            .collect()
    }

    /// Scheme rows whose short name starts with `prefix`.
    pub fn schemes_by_short_name_prefix(&self, prefix: &str) -> Vec<&SchemeRow> {
        self.schemes
            .iter()
            .filter(|row| starts_with(row.short_name.as_deref(), prefix))
            .collect()
    }

    /// Benchmark rows whose benchmark name starts with `prefix`.
    pub fn benchmarks_by_prefix(&self, prefix: &str) -> Vec<&BenchmarkRow> {
        self.benchmarks
            .iter()
            .filter(|row| starts_with(row.benchmark.as_deref(), prefix))
            .collect()
    }

    /// First benchmark row whose scheme name starts with `prefix`.
    pub fn benchmark_link(&self, prefix: &str) -> Option<&BenchmarkRow> {
        self.benchmarks
            .iter()
            .find(|row| starts_with(row.scheme_name.as_deref(), prefix))
    }
}

fn starts_with(value: Option<&str>, prefix: &str) -> bool {
    value.is_some_and(|v| v.starts_with(prefix))
}

fn read_csv(path: &Path) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(df)
}

fn text_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df
        .column(name)
        .map_err(|_| ReturnsError::MissingColumn(name.to_string()))?
        .cast(&DataType::String)?;

    let values = column
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_string).filter(|v| !v.is_empty()))
        .collect();

    Ok(values)
}
