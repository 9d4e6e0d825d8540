//! Scheme resolution.
//!
//! Turns a loosely specified identifier (scheme code, partial fund name or
//! benchmark name) into exactly one [`SchemeRecord`].
//!
//! Resolution order:
//! 1. Benchmark names short-circuit into a synthesized index record.
//! 2. Identifiers made of `A-Z`, `0-9` and `.` are looked up by scheme code.
//! 3. Anything else is a fund name, matched by short-name prefix and narrowed
//!    to the direct growth plan.

use crate::{
    Result, ReturnsError,
    catalog::{ReferenceCatalog, SchemeRow},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Index names that are always treated as benchmarks.
pub const PRIMARY_INDICES: &[&str] = &["NIFTY 50"];

/// Benchmark display names with a fetchable quote symbol.
pub const INDEX_QUOTE_SYMBOLS: &[(&str, &str)] = &[
    ("NIFTY 50", "^NSEI"),
    ("NIFTY 100", "^CNX100"),
    ("S&P BSE 100", "BSE-100.BO"),
];

/// Category assigned to synthesized benchmark records.
pub const INDEX_FUND_CATEGORY: &str = "Index Fund";

/// Short names are display-truncated to this many characters.
pub const SHORT_NAME_LEN: usize = 31;

const TOTAL_RETURN_QUALIFIER: &str = "Total Return Index";
const DIRECT_GROWTH_MARKER: &str = "Dir Gr";
const IDCW_MARKER: &str = "IDCW";

/// Canonical metadata for a fund or benchmark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemeRecord {
    /// Scheme code; the quote symbol (possibly empty) for benchmarks
    pub scheme_code: String,
    /// Canonical display name
    pub scheme_name: String,
    /// Fund category, `"Index Fund"` for benchmarks
    pub category: String,
    /// Linked benchmark name
    pub benchmark: Option<String>,
    /// Identifier used to fetch NAV history; empty when none is available
    pub symbol: String,
    /// Display-truncated name
    pub short_name: String,
    /// Full name
    pub long_name: String,
}

impl SchemeRecord {
    /// Synthesize a record for a benchmark index.
    ///
    /// The symbol comes from [`INDEX_QUOTE_SYMBOLS`]; unlisted benchmarks get
    /// an empty symbol and carry metadata only.
    pub fn benchmark(name: &str) -> Self {
        let symbol = quote_symbol(name).unwrap_or_default().to_string();

        Self {
            scheme_code: symbol.clone(),
            scheme_name: name.to_string(),
            category: INDEX_FUND_CATEGORY.to_string(),
            benchmark: Some(name.to_string()),
            symbol,
            short_name: name.to_string(),
            long_name: name.to_string(),
        }
    }

    /// Whether NAV history can be fetched for this record.
    pub fn has_nav_symbol(&self) -> bool {
        !self.symbol.is_empty()
    }
}

/// Quote symbol for a benchmark display name.
pub fn quote_symbol(benchmark: &str) -> Option<&'static str> {
    INDEX_QUOTE_SYMBOLS
        .iter()
        .find(|(name, _)| *name == benchmark)
        .map(|(_, symbol)| *symbol)
}

/// Whether `identifier` looks like a scheme code (`^[A-Z0-9.]+$`).
pub fn is_scheme_code(identifier: &str) -> bool {
    !identifier.is_empty()
        && identifier
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '.')
}

/// Benchmark name with the total-return qualifier removed.
pub fn canonical_benchmark_name(benchmark: &str) -> String {
    benchmark.replace(TOTAL_RETURN_QUALIFIER, "").trim().to_string()
}

/// Resolves identifiers against a [`ReferenceCatalog`].
#[derive(Debug, Clone, Copy)]
pub struct SchemeResolver<'a> {
    catalog: &'a ReferenceCatalog,
}

impl<'a> SchemeResolver<'a> {
    /// Create a resolver over `catalog`.
    pub const fn new(catalog: &'a ReferenceCatalog) -> Self {
        Self { catalog }
    }

    /// The catalog this resolver reads from.
    pub const fn catalog(&self) -> &'a ReferenceCatalog {
        self.catalog
    }

    /// Resolve `identifier` into exactly one record.
    ///
    /// # Errors
    /// - [`ReturnsError::AmbiguousScheme`] when more than one row remains
    /// - [`ReturnsError::UnresolvedScheme`] when no row matches
    /// - [`ReturnsError::UnresolvedBenchmarkLink`] when the scheme has no
    ///   benchmark directory entry
    pub fn resolve(&self, identifier: &str) -> Result<SchemeRecord> {
        if identifier.is_empty() {
            return Err(ReturnsError::UnresolvedScheme(identifier.to_string()));
        }

        if let Some(benchmark) = self.benchmark_name(identifier) {
            debug!(identifier, %benchmark, "resolved as benchmark");
            return Ok(SchemeRecord::benchmark(&benchmark));
        }

        // The code path links by the catalog short name, the name path by the
        // identifier as given.
        let (row, link_prefix) = if is_scheme_code(identifier) {
            debug!(identifier, "resolving by scheme code");
            let row = exactly_one(identifier, self.catalog.schemes_by_code(identifier))?;
            (row, row.short_name.as_deref())
        } else {
            debug!(identifier, "resolving by scheme name");
            let prefix = truncate_chars(identifier, SHORT_NAME_LEN);
            let candidates = self.catalog.schemes_by_short_name_prefix(prefix);
            let row = exactly_one(identifier, select_direct_growth(identifier, candidates))?;
            (row, Some(identifier))
        };

        let link = link_prefix
            .and_then(|prefix| self.catalog.benchmark_link(prefix))
            .ok_or_else(|| ReturnsError::UnresolvedBenchmarkLink {
                identifier: identifier.to_string(),
                scheme: link_prefix.unwrap_or_default().to_string(),
            })?;

        Ok(SchemeRecord {
            scheme_code: row.scheme_code.clone(),
            scheme_name: link.scheme_name.clone().unwrap_or_default(),
            category: link.category.clone().unwrap_or_default(),
            benchmark: link.benchmark.clone(),
            symbol: row.nav_symbol().to_string(),
            short_name: row.short_name.clone().unwrap_or_default(),
            long_name: row.long_name.clone().unwrap_or_default(),
        })
    }

    /// Canonical benchmark name if `identifier` names a benchmark.
    ///
    /// An identifier is a benchmark when it is a primary index name or when
    /// more than one benchmark directory entry starts with it.
    fn benchmark_name(&self, identifier: &str) -> Option<String> {
        if PRIMARY_INDICES.contains(&identifier) {
            return Some(identifier.to_string());
        }

        match self.catalog.benchmarks_by_prefix(identifier).as_slice() {
            [first, _, ..] => first.benchmark.as_deref().map(canonical_benchmark_name),
            _ => None,
        }
    }
}

/// Narrow a name match down to the direct growth plan.
///
/// Rows marked "Dir Gr" win; otherwise a single non-IDCW row; otherwise the
/// first candidate in catalog order.
fn select_direct_growth<'r>(
    identifier: &str,
    candidates: Vec<&'r SchemeRow>,
) -> Vec<&'r SchemeRow> {
    let direct_growth: Vec<_> = candidates
        .iter()
        .copied()
        .filter(|row| row.long_name_contains(DIRECT_GROWTH_MARKER))
        .collect();
    if !direct_growth.is_empty() {
        return direct_growth;
    }

    let non_idcw: Vec<_> = candidates
        .iter()
        .copied()
        .filter(|row| !row.long_name_contains(IDCW_MARKER))
        .collect();
    if non_idcw.len() == 1 {
        return non_idcw;
    }

    // TODO: product review of the first-candidate tie-break for names that
    // match several plans without a direct growth variant.
    if candidates.len() > 1 {
        warn!(
            identifier,
            candidates = candidates.len(),
            selected = %candidates[0].scheme_code,
            "no direct growth plan, falling back to first candidate"
        );
    }
    candidates.into_iter().take(1).collect()
}

fn exactly_one<'r>(identifier: &str, rows: Vec<&'r SchemeRow>) -> Result<&'r SchemeRow> {
    match rows.as_slice() {
        [row] => Ok(*row),
        [] => Err(ReturnsError::UnresolvedScheme(identifier.to_string())),
        _ => Err(ReturnsError::AmbiguousScheme {
            identifier: identifier.to_string(),
            matches: rows.len(),
        }),
    }
}

fn truncate_chars(s: &str, max_chars: usize) -> &str {
    s.char_indices().nth(max_chars).map_or(s, |(idx, _)| &s[..idx])
}
