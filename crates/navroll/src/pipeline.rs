//! Identifier to rolling-return table.
//!
//! Chains the resolver, a [`NavSource`] and a [`RollingReturnEngine`] for a
//! single identifier. Failures are returned per identifier so a caller
//! processing many funds can skip or report the ones that fail.

use crate::{
    Result, ReturnsError,
    nav::{NavSeries, NavSource},
    period::period_to_date,
    rolling::{RollingReturnEngine, RollingReturns},
    scheme::{SchemeRecord, SchemeResolver},
};
use chrono::NaiveDate;
use tracing::debug;

/// Everything produced for one identifier.
#[derive(Debug, Clone)]
pub struct SchemeReturns {
    /// Resolved scheme
    pub record: SchemeRecord,
    /// NAV history used for the computation
    pub nav: NavSeries,
    /// Defined rolling windows
    pub returns: RollingReturns,
}

/// Resolve `identifier`, fetch `history` worth of NAV up to `today` and
/// compute rolling returns in the engine's configured mode.
///
/// # Errors
/// - resolution errors from [`SchemeResolver::resolve`]
/// - [`ReturnsError::MissingSymbol`] for benchmarks without a quote symbol
/// - [`ReturnsError::InvalidPeriod`] for a malformed `history`
/// - provider errors from the [`NavSource`], unchanged
pub fn rolling_returns_for(
    resolver: &SchemeResolver<'_>,
    source: &dyn NavSource,
    identifier: &str,
    history: &str,
    engine: &RollingReturnEngine,
    today: NaiveDate,
) -> Result<SchemeReturns> {
    let record = resolver.resolve(identifier)?;
    if !record.has_nav_symbol() {
        return Err(ReturnsError::MissingSymbol(record.scheme_name));
    }

    let start = period_to_date(history, today)?;
    let nav = source.fetch_nav(&record.symbol, start, today)?;
    debug!(
        identifier,
        symbol = %record.symbol,
        %start,
        %today,
        observations = nav.len(),
        "fetched NAV history"
    );

    let returns = engine.compute(&record, &nav)?;
    Ok(SchemeReturns {
        record,
        nav,
        returns,
    })
}
