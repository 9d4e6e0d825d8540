//! Daily NAV series and the NAV provider seam.

use crate::{Result, ReturnsError};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Date format used by `date` columns.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A single NAV observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NavPoint {
    /// Observation date
    pub date: NaiveDate,
    /// Net asset value per unit
    pub nav: f64,
}

impl NavPoint {
    /// Create an observation.
    pub const fn new(date: NaiveDate, nav: f64) -> Self {
        Self { date, nav }
    }
}

/// Date-ordered NAV observations with unique dates and positive values.
///
/// Dates need not be contiguous; weekends, holidays and missing data show up
/// as gaps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavSeries {
    points: Vec<NavPoint>,
}

impl NavSeries {
    /// Build a series, sorting by date.
    ///
    /// # Errors
    /// - [`ReturnsError::InvalidNav`] for non-positive or non-finite values
    /// - [`ReturnsError::DuplicateDate`] when two points share a date
    pub fn new(mut points: Vec<NavPoint>) -> Result<Self> {
        if let Some(bad) = points.iter().find(|p| !(p.nav.is_finite() && p.nav > 0.0)) {
            return Err(ReturnsError::InvalidNav {
                date: bad.date,
                nav: bad.nav,
            });
        }

        points.sort_by_key(|p| p.date);
        if let Some(pair) = points.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(ReturnsError::DuplicateDate(pair[0].date));
        }

        Ok(Self { points })
    }

    /// Build a series from a DataFrame.
    ///
    /// # Required Columns
    /// - `date`: `%Y-%m-%d` string or date
    /// - `nav`: numeric NAV; null rows are treated as missing observations
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        let dates = df
            .column("date")
            .map_err(|_| ReturnsError::MissingColumn("date".to_string()))?
            .cast(&DataType::String)?;
        let navs = df
            .column("nav")
            .map_err(|_| ReturnsError::MissingColumn("nav".to_string()))?
            .cast(&DataType::Float64)?;

        let mut points = Vec::with_capacity(df.height());
        for (date, nav) in dates.str()?.into_iter().zip(navs.f64()?.into_iter()) {
            let Some(nav) = nav else { continue };
            let date = date.ok_or_else(|| ReturnsError::InvalidDate("null".to_string()))?;
            points.push(NavPoint::new(parse_date(date)?, nav));
        }

        Self::new(points)
    }

    /// Render the series as a `{date, nav}` DataFrame.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let dates: Vec<String> = self
            .points
            .iter()
            .map(|p| p.date.format(DATE_FORMAT).to_string())
            .collect();
        let navs: Vec<f64> = self.points.iter().map(|p| p.nav).collect();

        Ok(df![
            "date" => dates,
            "nav" => navs,
        ]?)
    }

    /// Observations in date order.
    pub fn points(&self) -> &[NavPoint] {
        &self.points
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the series has no observations.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Earliest observation.
    pub fn first(&self) -> Option<&NavPoint> {
        self.points.first()
    }

    /// Latest observation.
    pub fn last(&self) -> Option<&NavPoint> {
        self.points.last()
    }

    /// Index of the earliest observation dated on or after `date`.
    ///
    /// Equals [`len`](Self::len) when every observation is earlier.
    pub fn position_at_or_after(&self, date: NaiveDate) -> usize {
        self.points.partition_point(|p| p.date < date)
    }

    /// Observations dated within `[start, end]`.
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> Self {
        let lo = self.position_at_or_after(start);
        let hi = self.points.partition_point(|p| p.date <= end).max(lo);
        Self {
            points: self.points[lo..hi].to_vec(),
        }
    }
}

/// Provider of daily NAV history keyed by symbol.
///
/// Implementations talk to external time-series sources. Provider failures
/// should be wrapped with [`ReturnsError::nav_source`] so callers see them
/// unchanged.
pub trait NavSource: Send + Sync + std::fmt::Debug {
    /// Fetch observations for `symbol` dated within `[start, end]`.
    fn fetch_nav(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<NavSeries>;
}

/// NAV source backed by series held in memory.
///
/// Unknown symbols yield an empty series.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNavSource {
    series: HashMap<String, NavSeries>,
}

impl InMemoryNavSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a series for `symbol`, replacing any previous one.
    pub fn insert(&mut self, symbol: impl Into<String>, series: NavSeries) {
        self.series.insert(symbol.into(), series);
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_series(mut self, symbol: impl Into<String>, series: NavSeries) -> Self {
        self.insert(symbol, series);
        self
    }
}

impl NavSource for InMemoryNavSource {
    fn fetch_nav(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<NavSeries> {
        Ok(self
            .series
            .get(symbol)
            .map(|s| s.between(start, end))
            .unwrap_or_default())
    }
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| ReturnsError::InvalidDate(value.to_string()))
}
