//! Period strings such as `"15y"`, `"1m"`, `"10d"` or `"1y6m"`.
//!
//! A period carries up to three independent tokens `<n>y`, `<n>m` and `<n>d`
//! in any order. The first occurrence of each unit wins and absent units are
//! zero. Offsets are subtracted from a reference date with calendar
//! arithmetic: years and months move together and clamp the day to the end
//! of the target month, then days are subtracted.

use crate::{Result, ReturnsError};
use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Calendar offset parsed from a period string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeriodOffset {
    /// Whole years
    pub years: u32,
    /// Whole months
    pub months: u32,
    /// Whole days
    pub days: u32,
}

impl PeriodOffset {
    /// Total calendar months covered by the year and month tokens.
    pub fn total_months(&self) -> Option<u32> {
        self.years.checked_mul(12)?.checked_add(self.months)
    }

    /// Subtract this offset from `date`.
    ///
    /// Returns `None` when the result falls outside chrono's date range.
    pub fn before(&self, date: NaiveDate) -> Option<NaiveDate> {
        date.checked_sub_months(Months::new(self.total_months()?))?
            .checked_sub_days(Days::new(u64::from(self.days)))
    }
}

/// Parse a period string into its year/month/day offset.
///
/// Fails with [`ReturnsError::InvalidPeriod`] when none of the three tokens
/// is present.
pub fn parse_offset(period: &str) -> Result<PeriodOffset> {
    let invalid = || ReturnsError::InvalidPeriod(period.to_string());

    let mut years = None;
    let mut months = None;
    let mut days = None;

    let bytes = period.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }

        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }

        let slot = match bytes.get(i) {
            Some(b'y') => &mut years,
            Some(b'm') => &mut months,
            Some(b'd') => &mut days,
            _ => continue,
        };
        if slot.is_none() {
            let value: u32 = period[start..i].parse().map_err(|_| invalid())?;
            *slot = Some(value);
        }
    }

    if years.is_none() && months.is_none() && days.is_none() {
        return Err(invalid());
    }

    Ok(PeriodOffset {
        years: years.unwrap_or(0),
        months: months.unwrap_or(0),
        days: days.unwrap_or(0),
    })
}

/// Date that lies `period` before `today`.
pub fn period_to_date(period: &str, today: NaiveDate) -> Result<NaiveDate> {
    parse_offset(period)?
        .before(today)
        .ok_or_else(|| ReturnsError::InvalidPeriod(period.to_string()))
}

/// Number of calendar days between `today` and [`period_to_date`].
pub fn period_to_days(period: &str, today: NaiveDate) -> Result<i64> {
    let start = period_to_date(period, today)?;
    Ok((today - start).num_days())
}
