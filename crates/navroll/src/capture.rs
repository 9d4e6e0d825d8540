//! Upside and downside market capture ratios.
//!
//! Rows are split by the sign of the benchmark return: `>= 0` is the up
//! market, `< 0` the down market. Within each partition returns are linked
//! geometrically, `Π(1 + r) - 1`, and the fund's linked return is expressed
//! as a percentage of the benchmark's, rounded to two decimals.
//!
//! A partition with no rows, or whose linked benchmark return is zero, has
//! no ratio. That is reported as `None`, never as zero.

use crate::{CaptureSide, Result, ReturnsError};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Capture ratios for one fund column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureResult {
    /// Fund column name
    pub column: String,
    /// Upside capture in percent, `None` when undefined
    pub upside: Option<f64>,
    /// Downside capture in percent, `None` when undefined
    pub downside: Option<f64>,
}

impl CaptureResult {
    /// Upside capture, or [`ReturnsError::UndefinedRatio`].
    pub fn upside_pct(&self) -> Result<f64> {
        self.upside.ok_or_else(|| self.undefined(CaptureSide::Upside))
    }

    /// Downside capture, or [`ReturnsError::UndefinedRatio`].
    pub fn downside_pct(&self) -> Result<f64> {
        self.downside
            .ok_or_else(|| self.undefined(CaptureSide::Downside))
    }

    fn undefined(&self, side: CaptureSide) -> ReturnsError {
        ReturnsError::UndefinedRatio {
            column: self.column.clone(),
            side,
        }
    }
}

/// Capture ratios for each fund column against `benchmark`.
///
/// `NaN` entries are treated as missing: a missing benchmark return excludes
/// the row from both partitions, a missing fund return is skipped when
/// linking that fund.
pub fn capture_ratios(funds: &[(&str, &[f64])], benchmark: &[f64]) -> Result<Vec<CaptureResult>> {
    if let Some((column, values)) = funds.iter().find(|(_, v)| v.len() != benchmark.len()) {
        return Err(ReturnsError::ColumnLengthMismatch {
            column: column.to_string(),
            len: values.len(),
            expected: benchmark.len(),
        });
    }
    if funds.is_empty() {
        return Ok(Vec::new());
    }

    // Positional names keep duplicate fund labels apart inside the frame.
    let mut names: Vec<String> = (0..funds.len()).map(|i| format!("fund_{i}")).collect();
    names.push("benchmark".to_string());

    let columns = funds
        .iter()
        .map(|(_, values)| *values)
        .chain(std::iter::once(benchmark))
        .zip(&names)
        .map(|(values, name)| Column::new(name.as_str().into(), missing_as_null(values)))
        .collect();
    let df = DataFrame::new(columns)?;

    let labels: Vec<&str> = funds.iter().map(|(column, _)| *column).collect();
    capture_frame(df.lazy(), &names, &labels)
}

/// Capture ratios from a return table.
///
/// Fund return columns come first and the benchmark return column last.
/// A null or `NaN` benchmark return excludes the row from both partitions; a
/// null or `NaN` fund return is skipped when linking that fund only.
pub fn capture_ratio(returns: &DataFrame) -> Result<Vec<CaptureResult>> {
    let names: Vec<String> = returns
        .get_column_names()
        .iter()
        .map(|c| c.to_string())
        .collect();
    match names.len() {
        0 => return Err(ReturnsError::MissingColumn("benchmark".to_string())),
        1 => return Err(ReturnsError::MissingColumn("fund".to_string())),
        _ => {}
    }

    let labels: Vec<&str> = names
        .iter()
        .take(names.len() - 1)
        .map(String::as_str)
        .collect();
    capture_frame(returns.clone().lazy(), &names, &labels)
}

/// Up and down capture over `lf`, whose last column in `names` is the
/// benchmark. `labels` name the fund columns in the result.
fn capture_frame(lf: LazyFrame, names: &[String], labels: &[&str]) -> Result<Vec<CaptureResult>> {
    let benchmark = names[names.len() - 1].as_str();

    let returns = lf
        .with_columns(
            names
                .iter()
                .map(|c| col(c.as_str()).cast(DataType::Float64).fill_nan(lit(NULL)))
                .collect::<Vec<_>>(),
        )
        .filter(col(benchmark).is_not_null());

    let upside = partition_ratios(
        returns.clone().filter(col(benchmark).gt_eq(lit(0.0))),
        names,
    )?;
    let downside = partition_ratios(returns.filter(col(benchmark).lt(lit(0.0))), names)?;

    Ok(labels
        .iter()
        .zip(upside.into_iter().zip(downside))
        .map(|(column, (upside, downside))| CaptureResult {
            column: column.to_string(),
            upside,
            downside,
        })
        .collect())
}

/// Linked fund return as a percentage of the linked benchmark return, one
/// value per fund column.
///
/// An empty partition links to zero on both sides and so has no ratio.
fn partition_ratios(partition: LazyFrame, names: &[String]) -> Result<Vec<Option<f64>>> {
    let (benchmark, funds) = names
        .split_last()
        .ok_or_else(|| ReturnsError::MissingColumn("benchmark".to_string()))?;

    let linked = names
        .iter()
        .map(|c| ((lit(1.0) + col(c.as_str())).product() - lit(1.0)).alias(c.as_str()))
        .collect::<Vec<_>>();
    let ratios = funds
        .iter()
        .map(|c| (col(c.as_str()) / col(benchmark.as_str()) * lit(100.0)).alias(c.as_str()))
        .collect::<Vec<_>>();

    let df = partition.select(linked).select(ratios).collect()?;

    funds
        .iter()
        .map(|c| Ok(round_pct(df.column(c.as_str())?.f64()?.get(0))))
        .collect()
}

/// Round to two decimals; non-finite values (zero benchmark) are undefined.
fn round_pct(pct: Option<f64>) -> Option<f64> {
    pct.filter(|p| p.is_finite())
        .map(|p| (p * 100.0).round_ties_even() / 100.0)
}

fn missing_as_null(values: &[f64]) -> Vec<Option<f64>> {
    values.iter().map(|&v| (!v.is_nan()).then_some(v)).collect()
}
