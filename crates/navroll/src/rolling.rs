//! Rolling window returns over NAV series.
//!
//! For every evaluation date `t` the engine looks at the trailing window
//! `[t - (D-1), t]`, where `D` is the window length in calendar days. A window
//! is only valid when the series has an observation exactly on its first day;
//! otherwise the point is undefined and dropped. Gaps from weekends and
//! holidays are routine, so dropped windows are not errors.
//!
//! Two flavours are provided:
//! - absolute: `last / first - 1`
//! - CAGR: `(last / first)^(1 / years) - 1` with `years = D / 365`, only for
//!   windows longer than a year; shorter windows fall back to absolute
//!
//! Sampling only selects which dates are evaluated (the last observation per
//! week or month); window starts are always looked up in the full series.

use crate::{
    Result, ReturnsError,
    nav::{DATE_FORMAT, NavSeries},
    period::period_to_days,
    scheme::SchemeRecord,
};
use chrono::NaiveDate;
use derive_more::Display;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

/// Days per year used to annualize windows.
pub const DAYS_PER_YEAR: i64 = 365;

/// Output column names, in order.
pub const OUTPUT_COLUMNS: [&str; 7] = [
    "symbol",
    "schemeName",
    "category",
    "date",
    "nav",
    "ratio",
    "percentage",
];

/// Grid on which window end dates are evaluated.
#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sampling {
    /// Every observation
    #[default]
    Daily,
    /// Last observation of each ISO week
    Weekly,
    /// Last observation of each calendar month
    Monthly,
}

impl Sampling {
    /// Period key over the `date` column grouping rows into one bucket.
    fn bucket(self) -> Option<Expr> {
        let date = col("date");
        match self {
            Self::Daily => None,
            Self::Weekly => Some(
                date.clone().dt().iso_year().cast(DataType::Int32) * lit(100)
                    + date.dt().week().cast(DataType::Int32),
            ),
            Self::Monthly => Some(
                date.clone().dt().year().cast(DataType::Int32) * lit(100)
                    + date.dt().month().cast(DataType::Int32),
            ),
        }
    }

    /// Row filter over a date-sorted `date` column selecting the evaluated
    /// observations: every row, or the last row of each bucket.
    pub fn evaluation_mask(self) -> Expr {
        self.bucket().map_or_else(
            || lit(true),
            |bucket| {
                bucket
                    .clone()
                    .neq(bucket.shift(lit(-1)))
                    .fill_null(lit(true))
            },
        )
    }
}

impl FromStr for Sampling {
    type Err = ReturnsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "d" | "daily" => Ok(Self::Daily),
            "w" | "weekly" => Ok(Self::Weekly),
            "m" | "me" | "monthly" => Ok(Self::Monthly),
            _ => Err(ReturnsError::InvalidSampling(s.to_string())),
        }
    }
}

/// How a window's start and end NAVs are turned into a return.
#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReturnMode {
    /// Point-to-point return over the window
    #[default]
    Absolute,
    /// Annualized return for windows longer than a year
    Cagr,
}

impl FromStr for ReturnMode {
    type Err = ReturnsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "absolute" | "abs" => Ok(Self::Absolute),
            "cagr" => Ok(Self::Cagr),
            _ => Err(ReturnsError::InvalidMode(s.to_string())),
        }
    }
}

/// Configuration for the rolling return engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollingReturnConfig {
    /// Window length as a period string, e.g. `"3y"`
    pub window: String,
    /// Evaluation grid
    pub sampling: Sampling,
    /// Return flavour used by [`RollingReturnEngine::compute`]
    pub mode: ReturnMode,
}

impl Default for RollingReturnConfig {
    fn default() -> Self {
        Self {
            window: "1y".to_string(),
            sampling: Sampling::Daily,
            mode: ReturnMode::Absolute,
        }
    }
}

/// One defined rolling window, tagged with scheme metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollingReturnPoint {
    /// NAV symbol of the scheme
    pub symbol: String,
    /// Canonical scheme name
    pub scheme_name: String,
    /// Scheme category
    pub category: String,
    /// Window end date
    pub date: NaiveDate,
    /// NAV on the window end date
    pub nav: f64,
    /// Return over the window
    pub ratio: f64,
    /// `ratio` as a percentage with two decimals, e.g. `"12.35%"`
    pub percentage: String,
}

/// Defined rolling return points in date order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RollingReturns {
    points: Vec<RollingReturnPoint>,
}

impl RollingReturns {
    /// Points in date order.
    pub fn points(&self) -> &[RollingReturnPoint] {
        &self.points
    }

    /// Consume into the underlying points.
    pub fn into_points(self) -> Vec<RollingReturnPoint> {
        self.points
    }

    /// Number of defined windows.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether no window was defined.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Render as a DataFrame with the columns in [`OUTPUT_COLUMNS`].
    pub fn to_frame(&self) -> Result<DataFrame> {
        let p = &self.points;
        let [symbol, scheme_name, category, date, nav, ratio, percentage] = OUTPUT_COLUMNS;

        Ok(df![
            symbol => p.iter().map(|x| x.symbol.as_str()).collect::<Vec<_>>(),
            scheme_name => p.iter().map(|x| x.scheme_name.as_str()).collect::<Vec<_>>(),
            category => p.iter().map(|x| x.category.as_str()).collect::<Vec<_>>(),
            date => p.iter().map(|x| x.date.format(DATE_FORMAT).to_string()).collect::<Vec<_>>(),
            nav => p.iter().map(|x| x.nav).collect::<Vec<_>>(),
            ratio => p.iter().map(|x| x.ratio).collect::<Vec<_>>(),
            percentage => p.iter().map(|x| x.percentage.as_str()).collect::<Vec<_>>(),
        ]?)
    }
}

/// Stack several result frames (e.g. fund and benchmark) for display.
pub fn concat_frames(frames: &[DataFrame]) -> Result<DataFrame> {
    if frames.is_empty() {
        return RollingReturns::default().to_frame();
    }

    let lazy: Vec<LazyFrame> = frames.iter().map(|f| f.clone().lazy()).collect();
    Ok(concat(lazy, UnionArgs::default())?.collect()?)
}

/// Computes rolling returns for a fixed window length.
#[derive(Debug, Clone)]
pub struct RollingReturnEngine {
    config: RollingReturnConfig,
    window_days: i64,
}

impl RollingReturnEngine {
    /// Create an engine for `window`, measured back from `today`.
    pub fn new(window: &str, sampling: Sampling, today: NaiveDate) -> Result<Self> {
        Self::with_config(
            RollingReturnConfig {
                window: window.to_string(),
                sampling,
                mode: ReturnMode::Absolute,
            },
            today,
        )
    }

    /// Create an engine from a configuration.
    ///
    /// The window day-count is fixed here; a zero-length window is rejected
    /// with [`ReturnsError::InvalidPeriod`].
    pub fn with_config(config: RollingReturnConfig, today: NaiveDate) -> Result<Self> {
        let window_days = period_to_days(&config.window, today)?;
        if window_days <= 0 {
            return Err(ReturnsError::InvalidPeriod(config.window));
        }

        Ok(Self {
            config,
            window_days,
        })
    }

    /// Current configuration.
    pub const fn config(&self) -> &RollingReturnConfig {
        &self.config
    }

    /// Window length `D` in calendar days.
    pub const fn window_days(&self) -> i64 {
        self.window_days
    }

    /// Rolling returns in the configured [`ReturnMode`].
    pub fn compute(&self, record: &SchemeRecord, nav: &NavSeries) -> Result<RollingReturns> {
        match self.config.mode {
            ReturnMode::Absolute => self.rolling_returns(record, nav),
            ReturnMode::Cagr => self.cagr_rolling_returns(record, nav),
        }
    }

    /// Absolute rolling returns.
    pub fn rolling_returns(
        &self,
        record: &SchemeRecord,
        nav: &NavSeries,
    ) -> Result<RollingReturns> {
        self.evaluate(record, nav, |growth| growth - lit(1.0))
    }

    /// Annualized rolling returns. Windows of a year or less are absolute.
    pub fn cagr_rolling_returns(
        &self,
        record: &SchemeRecord,
        nav: &NavSeries,
    ) -> Result<RollingReturns> {
        if self.window_days <= DAYS_PER_YEAR {
            return self.rolling_returns(record, nav);
        }

        let years = (self.window_days / DAYS_PER_YEAR) as f64;
        self.evaluate(record, nav, |growth| growth.pow(lit(1.0 / years)) - lit(1.0))
    }

    /// Join every evaluated row to the observation exactly `D - 1` days
    /// earlier; rows without one are dropped by the inner join.
    fn evaluate<F>(
        &self,
        record: &SchemeRecord,
        nav: &NavSeries,
        ratio: F,
    ) -> Result<RollingReturns>
    where
        F: FnOnce(Expr) -> Expr,
    {
        let (dates, navs): (Vec<NaiveDate>, Vec<f64>) =
            nav.points().iter().map(|p| (p.date, p.nav)).unzip();

        let series = DataFrame::new(vec![
            Column::new("date".into(), dates),
            Column::new("nav".into(), navs),
        ])?
        .lazy()
        .with_column(
            col("date")
                .cast(DataType::Int32)
                .cast(DataType::Int64)
                .alias("day"),
        );

        let starts = series
            .clone()
            .select([col("day").alias("start"), col("nav").alias("first_nav")]);

        let evaluated = series
            .filter(self.config.sampling.evaluation_mask())
            .collect()?;

        let windows = evaluated
            .clone()
            .lazy()
            .with_column((col("day") - lit(self.window_days - 1)).alias("start"))
            .join(
                starts,
                [col("start")],
                [col("start")],
                JoinArgs::new(JoinType::Inner),
            )
            .sort(["day"], Default::default())
            .select([
                col("date"),
                col("nav"),
                ratio(col("nav") / col("first_nav")).alias("ratio"),
            ])
            .collect()?;

        let points: Vec<RollingReturnPoint> = windows
            .column("date")?
            .date()?
            .as_date_iter()
            .zip(windows.column("nav")?.f64()?.into_no_null_iter())
            .zip(windows.column("ratio")?.f64()?.into_no_null_iter())
            .filter_map(|((date, nav), ratio)| {
                Some(RollingReturnPoint {
                    symbol: record.symbol.clone(),
                    scheme_name: record.scheme_name.clone(),
                    category: record.category.clone(),
                    date: date?,
                    nav,
                    ratio,
                    percentage: format!("{:.2}%", ratio * 100.0),
                })
            })
            .collect();

        debug!(
            symbol = %record.symbol,
            window_days = self.window_days,
            evaluated = evaluated.height(),
            dropped = evaluated.height() - points.len(),
            "computed rolling returns"
        );

        Ok(RollingReturns { points })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nav::NavPoint;
    use approx::assert_relative_eq;
    use chrono::Days;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record() -> SchemeRecord {
        SchemeRecord {
            scheme_code: "0P0000XVAA.BO".to_string(),
            scheme_name: "Axis Bluechip Fund".to_string(),
            category: "Large Cap Fund".to_string(),
            benchmark: Some("NIFTY 100 Total Return Index".to_string()),
            symbol: "0P0000XVAA.BO".to_string(),
            short_name: "Axis Bluechip Fund".to_string(),
            long_name: "Axis Bluechip Fund Dir Gr".to_string(),
        }
    }

    /// Daily series starting at `start` with NAV `100 + i`, skipping `missing`.
    fn daily(start: NaiveDate, n: u64, missing: &[u64]) -> NavSeries {
        let points = (0..n)
            .filter(|i| !missing.contains(i))
            .map(|i| NavPoint::new(start + Days::new(i), 100.0 + i as f64))
            .collect();
        NavSeries::new(points).unwrap()
    }

    #[test]
    fn test_window_days_from_period() {
        let today = date(2023, 6, 1);
        let days = |window: &str| {
            RollingReturnEngine::new(window, Sampling::Daily, today)
                .unwrap()
                .window_days()
        };
        assert_eq!(days("1y"), 365);
        assert_eq!(days("5d"), 5);
    }

    #[rstest]
    #[case("abc")]
    #[case("0d")]
    fn test_invalid_window(#[case] window: &str) {
        let err = RollingReturnEngine::new(window, Sampling::Daily, date(2024, 1, 1)).unwrap_err();
        assert!(matches!(err, ReturnsError::InvalidPeriod(_)));
    }

    #[rstest]
    #[case(10, "5d")]
    #[case(30, "10d")]
    #[case(5, "5d")]
    #[case(40, "1m")]
    fn test_gap_free_series_yields_n_minus_d_plus_one(#[case] n: u64, #[case] window: &str) {
        let today = date(2024, 3, 15);
        let engine = RollingReturnEngine::new(window, Sampling::Daily, today).unwrap();
        let d = engine.window_days() as usize;

        let result = engine
            .rolling_returns(&record(), &daily(date(2024, 1, 1), n, &[]))
            .unwrap();
        assert_eq!(result.len(), n as usize - d + 1);
    }

    #[test]
    fn test_absolute_ratio_values() {
        let engine = RollingReturnEngine::new("5d", Sampling::Daily, date(2024, 1, 1)).unwrap();
        let result = engine
            .rolling_returns(&record(), &daily(date(2024, 1, 1), 10, &[]))
            .unwrap();

        let first = &result.points()[0];
        assert_eq!(first.date, date(2024, 1, 5));
        assert_relative_eq!(first.ratio, 104.0 / 100.0 - 1.0, epsilon = 1e-12);
        assert_relative_eq!(first.nav, 104.0);

        let last = result.points().last().unwrap();
        assert_eq!(last.date, date(2024, 1, 10));
        assert_relative_eq!(last.ratio, 109.0 / 105.0 - 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_missing_window_start_drops_window() {
        let engine = RollingReturnEngine::new("5d", Sampling::Daily, date(2024, 1, 1)).unwrap();
        let start = date(2024, 1, 1);

        let full = engine
            .rolling_returns(&record(), &daily(start, 20, &[]))
            .unwrap();
        let gapped = engine
            .rolling_returns(&record(), &daily(start, 20, &[10]))
            .unwrap();

        assert_eq!(full.len(), 16);
        // The missing day itself and the window anchored on it disappear.
        assert_eq!(gapped.len(), 14);

        let dates: Vec<_> = gapped.points().iter().map(|p| p.date).collect();
        assert!(!dates.contains(&(start + Days::new(10))));
        assert!(!dates.contains(&(start + Days::new(14))));
        assert!(dates.contains(&(start + Days::new(13))));
        assert!(dates.contains(&(start + Days::new(15))));
    }

    #[test]
    fn test_cagr_two_year_doubling() {
        let today = date(2023, 12, 31);
        let engine = RollingReturnEngine::new("2y", Sampling::Daily, today).unwrap();
        assert_eq!(engine.window_days(), 730);

        let end = date(2023, 12, 31);
        let start = end - Days::new(729);
        let nav = NavSeries::new(vec![NavPoint::new(start, 10.0), NavPoint::new(end, 20.0)])
            .unwrap();

        let cagr = engine.cagr_rolling_returns(&record(), &nav).unwrap();
        assert_eq!(cagr.len(), 1);
        assert_relative_eq!(cagr.points()[0].ratio, 2f64.sqrt() - 1.0, epsilon = 1e-12);
        assert_eq!(cagr.points()[0].percentage, "41.42%");

        let absolute = engine.rolling_returns(&record(), &nav).unwrap();
        assert_relative_eq!(absolute.points()[0].ratio, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_cagr_short_window_is_absolute() {
        let engine = RollingReturnEngine::new("10d", Sampling::Daily, date(2024, 1, 1)).unwrap();
        let nav = daily(date(2024, 1, 1), 30, &[]);

        assert_eq!(
            engine.cagr_rolling_returns(&record(), &nav).unwrap(),
            engine.rolling_returns(&record(), &nav).unwrap()
        );
    }

    #[test]
    fn test_compute_dispatches_on_mode() {
        let config = RollingReturnConfig {
            window: "2y".to_string(),
            sampling: Sampling::Daily,
            mode: ReturnMode::Cagr,
        };
        let engine = RollingReturnEngine::with_config(config, date(2023, 12, 31)).unwrap();

        let end = date(2023, 12, 31);
        let nav = NavSeries::new(vec![
            NavPoint::new(end - Days::new(729), 10.0),
            NavPoint::new(end, 20.0),
        ])
        .unwrap();

        assert_eq!(
            engine.compute(&record(), &nav).unwrap(),
            engine.cagr_rolling_returns(&record(), &nav).unwrap()
        );
    }

    #[test]
    fn test_empty_and_short_series() {
        let engine = RollingReturnEngine::new("10d", Sampling::Daily, date(2024, 1, 1)).unwrap();

        let empty = engine
            .rolling_returns(&record(), &NavSeries::default())
            .unwrap();
        assert!(empty.is_empty());

        let short = daily(date(2024, 1, 1), 9, &[]);
        let result = engine.rolling_returns(&record(), &short).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_percentage_label_and_metadata() {
        let engine = RollingReturnEngine::new("2d", Sampling::Daily, date(2024, 1, 1)).unwrap();
        let nav = NavSeries::new(vec![
            NavPoint::new(date(2024, 1, 1), 100.0),
            NavPoint::new(date(2024, 1, 2), 112.3456),
            NavPoint::new(date(2024, 1, 3), 101.0792),
        ])
        .unwrap();

        let result = engine.rolling_returns(&record(), &nav).unwrap();
        assert_eq!(result.len(), 2);

        let point = &result.points()[0];
        assert_eq!(point.percentage, "12.35%");
        assert_eq!(point.symbol, "0P0000XVAA.BO");
        assert_eq!(point.scheme_name, "Axis Bluechip Fund");
        assert_eq!(point.category, "Large Cap Fund");
        assert_eq!(result.points()[1].percentage, "-10.03%");
    }

    #[test]
    fn test_weekly_sampling_keeps_window_semantics() {
        let engine = RollingReturnEngine::new("1d", Sampling::Weekly, date(2024, 1, 1)).unwrap();
        // 2024-01-01 is a Monday; four full ISO weeks.
        let result = engine
            .rolling_returns(&record(), &daily(date(2024, 1, 1), 28, &[]))
            .unwrap();

        let dates: Vec<_> = result.points().iter().map(|p| p.date).collect();
        assert_eq!(
            dates,
            vec![date(2024, 1, 7), date(2024, 1, 14), date(2024, 1, 21), date(2024, 1, 28)]
        );

        let engine = RollingReturnEngine::new("3d", Sampling::Weekly, date(2024, 1, 1)).unwrap();
        let result = engine
            .rolling_returns(&record(), &daily(date(2024, 1, 1), 28, &[]))
            .unwrap();
        assert_relative_eq!(result.points()[0].ratio, 106.0 / 104.0 - 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_monthly_sampling() {
        let engine = RollingReturnEngine::new("1d", Sampling::Monthly, date(2024, 1, 1)).unwrap();
        let result = engine
            .rolling_returns(&record(), &daily(date(2024, 1, 1), 70, &[]))
            .unwrap();

        let dates: Vec<_> = result.points().iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![date(2024, 1, 31), date(2024, 2, 29), date(2024, 3, 10)]);
    }

    #[test]
    fn test_evaluation_mask_keeps_last_row_per_bucket() {
        let df = df![
            "date" => [
                date(2024, 1, 30),
                date(2024, 1, 31),
                date(2024, 2, 1),
                date(2024, 2, 5),
            ],
        ]
        .unwrap();

        let monthly = df
            .clone()
            .lazy()
            .filter(Sampling::Monthly.evaluation_mask())
            .collect()
            .unwrap();
        let dates: Vec<_> = monthly
            .column("date")
            .unwrap()
            .date()
            .unwrap()
            .as_date_iter()
            .flatten()
            .collect();
        assert_eq!(dates, vec![date(2024, 1, 31), date(2024, 2, 5)]);

        // 2024-02-01 closes ISO week 5; 2024-02-05 opens week 6.
        let weekly = df
            .clone()
            .lazy()
            .filter(Sampling::Weekly.evaluation_mask())
            .collect()
            .unwrap();
        assert_eq!(weekly.height(), 2);

        let daily = df
            .lazy()
            .filter(Sampling::Daily.evaluation_mask())
            .collect()
            .unwrap();
        assert_eq!(daily.height(), 4);
    }

    #[rstest]
    #[case("D", Sampling::Daily)]
    #[case("w", Sampling::Weekly)]
    #[case("Monthly", Sampling::Monthly)]
    fn test_sampling_from_str(#[case] input: &str, #[case] expected: Sampling) {
        assert_eq!(input.parse::<Sampling>().unwrap(), expected);
    }

    #[test]
    fn test_invalid_sampling_and_mode() {
        assert!(matches!("Q".parse::<Sampling>(), Err(ReturnsError::InvalidSampling(_))));
        assert!(matches!("log".parse::<ReturnMode>(), Err(ReturnsError::InvalidMode(_))));
        assert_eq!("CAGR".parse::<ReturnMode>().unwrap(), ReturnMode::Cagr);
    }

    #[test]
    fn test_config_deserialize_with_defaults() {
        let config: RollingReturnConfig =
            serde_json::from_str(r#"{"window": "3y", "mode": "Cagr"}"#).unwrap();
        assert_eq!(config.window, "3y");
        assert_eq!(config.sampling, Sampling::Daily);
        assert_eq!(config.mode, ReturnMode::Cagr);

        let config: RollingReturnConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, RollingReturnConfig::default());
    }

    #[test]
    fn test_to_frame_column_order() {
        let engine = RollingReturnEngine::new("5d", Sampling::Daily, date(2024, 1, 1)).unwrap();
        let result = engine
            .rolling_returns(&record(), &daily(date(2024, 1, 1), 10, &[]))
            .unwrap();
        let df = result.to_frame().unwrap();

        let names: Vec<_> = df.get_column_names().iter().map(|c| c.as_str()).collect();
        assert_eq!(names, OUTPUT_COLUMNS.to_vec());
        assert_eq!(df.height(), 6);

        let dates = df
            .column("date")
            .unwrap()
            .str()
            .unwrap()
            .into_no_null_iter()
            .collect::<Vec<_>>();
        assert_eq!(dates[0], "2024-01-05");
    }

    #[test]
    fn test_concat_frames() {
        let engine = RollingReturnEngine::new("5d", Sampling::Daily, date(2024, 1, 1)).unwrap();
        let fund = engine
            .rolling_returns(&record(), &daily(date(2024, 1, 1), 10, &[]))
            .unwrap();
        let benchmark = SchemeRecord::benchmark("NIFTY 100");
        let index = engine
            .rolling_returns(&benchmark, &daily(date(2024, 1, 1), 8, &[]))
            .unwrap();

        let stacked =
            concat_frames(&[fund.to_frame().unwrap(), index.to_frame().unwrap()]).unwrap();
        assert_eq!(stacked.height(), 6 + 4);

        let empty = concat_frames(&[]).unwrap();
        assert_eq!(empty.height(), 0);
        assert_eq!(empty.width(), OUTPUT_COLUMNS.len());
    }
}
