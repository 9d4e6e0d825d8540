#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/navroll/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod capture;
pub mod catalog;
pub mod error;
pub mod nav;
pub mod period;
pub mod pipeline;
pub mod rolling;
pub mod scheme;

// Re-export core types
pub use capture::{CaptureResult, capture_ratio, capture_ratios};
pub use catalog::{BenchmarkRow, ReferenceCatalog, SchemeRow};
pub use error::{CaptureSide, Result, ReturnsError};
pub use nav::{InMemoryNavSource, NavPoint, NavSeries, NavSource};
pub use period::{PeriodOffset, parse_offset, period_to_date, period_to_days};
pub use pipeline::{SchemeReturns, rolling_returns_for};
pub use rolling::{
    ReturnMode, RollingReturnConfig, RollingReturnEngine, RollingReturnPoint, RollingReturns,
    Sampling, concat_frames,
};
pub use scheme::{SchemeRecord, SchemeResolver};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
