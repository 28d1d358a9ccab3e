//! Attendance Aggregation
//!
//! Pure functions over already-fetched record sets. Nothing here touches
//! storage; every figure is recomputed from scratch on each call.
//!
//! # Example
//!
//! ```
//! use school_attendance::report::{rate, AttendanceFilter, Report, ReportPeriod};
//!
//! let report = Report::build(&[], ReportPeriod::Week, None, school_attendance::report::today());
//! assert_eq!(report.summary.avg_rate, 0.0);
//! assert_eq!(rate(7, 10), 70.0);
//! assert!(AttendanceFilter::default().apply(&[]).is_empty());
//! ```

mod filter;
mod series;
mod stats;

pub use filter::{paginate, search_users, AttendanceFilter, Page, RoleCounts, DEFAULT_PER_PAGE};
pub use series::{
    class_series, daily_series, status_color, status_distribution, ClassSeries, DailySeries,
    Report, ReportPeriod, ReportSummary, StatusSlice,
};
pub use stats::{class_activity, rate, AttendanceStats, ClassActivity, DayStats, StatusCounts, WindowStats};

use chrono::NaiveDate;

/// The server's local calendar day
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
