//! Report periods, chart series and summaries

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use super::stats::{rate, StatusCounts};
use crate::storage::{AttendanceRecord, AttendanceStatus};

/// Reporting window ending today
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportPeriod {
    /// Since the start of the current week (Sunday)
    #[default]
    Week,
    /// Last 30 days
    Month,
    /// Last 365 days
    Year,
}

impl ReportPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportPeriod::Week => "week",
            ReportPeriod::Month => "month",
            ReportPeriod::Year => "year",
        }
    }

    /// First day included in the period
    pub fn start_date(&self, today: NaiveDate) -> NaiveDate {
        match self {
            ReportPeriod::Week => {
                today - Duration::days(today.weekday().num_days_from_sunday() as i64)
            }
            ReportPeriod::Month => today - Duration::days(30),
            ReportPeriod::Year => today - Duration::days(365),
        }
    }
}

impl fmt::Display for ReportPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "week" => Ok(ReportPeriod::Week),
            "month" => Ok(ReportPeriod::Month),
            "year" => Ok(ReportPeriod::Year),
            other => Err(format!("unknown report period: {}", other)),
        }
    }
}

/// One point of the daily chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailySeries {
    pub date: NaiveDate,
    /// `dd/MM`
    pub label: String,
    pub present: usize,
    pub absent: usize,
    pub late: usize,
}

impl DailySeries {
    pub fn total(&self) -> usize {
        self.present + self.absent + self.late
    }
}

/// One bar of the per-class chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassSeries {
    pub class: String,
    pub present: usize,
    pub absent: usize,
    pub late: usize,
}

/// One slice of the status pie
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSlice {
    pub status: AttendanceStatus,
    pub count: usize,
    pub color: &'static str,
}

/// Headline numbers of a report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub total_records: usize,
    /// Distinct days with at least one record
    pub total_sessions: usize,
    pub avg_rate: f64,
    pub classes: Vec<String>,
}

/// Chart colour of a status
pub fn status_color(status: AttendanceStatus) -> &'static str {
    match status {
        AttendanceStatus::Present => "#10B981",
        AttendanceStatus::Absent => "#EF4444",
        AttendanceStatus::Late => "#F59E0B",
        AttendanceStatus::Excused => "#6366F1",
    }
}

/// Per-day present/absent/late counts, oldest day first
///
/// Excused records do not appear in the daily chart.
pub fn daily_series(records: &[AttendanceRecord]) -> Vec<DailySeries> {
    let mut days: BTreeMap<NaiveDate, StatusCounts> = BTreeMap::new();
    for record in records {
        days.entry(record.date).or_default().add(record.status);
    }

    days.into_iter()
        .map(|(date, counts)| DailySeries {
            date,
            label: date.format("%d/%m").to_string(),
            present: counts.present,
            absent: counts.absent,
            late: counts.late,
        })
        .collect()
}

/// Per-class present/absent/late counts, ordered by class name
pub fn class_series(records: &[AttendanceRecord]) -> Vec<ClassSeries> {
    let mut classes: BTreeMap<&str, StatusCounts> = BTreeMap::new();
    for record in records {
        classes.entry(record.class.as_str()).or_default().add(record.status);
    }

    classes
        .into_iter()
        .map(|(class, counts)| ClassSeries {
            class: class.to_string(),
            present: counts.present,
            absent: counts.absent,
            late: counts.late,
        })
        .collect()
}

/// Pie slices for every status with at least one record
pub fn status_distribution(counts: &StatusCounts) -> Vec<StatusSlice> {
    AttendanceStatus::all()
        .iter()
        .map(|&status| StatusSlice {
            status,
            count: counts.get(status),
            color: status_color(status),
        })
        .filter(|slice| slice.count > 0)
        .collect()
}

impl ReportSummary {
    pub fn from_records(records: &[AttendanceRecord]) -> Self {
        let sessions: BTreeSet<NaiveDate> = records.iter().map(|r| r.date).collect();
        let classes: BTreeSet<&str> = records.iter().map(|r| r.class.as_str()).collect();
        let counts = StatusCounts::from_records(records);

        Self {
            total_records: records.len(),
            total_sessions: sessions.len(),
            avg_rate: counts.attendance_rate(),
            classes: classes.into_iter().map(String::from).collect(),
        }
    }
}

/// Everything the reports screen renders
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub period: ReportPeriod,
    /// `None` means all classes
    pub class: Option<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub counts: StatusCounts,
    pub daily: Vec<DailySeries>,
    /// Only present for all-class reports
    pub by_class: Option<Vec<ClassSeries>>,
    pub distribution: Vec<StatusSlice>,
    pub summary: ReportSummary,
}

impl Report {
    /// Aggregate `records` for `period`, keeping only `class` when given
    ///
    /// Records outside the period are ignored, so callers may pass a wider set.
    pub fn build(
        records: &[AttendanceRecord],
        period: ReportPeriod,
        class: Option<&str>,
        today: NaiveDate,
    ) -> Self {
        let class = class
            .map(str::trim)
            .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("all"));
        let start = period.start_date(today);

        let selected: Vec<AttendanceRecord> = records
            .iter()
            .filter(|r| r.date >= start && r.date <= today)
            .filter(|r| class.map_or(true, |c| r.class == c))
            .cloned()
            .collect();

        let counts = StatusCounts::from_records(&selected);

        Self {
            period,
            class: class.map(String::from),
            start,
            end: today,
            counts,
            daily: daily_series(&selected),
            by_class: class.is_none().then(|| class_series(&selected)),
            distribution: status_distribution(&counts),
            summary: ReportSummary::from_records(&selected),
        }
    }

    /// Present share of the day's present/absent/late records
    pub fn daily_rate(day: &DailySeries) -> f64 {
        rate(day.present, day.total())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::stats::tests::record;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_period_start_dates() {
        // 2024-03-20 is a Wednesday
        let today = day(20);
        assert_eq!(ReportPeriod::Week.start_date(today), day(17));
        assert_eq!(ReportPeriod::Week.start_date(day(17)), day(17));
        assert_eq!(
            ReportPeriod::Month.start_date(today),
            NaiveDate::from_ymd_opt(2024, 2, 19).unwrap()
        );
        assert_eq!(
            ReportPeriod::Year.start_date(today),
            NaiveDate::from_ymd_opt(2023, 3, 21).unwrap()
        );
    }

    #[test]
    fn test_period_parse() {
        assert_eq!("Month".parse::<ReportPeriod>(), Ok(ReportPeriod::Month));
        assert!("decade".parse::<ReportPeriod>().is_err());
    }

    #[test]
    fn test_daily_series_ascending_without_excused() {
        let records = vec![
            record(1, "12A1", day(19), AttendanceStatus::Present),
            record(2, "12A1", day(18), AttendanceStatus::Late),
            record(3, "12A1", day(19), AttendanceStatus::Excused),
            record(4, "12A2", day(19), AttendanceStatus::Absent),
        ];

        let series = daily_series(&records);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].label, "18/03");
        assert_eq!(series[0].late, 1);
        assert_eq!(series[1].label, "19/03");
        assert_eq!(series[1].total(), 2);
    }

    #[test]
    fn test_distribution_drops_empty_slices() {
        let counts = StatusCounts {
            present: 3,
            absent: 0,
            late: 1,
            excused: 0,
        };
        let slices = status_distribution(&counts);
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].color, "#10B981");
        assert_eq!(slices[1].status, AttendanceStatus::Late);
    }

    #[test]
    fn test_report_all_classes() {
        let today = day(20);
        let records = vec![
            record(1, "12A1", day(18), AttendanceStatus::Present),
            record(2, "12A2", day(19), AttendanceStatus::Absent),
            record(3, "12A2", day(19), AttendanceStatus::Present),
            record(4, "12A1", day(10), AttendanceStatus::Present),
        ];

        let report = Report::build(&records, ReportPeriod::Week, Some("all"), today);
        assert_eq!(report.class, None);
        assert_eq!(report.counts.total(), 3);
        assert_eq!(report.summary.total_sessions, 2);
        assert_eq!(report.summary.classes, vec!["12A1", "12A2"]);
        assert!((report.summary.avg_rate - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(report.by_class.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn test_report_single_class() {
        let today = day(20);
        let records = vec![
            record(1, "12A1", day(18), AttendanceStatus::Present),
            record(2, "12A2", day(19), AttendanceStatus::Absent),
        ];

        let report = Report::build(&records, ReportPeriod::Month, Some("12A1"), today);
        assert_eq!(report.class.as_deref(), Some("12A1"));
        assert!(report.by_class.is_none());
        assert_eq!(report.summary.total_records, 1);
        assert_eq!(report.summary.avg_rate, 100.0);
    }

    #[test]
    fn test_report_empty() {
        let report = Report::build(&[], ReportPeriod::Year, None, day(20));
        assert!(report.daily.is_empty());
        assert!(report.distribution.is_empty());
        assert_eq!(report.summary.total_sessions, 0);
        assert_eq!(report.summary.avg_rate, 0.0);
    }
}
