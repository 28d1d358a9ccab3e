//! Status counts and dashboard statistics

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::storage::{AttendanceRecord, AttendanceStatus};

/// Seconds within which a class's latest check-in counts as new
const NEW_ACTIVITY_SECS: i64 = 60;

/// Percentage `numerator / denominator * 100`, 0 when the denominator is 0
pub fn rate(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    numerator as f64 / denominator as f64 * 100.0
}

/// Per-status tallies of a record set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub present: usize,
    pub absent: usize,
    pub late: usize,
    pub excused: usize,
}

impl StatusCounts {
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a AttendanceRecord>,
    {
        let mut counts = Self::default();
        for record in records {
            counts.add(record.status);
        }
        counts
    }

    pub fn add(&mut self, status: AttendanceStatus) {
        match status {
            AttendanceStatus::Present => self.present += 1,
            AttendanceStatus::Absent => self.absent += 1,
            AttendanceStatus::Late => self.late += 1,
            AttendanceStatus::Excused => self.excused += 1,
        }
    }

    pub fn get(&self, status: AttendanceStatus) -> usize {
        match status {
            AttendanceStatus::Present => self.present,
            AttendanceStatus::Absent => self.absent,
            AttendanceStatus::Late => self.late,
            AttendanceStatus::Excused => self.excused,
        }
    }

    pub fn total(&self) -> usize {
        self.present + self.absent + self.late + self.excused
    }

    /// Present share of all records, as a percentage
    pub fn attendance_rate(&self) -> f64 {
        rate(self.present, self.total())
    }
}

/// Today's figures on the dashboard
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DayStats {
    pub present: usize,
    pub absent: usize,
    pub late: usize,
    pub rate: f64,
}

/// Rolling-window figures on the dashboard
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WindowStats {
    pub present: usize,
    pub rate: f64,
}

/// Dashboard statistics
///
/// Rates are measured against the roster, not against the records:
/// absent is whoever has not checked in as present today.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AttendanceStats {
    pub total_students: usize,
    pub today: DayStats,
    pub week: WindowStats,
    pub month: WindowStats,
}

impl AttendanceStats {
    pub fn compute(records: &[AttendanceRecord], today: NaiveDate, total_students: usize) -> Self {
        let since = |days: i64| {
            let start = today - Duration::days(days);
            StatusCounts::from_records(records.iter().filter(move |r| r.date >= start))
        };

        let day = since(0);
        let week = since(7);
        let month = since(30);

        Self {
            total_students,
            today: DayStats {
                present: day.present,
                absent: total_students.saturating_sub(day.present),
                late: day.late,
                rate: rate(day.present, total_students),
            },
            week: WindowStats {
                present: week.present,
                rate: rate(week.present, total_students * 7),
            },
            month: WindowStats {
                present: month.present,
                rate: rate(month.present, total_students * 30),
            },
        }
    }
}

/// Check-in activity of one class today
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassActivity {
    pub class: String,
    pub present: usize,
    pub total: usize,
    pub latest: DateTime<Utc>,
    pub is_new: bool,
}

/// Today's records grouped by class, most recently active class first
pub fn class_activity(
    records: &[AttendanceRecord],
    today: NaiveDate,
    now: DateTime<Utc>,
    limit: usize,
) -> Vec<ClassActivity> {
    let mut by_class: HashMap<&str, ClassActivity> = HashMap::new();

    for record in records.iter().filter(|r| r.date == today) {
        let entry = by_class
            .entry(record.class.as_str())
            .or_insert_with(|| ClassActivity {
                class: record.class.clone(),
                present: 0,
                total: 0,
                latest: record.timestamp,
                is_new: false,
            });
        entry.total += 1;
        if record.status == AttendanceStatus::Present {
            entry.present += 1;
        }
        if record.timestamp > entry.latest {
            entry.latest = record.timestamp;
        }
    }

    let mut activity: Vec<ClassActivity> = by_class
        .into_values()
        .map(|mut a| {
            a.is_new = (now - a.latest).num_seconds().abs() <= NEW_ACTIVITY_SECS;
            a
        })
        .collect();

    activity.sort_by(|a, b| b.latest.cmp(&a.latest).then_with(|| a.class.cmp(&b.class)));
    activity.truncate(limit);
    activity
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn record(
        id: usize,
        class: &str,
        date: NaiveDate,
        status: AttendanceStatus,
    ) -> AttendanceRecord {
        AttendanceRecord {
            id: id.to_string(),
            student_id: format!("s{}", id),
            student_name: format!("Student {}", id),
            student_code: format!("SV{:03}", id),
            class: class.to_string(),
            date,
            status,
            timestamp: Utc
                .from_utc_datetime(&date.and_hms_opt(7, 0, 0).unwrap())
                + Duration::minutes(id as i64),
            scanned_by: None,
            confidence: None,
            session_id: None,
            note: None,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_counts_partition_records() {
        let statuses = [
            AttendanceStatus::Present,
            AttendanceStatus::Late,
            AttendanceStatus::Present,
            AttendanceStatus::Excused,
            AttendanceStatus::Absent,
        ];
        let records: Vec<_> = statuses
            .iter()
            .enumerate()
            .map(|(i, s)| record(i, "12A1", day(1), *s))
            .collect();

        let counts = StatusCounts::from_records(&records);
        assert_eq!(counts.total(), records.len());
        assert_eq!(counts.present, 2);
        assert_eq!(counts.get(AttendanceStatus::Excused), 1);
    }

    #[test]
    fn test_rate_examples() {
        let mut records: Vec<_> = (0..7)
            .map(|i| record(i, "12A1", day(1), AttendanceStatus::Present))
            .collect();
        records.extend((7..10).map(|i| record(i, "12A1", day(1), AttendanceStatus::Absent)));

        assert_eq!(StatusCounts::from_records(&records).attendance_rate(), 70.0);
        assert_eq!(StatusCounts::from_records(&[]).attendance_rate(), 0.0);
        assert_eq!(rate(3, 0), 0.0);
    }

    #[test]
    fn test_dashboard_stats() {
        let today = day(20);
        let records = vec![
            record(1, "12A1", today, AttendanceStatus::Present),
            record(2, "12A1", today, AttendanceStatus::Late),
            record(3, "12A2", day(15), AttendanceStatus::Present),
            record(4, "12A2", day(1), AttendanceStatus::Present),
        ];

        let stats = AttendanceStats::compute(&records, today, 4);
        assert_eq!(stats.today.present, 1);
        assert_eq!(stats.today.late, 1);
        assert_eq!(stats.today.absent, 3);
        assert_eq!(stats.today.rate, 25.0);
        assert_eq!(stats.week.present, 2);
        assert_eq!(stats.week.rate, rate(2, 28));
        assert_eq!(stats.month.present, 3);
    }

    #[test]
    fn test_dashboard_stats_without_students() {
        let today = day(20);
        let records = vec![record(1, "12A1", today, AttendanceStatus::Present)];

        let stats = AttendanceStats::compute(&records, today, 0);
        assert_eq!(stats.today.absent, 0);
        assert_eq!(stats.today.rate, 0.0);
        assert_eq!(stats.month.rate, 0.0);
    }

    #[test]
    fn test_class_activity_orders_and_limits() {
        let today = day(20);
        let records = vec![
            record(1, "12A1", today, AttendanceStatus::Present),
            record(5, "12A2", today, AttendanceStatus::Absent),
            record(6, "12A2", today, AttendanceStatus::Present),
            record(9, "12A3", day(19), AttendanceStatus::Present),
        ];
        let now = records[2].timestamp + Duration::seconds(30);

        let activity = class_activity(&records, today, now, 5);
        assert_eq!(activity.len(), 2);
        assert_eq!(activity[0].class, "12A2");
        assert_eq!(activity[0].total, 2);
        assert_eq!(activity[0].present, 1);
        assert!(activity[0].is_new);
        assert!(!activity[1].is_new);

        assert_eq!(class_activity(&records, today, now, 1).len(), 1);
    }
}
