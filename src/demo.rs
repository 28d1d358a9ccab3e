//! Demo Data
//!
//! A small fixed roster and a week of attendance for trying the dashboard
//! without a capture device. Output depends only on the date passed in.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use crate::storage::{
    AttendanceStatus, NewAttendanceRecord, NewStudent, StorageEngine, StorageResult, Student,
};

/// Tag written to `scanned_by` on generated records
pub const DEMO_SCANNER: &str = "demo_user";

const ROSTER: [(&str, &str, &str, &str); 8] = [
    ("HS001", "Nguyễn Văn An", "12A1", "Toán"),
    ("HS002", "Trần Thị Bích", "12A1", "Toán"),
    ("HS003", "Lê Minh Cường", "12A1", "Toán"),
    ("HS004", "Phạm Thu Duyên", "12A2", "Ngữ Văn"),
    ("HS005", "Hoàng Văn Em", "12A2", "Ngữ Văn"),
    ("HS006", "Đỗ Thị Phương", "12A1", "Toán"),
    ("HS007", "Vũ Minh Giang", "12A2", "Ngữ Văn"),
    ("HS008", "Bùi Văn Hùng", "12A1", "Toán"),
];

/// The demo roster
pub fn demo_students() -> Vec<NewStudent> {
    ROSTER
        .iter()
        .enumerate()
        .map(|(i, (code, name, class, major))| {
            NewStudent::new(*code, *name, *class)
                .major(*major)
                .email(format!("{}@student.edu.vn", code.to_lowercase()))
                .phone(format!("09123450{:02}", i + 1))
        })
        .collect()
}

fn at_minutes(date: NaiveDate, minutes_after_eight: i64) -> DateTime<Utc> {
    let eight = date.and_hms_opt(8, 0, 0).unwrap_or_default();
    Utc.from_utc_datetime(&eight) + Duration::minutes(minutes_after_eight)
}

/// Attendance for today, yesterday and the six days before
///
/// Today five students have checked in; yesterday the whole roster was
/// scanned; earlier days have five or six check-ins in rotating order.
pub fn demo_attendance(students: &[Student], today: NaiveDate) -> Vec<NewAttendanceRecord> {
    let mut records = Vec::new();
    if students.is_empty() {
        return records;
    }

    for (index, student) in students.iter().take(5).enumerate() {
        let status = if index == 3 {
            AttendanceStatus::Late
        } else {
            AttendanceStatus::Present
        };
        records.push(
            NewAttendanceRecord::for_student(student, today, status)
                .timestamp(at_minutes(today, index as i64 * 3))
                .scanned_by(DEMO_SCANNER)
                .confidence(0.85 + index as f64 * 0.02)
                .note("Attendance"),
        );
    }

    let yesterday = today - Duration::days(1);
    for (index, student) in students.iter().enumerate() {
        let status = if index == 6 {
            AttendanceStatus::Absent
        } else {
            AttendanceStatus::Present
        };
        records.push(
            NewAttendanceRecord::for_student(student, yesterday, status)
                .timestamp(at_minutes(yesterday, index as i64 * 2))
                .scanned_by(DEMO_SCANNER)
                .confidence(0.80 + (index % 5) as f64 * 0.03),
        );
    }

    for days_back in 2..=7i64 {
        let date = today - Duration::days(days_back);
        let attending = (5 + days_back as usize % 2).min(students.len());
        for index in 0..attending {
            let student = &students[(index + days_back as usize) % students.len()];
            let status = if (index + days_back as usize) % 7 == 0 {
                AttendanceStatus::Late
            } else {
                AttendanceStatus::Present
            };
            records.push(
                NewAttendanceRecord::for_student(student, date, status)
                    .timestamp(at_minutes(date, index as i64 * 2))
                    .scanned_by(DEMO_SCANNER)
                    .confidence(0.80 + (index % 4) as f64 * 0.04)
                    .note("Attendance"),
            );
        }
    }

    records
}

/// Counts written by [`seed_store`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct SeedReport {
    pub students: usize,
    pub attendance: usize,
}

/// Write the demo roster and its attendance straight into a store
pub fn seed_store(store: &StorageEngine, today: NaiveDate) -> StorageResult<SeedReport> {
    let now = Utc::now();
    let mut students = Vec::new();
    for new in demo_students() {
        students.push(store.insert_student(new, now)?);
    }

    let records = demo_attendance(&students, today);
    let attendance = records.len();
    for record in records {
        store.insert_attendance(record, now)?;
    }

    tracing::info!(students = students.len(), attendance, "Seeded demo data");
    Ok(SeedReport {
        students: students.len(),
        attendance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{AttendanceStats, StatusCounts};
    use crate::storage::AttendanceQuery;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 20).unwrap()
    }

    #[test]
    fn test_roster() {
        let students = demo_students();
        assert_eq!(students.len(), 8);
        assert!(students.iter().all(|s| s.validate().is_ok()));
        assert!(students.iter().all(|s| s.class == "12A1" || s.class == "12A2"));
    }

    #[test]
    fn test_seed_is_deterministic() {
        let first = StorageEngine::open_in_memory().unwrap();
        let second = StorageEngine::open_in_memory().unwrap();

        let a = seed_store(&first, today()).unwrap();
        let b = seed_store(&second, today()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.students, 8);
        // 5 today + 8 yesterday + (5 + 6) * 3 earlier
        assert_eq!(a.attendance, 46);

        let count = |store: &StorageEngine| {
            let records = store.query_attendance(&AttendanceQuery::new()).unwrap();
            StatusCounts::from_records(&records)
        };
        assert_eq!(count(&first), count(&second));
    }

    #[test]
    fn test_seeded_dashboard() {
        let store = StorageEngine::open_in_memory().unwrap();
        seed_store(&store, today()).unwrap();

        let records = store
            .query_attendance(&AttendanceQuery::since(today() - Duration::days(30)))
            .unwrap();
        let stats = AttendanceStats::compute(&records, today(), 8);
        assert_eq!(stats.today.present, 4);
        assert_eq!(stats.today.late, 1);
        assert_eq!(stats.today.absent, 4);
        assert_eq!(stats.today.rate, 50.0);
    }
}
