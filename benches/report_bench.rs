//! Benchmarks for report aggregation and the attendance store
//!
//! Run with: cargo bench

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use school_attendance::export::{render, ExportFormat};
use school_attendance::report::{AttendanceStats, Report, ReportPeriod};
use school_attendance::storage::{
    AttendanceQuery, AttendanceRecord, AttendanceStatus, NewAttendanceRecord, NewStudent,
    StorageEngine,
};

const CLASSES: [&str; 4] = ["10A1", "11A2", "12A1", "12A2"];

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 14).unwrap()
}

fn create_test_records(count: usize) -> Vec<AttendanceRecord> {
    let base = Utc.with_ymd_and_hms(2024, 6, 14, 7, 0, 0).unwrap();
    (0..count)
        .map(|i| {
            let status = match i % 10 {
                0 => AttendanceStatus::Absent,
                1 | 2 => AttendanceStatus::Late,
                _ => AttendanceStatus::Present,
            };
            AttendanceRecord {
                id: format!("rec-{}", i),
                student_id: format!("stu-{}", i % 400),
                student_name: format!("Student {}", i % 400),
                student_code: format!("HS{:04}", i % 400),
                class: CLASSES[i % CLASSES.len()].to_string(),
                date: today() - Duration::days((i % 365) as i64),
                status,
                timestamp: base - Duration::days((i % 365) as i64),
                scanned_by: None,
                confidence: Some(0.9),
                session_id: None,
                note: None,
            }
        })
        .collect()
}

fn bench_report(c: &mut Criterion) {
    let mut group = c.benchmark_group("report");

    for size in [1_000, 10_000, 100_000] {
        let records = create_test_records(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("build_year_{}", size), |b| {
            b.iter(|| Report::build(black_box(&records), ReportPeriod::Year, None, today()))
        });

        group.bench_function(format!("build_month_class_{}", size), |b| {
            b.iter(|| {
                Report::build(
                    black_box(&records),
                    ReportPeriod::Month,
                    Some("12A1"),
                    today(),
                )
            })
        });

        group.bench_function(format!("dashboard_stats_{}", size), |b| {
            b.iter(|| AttendanceStats::compute(black_box(&records), today(), 400))
        });
    }

    group.finish();
}

fn bench_export(c: &mut Criterion) {
    let mut group = c.benchmark_group("export");
    let records = create_test_records(10_000);
    let report = Report::build(&records, ReportPeriod::Year, None, today());

    group.bench_function("xlsx_year", |b| {
        b.iter(|| render(black_box(&report), ExportFormat::Xlsx).unwrap())
    });

    group.bench_function("csv_year", |b| {
        b.iter(|| render(black_box(&report), ExportFormat::Csv).unwrap())
    });

    group.finish();
}

fn bench_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("store");

    let store = StorageEngine::open_in_memory().unwrap();
    let now = Utc::now();
    let students: Vec<_> = (0..40)
        .map(|i| {
            store
                .insert_student(
                    NewStudent::new(
                        format!("HS{:03}", i),
                        format!("Student {}", i),
                        CLASSES[i % CLASSES.len()],
                    ),
                    now,
                )
                .unwrap()
        })
        .collect();

    for day in 0..30 {
        for student in &students {
            let record = NewAttendanceRecord::for_student(
                student,
                today() - Duration::days(day),
                AttendanceStatus::Present,
            );
            store.insert_attendance(record, now).unwrap();
        }
    }

    group.bench_function("query_month", |b| {
        b.iter(|| {
            store
                .query_attendance(black_box(&AttendanceQuery::since(today() - Duration::days(30))))
                .unwrap()
        })
    });

    group.bench_function("query_day_class", |b| {
        b.iter(|| {
            store
                .query_attendance(black_box(&AttendanceQuery::on(today()).class("12A1")))
                .unwrap()
        })
    });

    group.bench_function("insert_single", |b| {
        let student = &students[0];
        b.iter(|| {
            let record =
                NewAttendanceRecord::for_student(student, today(), AttendanceStatus::Late);
            store.insert_attendance(black_box(record), now).unwrap()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_report, bench_export, bench_store);
criterion_main!(benches);
