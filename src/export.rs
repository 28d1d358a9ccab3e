//! Report Export
//!
//! Turns a report's daily series into a spreadsheet download.

use chrono::NaiveDate;
use rust_xlsxwriter::{Format, FormatAlign, Workbook, XlsxError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::report::{rate, Report, ReportPeriod};

const HEADERS: [&str; 6] = ["Day", "Present", "Absent", "Late", "Total", "Rate (%)"];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("XLSX error: {0}")]
    Xlsx(#[from] XlsxError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ExportResult<T> = Result<T, ExportError>;

/// Spreadsheet flavour
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Xlsx,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ExportFormat::Csv => "text/csv; charset=utf-8",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(format!("unknown export format: {}", other)),
        }
    }
}

/// One spreadsheet row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    pub day: String,
    pub present: usize,
    pub absent: usize,
    pub late: usize,
    pub total: usize,
    /// Rounded to one decimal
    pub rate: f64,
}

impl ExportRow {
    fn cells(&self) -> [String; 6] {
        [
            self.day.clone(),
            self.present.to_string(),
            self.absent.to_string(),
            self.late.to_string(),
            self.total.to_string(),
            format!("{:.1}", self.rate),
        ]
    }
}

/// Rows of the daily series, oldest day first
pub fn export_rows(report: &Report) -> Vec<ExportRow> {
    report
        .daily
        .iter()
        .map(|day| {
            let total = day.total();
            ExportRow {
                day: day.label.clone(),
                present: day.present,
                absent: day.absent,
                late: day.late,
                total,
                rate: (rate(day.present, total) * 10.0).round() / 10.0,
            }
        })
        .collect()
}

/// `attendance_report_{period}_{yyyyMMdd}.{ext}`
pub fn file_name(period: ReportPeriod, date: NaiveDate, format: ExportFormat) -> String {
    format!(
        "attendance_report_{}_{}.{}",
        period,
        date.format("%Y%m%d"),
        format.extension()
    )
}

/// Render the report in `format`
pub fn render(report: &Report, format: ExportFormat) -> ExportResult<Vec<u8>> {
    let rows = export_rows(report);
    match format {
        ExportFormat::Xlsx => render_xlsx(&rows),
        ExportFormat::Csv => render_csv(&rows),
    }
}

fn render_xlsx(rows: &[ExportRow]) -> ExportResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Attendance")?;

    let header_format = Format::new().set_bold();
    let number_format = Format::new().set_align(FormatAlign::Right);
    let rate_format = Format::new()
        .set_align(FormatAlign::Right)
        .set_num_format("0.0");

    let mut widths: Vec<usize> = HEADERS.iter().map(|h| h.chars().count()).collect();

    for (col, header) in HEADERS.iter().enumerate() {
        worksheet.write_with_format(0, col as u16, *header, &header_format)?;
    }
    worksheet.set_freeze_panes(1, 0)?;

    for (index, row) in rows.iter().enumerate() {
        let r = (index + 1) as u32;
        worksheet.write(r, 0, row.day.as_str())?;
        worksheet.write_with_format(r, 1, row.present as f64, &number_format)?;
        worksheet.write_with_format(r, 2, row.absent as f64, &number_format)?;
        worksheet.write_with_format(r, 3, row.late as f64, &number_format)?;
        worksheet.write_with_format(r, 4, row.total as f64, &number_format)?;
        worksheet.write_with_format(r, 5, row.rate, &rate_format)?;

        for (col, cell) in row.cells().iter().enumerate() {
            widths[col] = widths[col].max(cell.chars().count());
        }
    }

    for (col, width) in widths.iter().enumerate() {
        worksheet.set_column_width(col as u16, *width as f64 + 2.0)?;
    }

    Ok(workbook.save_to_buffer()?)
}

fn render_csv(rows: &[ExportRow]) -> ExportResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADERS)?;
    for row in rows {
        writer.write_record(row.cells())?;
    }
    writer.flush()?;
    writer.into_inner().map_err(|e| ExportError::Io(e.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{AttendanceRecord, AttendanceStatus};
    use chrono::{TimeZone, Utc};

    fn record(id: usize, date: NaiveDate, status: AttendanceStatus) -> AttendanceRecord {
        AttendanceRecord {
            id: id.to_string(),
            student_id: format!("s{}", id),
            student_name: format!("Student {}", id),
            student_code: format!("SV{:03}", id),
            class: "12A1".to_string(),
            date,
            status,
            timestamp: Utc.with_ymd_and_hms(2024, 3, 18, 7, 0, 0).unwrap(),
            scanned_by: None,
            confidence: None,
            session_id: None,
            note: None,
        }
    }

    fn sample_report() -> Report {
        let today = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
        let monday = NaiveDate::from_ymd_opt(2024, 3, 18).unwrap();
        let records = vec![
            record(1, monday, AttendanceStatus::Present),
            record(2, monday, AttendanceStatus::Present),
            record(3, monday, AttendanceStatus::Late),
            record(4, monday, AttendanceStatus::Excused),
        ];
        Report::build(&records, ReportPeriod::Week, None, today)
    }

    #[test]
    fn test_export_rows() {
        let rows = export_rows(&sample_report());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].day, "18/03");
        assert_eq!(rows[0].total, 3);
        assert_eq!(rows[0].rate, 66.7);
    }

    #[test]
    fn test_file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
        assert_eq!(
            file_name(ReportPeriod::Month, date, ExportFormat::Xlsx),
            "attendance_report_month_20240320.xlsx"
        );
        assert_eq!(
            file_name(ReportPeriod::Week, date, ExportFormat::Csv),
            "attendance_report_week_20240320.csv"
        );
    }

    #[test]
    fn test_render_csv() {
        let bytes = render(&sample_report(), ExportFormat::Csv).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Day,Present,Absent,Late,Total,Rate (%)"));
        assert_eq!(lines.next(), Some("18/03,2,0,1,3,66.7"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_render_xlsx_is_zip() {
        let bytes = render(&sample_report(), ExportFormat::Xlsx).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("CSV".parse::<ExportFormat>(), Ok(ExportFormat::Csv));
        assert_eq!("excel".parse::<ExportFormat>(), Ok(ExportFormat::Xlsx));
        assert!("pdf".parse::<ExportFormat>().is_err());
    }
}
