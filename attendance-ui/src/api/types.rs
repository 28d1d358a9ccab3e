//! API Types
//!
//! JSON shapes exchanged with the attendance server.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::state::i18n::Lang;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
    Parent,
}

impl Role {
    pub fn all() -> &'static [Role] {
        &[Role::Admin, Role::Teacher, Role::Parent]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Teacher => "teacher",
            Role::Parent => "parent",
        }
    }

    pub fn label(&self, lang: Lang) -> &'static str {
        match (self, lang) {
            (Role::Admin, Lang::Vi) => "Quản trị viên",
            (Role::Teacher, Lang::Vi) => "Giáo viên",
            (Role::Parent, Lang::Vi) => "Phụ huynh",
            (Role::Admin, Lang::En) => "Administrator",
            (Role::Teacher, Lang::En) => "Teacher",
            (Role::Parent, Lang::En) => "Parent",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        Role::all().iter().copied().find(|r| r.as_str() == s)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct User {
    pub uid: String,
    pub email: String,
    pub display_name: String,
    #[serde(default)]
    pub photo_url: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub school_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Student {
    pub id: String,
    pub student_code: String,
    pub name: String,
    pub class: String,
    #[serde(default)]
    pub major: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

/// Student form payload
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StudentForm {
    pub student_code: String,
    pub name: String,
    pub class: String,
    pub major: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl StudentForm {
    /// Required fields, checked before any request is sent
    pub fn missing_required(&self) -> bool {
        self.student_code.trim().is_empty()
            || self.name.trim().is_empty()
            || self.class.trim().is_empty()
    }
}

impl From<&Student> for StudentForm {
    fn from(student: &Student) -> Self {
        Self {
            student_code: student.student_code.clone(),
            name: student.name.clone(),
            class: student.class.clone(),
            major: student.major.clone(),
            email: student.email.clone(),
            phone: student.phone.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
}

impl AttendanceStatus {
    pub fn all() -> &'static [AttendanceStatus] {
        &[
            AttendanceStatus::Present,
            AttendanceStatus::Absent,
            AttendanceStatus::Late,
            AttendanceStatus::Excused,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Late => "late",
            AttendanceStatus::Excused => "excused",
        }
    }

    pub fn label(&self, lang: Lang) -> &'static str {
        match (self, lang) {
            (AttendanceStatus::Present, Lang::Vi) => "Có mặt",
            (AttendanceStatus::Absent, Lang::Vi) => "Vắng",
            (AttendanceStatus::Late, Lang::Vi) => "Đi muộn",
            (AttendanceStatus::Excused, Lang::Vi) => "Có phép",
            (AttendanceStatus::Present, Lang::En) => "Present",
            (AttendanceStatus::Absent, Lang::En) => "Absent",
            (AttendanceStatus::Late, Lang::En) => "Late",
            (AttendanceStatus::Excused, Lang::En) => "Excused",
        }
    }

    /// Tailwind classes for the status badge
    pub fn badge_class(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "bg-green-600/20 text-green-400",
            AttendanceStatus::Absent => "bg-red-600/20 text-red-400",
            AttendanceStatus::Late => "bg-yellow-600/20 text-yellow-400",
            AttendanceStatus::Excused => "bg-blue-600/20 text-blue-400",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AttendanceRecord {
    pub id: String,
    pub student_id: String,
    pub student_name: String,
    pub student_code: String,
    pub class: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub scanned_by: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct StatusCounts {
    pub present: usize,
    pub absent: usize,
    pub late: usize,
    pub excused: usize,
}

impl StatusCounts {
    pub fn get(&self, status: AttendanceStatus) -> usize {
        match status {
            AttendanceStatus::Present => self.present,
            AttendanceStatus::Absent => self.absent,
            AttendanceStatus::Late => self.late,
            AttendanceStatus::Excused => self.excused,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AttendancePage {
    pub records: Vec<AttendanceRecord>,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub total_pages: usize,
    pub counts: StatusCounts,
    pub rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DayStats {
    pub present: usize,
    pub absent: usize,
    pub late: usize,
    pub rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WindowStats {
    pub present: usize,
    pub rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AttendanceStats {
    pub total_students: usize,
    pub today: DayStats,
    pub week: WindowStats,
    pub month: WindowStats,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClassActivity {
    pub class: String,
    pub present: usize,
    pub total: usize,
    pub latest: DateTime<Utc>,
    pub is_new: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Dashboard {
    pub date: NaiveDate,
    pub stats: AttendanceStats,
    pub class_activity: Vec<ClassActivity>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportPeriod {
    #[default]
    Week,
    Month,
    Year,
}

impl ReportPeriod {
    pub fn all() -> &'static [ReportPeriod] {
        &[ReportPeriod::Week, ReportPeriod::Month, ReportPeriod::Year]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportPeriod::Week => "week",
            ReportPeriod::Month => "month",
            ReportPeriod::Year => "year",
        }
    }

    pub fn label(&self, lang: Lang) -> &'static str {
        match (self, lang) {
            (ReportPeriod::Week, Lang::Vi) => "Tuần này",
            (ReportPeriod::Month, Lang::Vi) => "30 ngày",
            (ReportPeriod::Year, Lang::Vi) => "Năm",
            (ReportPeriod::Week, Lang::En) => "This week",
            (ReportPeriod::Month, Lang::En) => "30 days",
            (ReportPeriod::Year, Lang::En) => "Year",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DailySeries {
    pub date: NaiveDate,
    pub label: String,
    pub present: usize,
    pub absent: usize,
    pub late: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClassSeries {
    pub class: String,
    pub present: usize,
    pub absent: usize,
    pub late: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatusSlice {
    pub status: AttendanceStatus,
    pub count: usize,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReportSummary {
    pub total_records: usize,
    pub total_sessions: usize,
    pub avg_rate: f64,
    pub classes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Report {
    pub period: ReportPeriod,
    #[serde(default)]
    pub class: Option<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub counts: StatusCounts,
    pub daily: Vec<DailySeries>,
    #[serde(default)]
    pub by_class: Option<Vec<ClassSeries>>,
    pub distribution: Vec<StatusSlice>,
    pub summary: ReportSummary,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct RoleCounts {
    pub total: usize,
    pub admin: usize,
    pub teacher: usize,
    pub parent: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserList {
    pub users: Vec<User>,
    pub counts: RoleCounts,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub ws_connections: usize,
    pub uptime_seconds: u64,
    pub version: String,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_without_optional_fields() {
        let json = r#"{
            "id": "a1", "student_id": "s1", "student_name": "An", "student_code": "HS001",
            "class": "12A1", "date": "2024-03-20", "status": "late",
            "timestamp": "2024-03-20T07:05:00Z"
        }"#;
        let record: AttendanceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.status, AttendanceStatus::Late);
        assert_eq!(record.confidence, None);
    }

    #[test]
    fn test_report_without_by_class() {
        let json = r#"{
            "period": "month", "class": "12A1", "start": "2024-02-19", "end": "2024-03-20",
            "counts": {"present": 1, "absent": 0, "late": 0, "excused": 0},
            "daily": [], "distribution": [],
            "summary": {"total_records": 1, "total_sessions": 1, "avg_rate": 100.0, "classes": ["12A1"]}
        }"#;
        let report: Report = serde_json::from_str(json).unwrap();
        assert_eq!(report.period, ReportPeriod::Month);
        assert!(report.by_class.is_none());
    }

    #[test]
    fn test_student_form_required() {
        let mut form = StudentForm::default();
        assert!(form.missing_required());
        form.student_code = "HS001".to_string();
        form.name = "An".to_string();
        form.class = " ".to_string();
        assert!(form.missing_required());
        form.class = "12A1".to_string();
        assert!(!form.missing_required());
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("parent"), Some(Role::Parent));
        assert_eq!(Role::parse("owner"), None);
    }
}
