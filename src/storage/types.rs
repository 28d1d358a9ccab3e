//! Core data types for the attendance store
//!
//! This module defines the records held by the storage layer:
//! - `User`: A signed-in account with a role
//! - `Student`: A school-registered student
//! - `AttendanceRecord`: One observation of a student's presence
//! - `Role` and `AttendanceStatus`: Closed enumerations
//! - `AttendanceQuery`: Filter/order/limit for attendance reads

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Account role, gates screens and mutations
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
    Parent,
}

impl Role {
    /// Get all roles for iteration
    pub fn all() -> &'static [Role] {
        &[Role::Admin, Role::Teacher, Role::Parent]
    }

    /// Role as stored in the users table.
    ///
    /// A missing or unknown stored value reads back as `Teacher`.
    pub fn from_stored(value: Option<&str>) -> Role {
        value
            .and_then(|v| v.parse().ok())
            .unwrap_or(Role::Teacher)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Teacher => "teacher",
            Role::Parent => "parent",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "teacher" => Ok(Role::Teacher),
            "parent" => Ok(Role::Parent),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// Presence status of one attendance observation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
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
}

impl std::fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "present" => Ok(AttendanceStatus::Present),
            "absent" => Ok(AttendanceStatus::Absent),
            "late" => Ok(AttendanceStatus::Late),
            "excused" => Ok(AttendanceStatus::Excused),
            other => Err(format!("unknown attendance status: {}", other)),
        }
    }
}

/// A dashboard account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub uid: String,
    pub email: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub role: Role,
    /// School or class association
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

/// Fields needed to create a user document
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    /// Falls back to the email when empty
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub role: Role,
    pub school_id: Option<String>,
}

/// Writable profile fields. `created_at` and `role` are not part of it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfilePatch {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub school_id: Option<String>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.photo_url.is_none() && self.school_id.is_none()
    }
}

fn default_synced() -> bool {
    true
}

/// A registered student
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Student {
    pub id: String,
    pub student_code: String,
    pub name: String,
    pub class: String,
    #[serde(default)]
    pub major: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    /// Produced by the capture process, never read here
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_embedding: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default = "default_synced")]
    pub is_synced: bool,
}

/// Student creation payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewStudent {
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
    #[serde(default)]
    pub face_embedding: Option<Vec<f32>>,
}

impl NewStudent {
    pub fn new(
        student_code: impl Into<String>,
        name: impl Into<String>,
        class: impl Into<String>,
    ) -> Self {
        Self {
            student_code: student_code.into(),
            name: name.into(),
            class: class.into(),
            ..Default::default()
        }
    }

    /// Builder method: set major
    pub fn major(mut self, major: impl Into<String>) -> Self {
        self.major = major.into();
        self
    }

    /// Builder method: set contact email
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Builder method: set phone
    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Required-field check run before any write
    pub fn validate(&self) -> Result<(), String> {
        if self.student_code.trim().is_empty() {
            return Err("student_code is required".to_string());
        }
        if self.name.trim().is_empty() {
            return Err("name is required".to_string());
        }
        if self.class.trim().is_empty() {
            return Err("class is required".to_string());
        }
        Ok(())
    }
}

/// Partial student update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudentPatch {
    #[serde(default)]
    pub student_code: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub major: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub face_embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub is_synced: Option<bool>,
}

impl StudentPatch {
    /// Apply onto an existing student, leaving timestamps to the caller
    pub fn apply(&self, student: &mut Student) {
        if let Some(v) = &self.student_code {
            student.student_code = v.clone();
        }
        if let Some(v) = &self.name {
            student.name = v.clone();
        }
        if let Some(v) = &self.class {
            student.class = v.clone();
        }
        if let Some(v) = &self.major {
            student.major = v.clone();
        }
        if let Some(v) = &self.email {
            student.email = Some(v.clone());
        }
        if let Some(v) = &self.phone {
            student.phone = Some(v.clone());
        }
        if let Some(v) = &self.photo_url {
            student.photo_url = Some(v.clone());
        }
        if let Some(v) = &self.face_embedding {
            student.face_embedding = Some(v.clone());
        }
        if let Some(v) = self.is_synced {
            student.is_synced = v;
        }
    }

    pub fn photo(url: impl Into<String>) -> Self {
        Self {
            photo_url: Some(url.into()),
            ..Default::default()
        }
    }
}

/// One observation of a student's presence at a point in time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttendanceRecord {
    pub id: String,
    pub student_id: String,
    pub student_name: String,
    pub student_code: String,
    pub class: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub timestamp: DateTime<Utc>,
    /// Recording source (device or account)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scanned_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Attendance capture payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAttendanceRecord {
    pub student_id: String,
    pub student_name: String,
    pub student_code: String,
    pub class: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    /// Defaults to the capture time
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scanned_by: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl NewAttendanceRecord {
    /// Capture payload for a known student
    pub fn for_student(student: &Student, date: NaiveDate, status: AttendanceStatus) -> Self {
        Self {
            student_id: student.id.clone(),
            student_name: student.name.clone(),
            student_code: student.student_code.clone(),
            class: student.class.clone(),
            date,
            status,
            timestamp: None,
            scanned_by: None,
            confidence: None,
            session_id: None,
            note: None,
        }
    }

    /// Builder method: set timestamp
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Builder method: set recording source
    pub fn scanned_by(mut self, source: impl Into<String>) -> Self {
        self.scanned_by = Some(source.into());
        self
    }

    /// Builder method: set matcher confidence
    pub fn confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Builder method: set note
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Sort order for attendance reads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceOrder {
    /// Newest timestamp first
    #[default]
    NewestFirst,
    /// Newest calendar date first, then newest timestamp
    DateDesc,
}

/// Attendance read parameters. Date bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttendanceQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub class: Option<String>,
    pub status: Option<AttendanceStatus>,
    pub student_id: Option<String>,
    pub order: AttendanceOrder,
    pub limit: Option<usize>,
}

impl AttendanceQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records on a single calendar day
    pub fn on(date: NaiveDate) -> Self {
        Self {
            from: Some(date),
            to: Some(date),
            ..Default::default()
        }
    }

    /// Records dated on or after `date`
    pub fn since(date: NaiveDate) -> Self {
        Self {
            from: Some(date),
            ..Default::default()
        }
    }

    /// Records in `[from, to]`
    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
            ..Default::default()
        }
    }

    /// Builder method: restrict to one class
    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    /// Builder method: restrict to one status
    pub fn status(mut self, status: AttendanceStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Builder method: restrict to one student
    pub fn student(mut self, student_id: impl Into<String>) -> Self {
        self.student_id = Some(student_id.into());
        self
    }

    /// Builder method: sort order
    pub fn order(mut self, order: AttendanceOrder) -> Self {
        self.order = order;
        self
    }

    /// Builder method: cap the number of rows
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_and_default() {
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(Role::from_stored(Some("parent")), Role::Parent);
        assert_eq!(Role::from_stored(None), Role::Teacher);
        assert_eq!(Role::from_stored(Some("principal")), Role::Teacher);
    }

    #[test]
    fn test_status_serde() {
        let json = serde_json::to_string(&AttendanceStatus::Excused).unwrap();
        assert_eq!(json, "\"excused\"");
        assert!("sick".parse::<AttendanceStatus>().is_err());
    }

    #[test]
    fn test_student_sync_flag_defaults_true() {
        let json = r#"{
            "id": "s1", "student_code": "SV001", "name": "An", "class": "12A1",
            "created_at": "2024-01-01T00:00:00Z", "updated_at": "2024-01-01T00:00:00Z"
        }"#;
        let student: Student = serde_json::from_str(json).unwrap();
        assert!(student.is_synced);
        assert!(student.face_embedding.is_none());
        assert_eq!(student.major, "");
    }

    #[test]
    fn test_new_student_validation() {
        assert!(NewStudent::new("SV001", "An", "12A1").validate().is_ok());
        assert!(NewStudent::new("", "An", "12A1").validate().is_err());
        assert!(NewStudent::new("SV001", " ", "12A1").validate().is_err());
        assert!(NewStudent::new("SV001", "An", "").validate().is_err());
    }

    #[test]
    fn test_student_patch_leaves_absent_fields() {
        let now = Utc::now();
        let mut student = Student {
            id: "s1".into(),
            student_code: "SV001".into(),
            name: "An".into(),
            class: "12A1".into(),
            major: "Math".into(),
            email: None,
            phone: None,
            photo_url: None,
            face_embedding: None,
            created_at: now,
            updated_at: now,
            is_synced: true,
        };
        let patch = StudentPatch {
            class: Some("12A2".into()),
            ..Default::default()
        };
        patch.apply(&mut student);
        assert_eq!(student.class, "12A2");
        assert_eq!(student.name, "An");
        assert_eq!(student.major, "Math");
    }
}
