//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! These types are serialized/deserialized to/from JSON.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::Session;
use crate::report::{AttendanceStats, ClassActivity, RoleCounts, StatusCounts};
use crate::storage::{AttendanceRecord, AttendanceStatus, Role, Student, User};

// ============================================
// AUTH DTOs
// ============================================

/// Email/password sign-in
#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// Issued session
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self {
            token: session.token,
            expires_at: session.expires_at,
            user: session.user,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetConfirmRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// Plain acknowledgement
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }

    pub fn accepted() -> Self {
        Self {
            status: "accepted".to_string(),
        }
    }
}

// ============================================
// USER DTOs
// ============================================

/// Query parameters for the user list
#[derive(Debug, Default, Deserialize)]
pub struct UserListParams {
    #[serde(default)]
    pub role: Option<Role>,
    /// Case-insensitive match on email or display name
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<User>,
    /// Tallies over all users, ignoring filters
    pub counts: RoleCounts,
}

/// Admin account creation
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default = "default_role")]
    pub role: Role,
    #[serde(default)]
    pub school_id: Option<String>,
}

fn default_role() -> Role {
    Role::Teacher
}

#[derive(Debug, Deserialize)]
pub struct RoleUpdateRequest {
    pub role: Role,
}

// ============================================
// STUDENT DTOs
// ============================================

#[derive(Debug, Default, Deserialize)]
pub struct StudentListParams {
    #[serde(default)]
    pub class: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StudentListResponse {
    pub students: Vec<Student>,
    pub total: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct PhotoParams {
    pub file_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PhotoResponse {
    pub url: String,
}

// ============================================
// ATTENDANCE DTOs
// ============================================

/// Attendance list parameters
///
/// `date` selects one day; otherwise `start`..=`end` (both optional).
#[derive(Debug, Default, Deserialize)]
pub struct AttendanceParams {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub end: Option<NaiveDate>,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub status: Option<AttendanceStatus>,
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub per_page: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct AttendanceListResponse {
    pub records: Vec<AttendanceRecord>,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub total_pages: usize,
    /// Counts over the selected days and class, before the status filter
    pub counts: StatusCounts,
    pub rate: f64,
}

/// Capture of one observation by the recognition process
#[derive(Debug, Deserialize)]
pub struct CaptureRequest {
    pub student_id: String,
    pub status: AttendanceStatus,
    /// Defaults to today
    #[serde(default)]
    pub date: Option<NaiveDate>,
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

// ============================================
// DASHBOARD & REPORT DTOs
// ============================================

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub date: NaiveDate,
    pub stats: AttendanceStats,
    pub class_activity: Vec<ClassActivity>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DashboardParams {
    /// Classes shown in the activity list (default 5)
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportParams {
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default)]
    pub class: Option<String>,
    /// Only for the export route
    #[serde(default)]
    pub format: Option<String>,
}

// ============================================
// HEALTH DTOs
// ============================================

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status: "healthy" or "unhealthy"
    pub status: String,
    /// Store status: "ok" or "error"
    pub store: String,
    /// Open WebSocket connections
    pub ws_connections: usize,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Server version
    pub version: String,
}
