//! # School Attendance
//!
//! Backend for a school attendance dashboard: student roster, attendance
//! records captured by face recognition scanners, live updates, reports
//! and spreadsheet export, with role-gated access for admins, teachers
//! and parents.
//!
//! ## Modules
//!
//! - [`storage`]: SQLite document store and change feed
//! - [`auth`]: Accounts, sessions and password resets
//! - [`guard`]: Role checks for screens and endpoints
//! - [`services`]: Student and user management
//! - [`report`]: Statistics, chart series, filters and pagination
//! - [`export`]: Excel and CSV report files
//! - [`live`]: Live mirrors and the WebSocket hub
//! - [`preferences`]: Persisted UI preferences
//! - [`api`]: REST API server with Axum
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use school_attendance::report::{today, AttendanceStats};
//! use school_attendance::storage::{AttendanceQuery, StorageConfig, StorageEngine};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = StorageEngine::open(&StorageConfig::new("./data"))?;
//!     school_attendance::demo::seed_store(&store, today())?;
//!
//!     let records = store.query_attendance(&AttendanceQuery::since(today()))?;
//!     let students = store.list_students(None)?.len();
//!     let stats = AttendanceStats::compute(&records, today(), students);
//!
//!     println!("Today: {:.1}% present", stats.today.rate);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod demo;
pub mod export;
pub mod files;
pub mod guard;
pub mod live;
pub mod preferences;
pub mod report;
pub mod services;
pub mod storage;

// Re-export top-level types for convenience
pub use storage::{
    AttendanceQuery, AttendanceRecord, AttendanceStatus, NewAttendanceRecord, NewStudent, Role,
    StorageConfig, StorageEngine, StorageError, StorageResult, Student, User,
};

pub use auth::{AuthError, AuthService, Session};

pub use api::{build_router, serve, ApiError, AppState};

pub use report::{AttendanceStats, Report, ReportPeriod, StatusCounts};

pub use export::{ExportError, ExportFormat};

pub use config::{Config, ConfigError, LoggingConfig};
