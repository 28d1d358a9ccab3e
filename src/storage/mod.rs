//! Attendance Storage
//!
//! This module provides the persistent document store:
//!
//! - **types**: Core records (User, Student, AttendanceRecord) and enumerations
//! - **engine**: SQLite-backed store for every collection
//! - **feed**: Change notifications published on every write
//! - **error**: Error types
//!
//! # Architecture
//!
//! ```text
//! Write Path:
//!   Service → StorageEngine (SQLite) → ChangeFeed → live mirrors
//!
//! Read Path:
//!   Service → StorageEngine → typed records (millis/ISO dates → chrono)
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use school_attendance::storage::{StorageConfig, StorageEngine, NewStudent};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = StorageEngine::open(&StorageConfig::new("./data"))?;
//!
//!     let student = store.insert_student(
//!         NewStudent::new("SV001", "Nguyen Van An", "12A1").major("Math"),
//!         chrono::Utc::now(),
//!     )?;
//!
//!     let class = store.list_students(Some("12A1"))?;
//!     println!("{} has {} students", student.class, class.len());
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod error;
pub mod feed;
pub mod types;

// Re-export commonly used types
pub use engine::{SessionRow, StorageConfig, StorageEngine, StoredCredential};
pub use error::{StorageError, StorageResult};
pub use feed::{ChangeEvent, ChangeFeed, ChangeKind, Collection};
pub use types::{
    AttendanceOrder, AttendanceQuery, AttendanceRecord, AttendanceStatus, NewAttendanceRecord,
    NewStudent, NewUser, ProfilePatch, Role, Student, StudentPatch, User,
};
