//! API Routes
//!
//! Route handlers organized by functionality.

pub mod attendance;
pub mod auth;
pub mod dashboard;
pub mod health;
pub mod reports;
pub mod students;
pub mod users;
