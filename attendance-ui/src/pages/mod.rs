//! Pages
//!
//! One component per route.

pub mod attendance;
pub mod dashboard;
pub mod login;
pub mod reports;
pub mod settings;
pub mod students;
pub mod users;

pub use attendance::Attendance;
pub use dashboard::Dashboard;
pub use login::Login;
pub use reports::Reports;
pub use settings::Settings;
pub use students::Students;
pub use users::Users;
