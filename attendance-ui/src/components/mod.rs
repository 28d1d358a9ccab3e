//! UI Components
//!
//! Reusable Leptos components shared by the screens.

pub mod chart;
pub mod loading;
pub mod nav;
pub mod role_gate;
pub mod stat_card;
pub mod toast;

pub use chart::{BarChart, BarSeries, PieChart, Slice};
pub use loading::{CardSkeleton, ListSkeleton, Loading};
pub use nav::Nav;
pub use role_gate::RoleGate;
pub use stat_card::{format_rate, StatCard};
pub use toast::Toast;
