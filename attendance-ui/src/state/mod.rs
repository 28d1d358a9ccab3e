//! State Management
//!
//! Session, settings blob, live mirrors and interface strings.

pub mod global;
pub mod guard;
pub mod i18n;
pub mod settings;
pub mod websocket;

pub use global::{provide_global_state, GlobalState};
pub use guard::{authorize, visible_screens, Access, Screen, Session, SessionState};
pub use i18n::{Lang, Msg};
