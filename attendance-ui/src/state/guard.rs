//! Role Guard
//!
//! Decides what a screen shows for the current sign-in state and role.
//! The server applies the same rules to its endpoints.

use crate::api::types::{Role, User};
use crate::state::i18n::Lang;

/// Signed-in user plus bearer token
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// A stored token is being checked
    Loading,
    SignedOut,
    SignedIn(Session),
}

impl SessionState {
    pub fn role(&self) -> Option<Role> {
        match self {
            SessionState::SignedIn(session) => Some(session.user.role),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Pending,
    RedirectToLogin,
    Denied,
    Granted,
}

pub fn authorize(state: &SessionState, allowed: Option<&[Role]>) -> Access {
    match state {
        SessionState::Loading => Access::Pending,
        SessionState::SignedOut => Access::RedirectToLogin,
        SessionState::SignedIn(session) => match allowed {
            Some(roles) if !roles.contains(&session.user.role) => Access::Denied,
            _ => Access::Granted,
        },
    }
}

const STAFF: &[Role] = &[Role::Admin, Role::Teacher];
const ADMIN: &[Role] = &[Role::Admin];

/// Navigable screens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Dashboard,
    Students,
    Attendance,
    Reports,
    Users,
    Settings,
}

impl Screen {
    pub fn all() -> &'static [Screen] {
        &[
            Screen::Dashboard,
            Screen::Students,
            Screen::Attendance,
            Screen::Reports,
            Screen::Users,
            Screen::Settings,
        ]
    }

    pub fn path(&self) -> &'static str {
        match self {
            Screen::Dashboard => "/",
            Screen::Students => "/students",
            Screen::Attendance => "/attendance",
            Screen::Reports => "/reports",
            Screen::Users => "/users",
            Screen::Settings => "/settings",
        }
    }

    /// `None` means every signed-in role
    pub fn allowed(&self) -> Option<&'static [Role]> {
        match self {
            Screen::Students => Some(STAFF),
            Screen::Users => Some(ADMIN),
            _ => None,
        }
    }

    pub fn label(&self, lang: Lang) -> &'static str {
        match (self, lang) {
            (Screen::Dashboard, Lang::Vi) => "Tổng quan",
            (Screen::Students, Lang::Vi) => "Học sinh",
            (Screen::Attendance, Lang::Vi) => "Điểm danh",
            (Screen::Reports, Lang::Vi) => "Báo cáo",
            (Screen::Users, Lang::Vi) => "Người dùng",
            (Screen::Settings, Lang::Vi) => "Cài đặt",
            (Screen::Dashboard, Lang::En) => "Dashboard",
            (Screen::Students, Lang::En) => "Students",
            (Screen::Attendance, Lang::En) => "Attendance",
            (Screen::Reports, Lang::En) => "Reports",
            (Screen::Users, Lang::En) => "Users",
            (Screen::Settings, Lang::En) => "Settings",
        }
    }
}

/// Menu entries for a role
pub fn visible_screens(role: Role) -> Vec<Screen> {
    Screen::all()
        .iter()
        .copied()
        .filter(|s| s.allowed().map_or(true, |roles| roles.contains(&role)))
        .collect()
}
