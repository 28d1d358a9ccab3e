//! Route and role guard
//!
//! A screen or endpoint is reachable only with a session, and, when it
//! carries a role restriction, only when the session's role is listed.

use serde::Serialize;

use crate::auth::Session;
use crate::storage::Role;

/// Sign-in state as seen by a guarded screen
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// The session is still being resolved
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

/// Guard verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    /// Show a spinner
    Pending,
    RedirectToLogin,
    /// Show the "access denied" placeholder
    Denied,
    Granted,
}

/// Decide access for a role-restricted (or unrestricted) target
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

/// Same decision for a bare role
pub fn role_allowed(role: Role, allowed: Option<&[Role]>) -> bool {
    allowed.map_or(true, |roles| roles.contains(&role))
}

/// Dashboard screens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
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

    /// Role restriction, `None` for every signed-in user
    pub fn allowed_roles(&self) -> Option<&'static [Role]> {
        match self {
            Screen::Students => Some(&[Role::Admin, Role::Teacher]),
            Screen::Users => Some(&[Role::Admin]),
            Screen::Dashboard | Screen::Attendance | Screen::Reports | Screen::Settings => None,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Screen::Dashboard => "/dashboard",
            Screen::Students => "/students",
            Screen::Attendance => "/attendance",
            Screen::Reports => "/reports",
            Screen::Users => "/users",
            Screen::Settings => "/settings",
        }
    }
}

/// Navigation entries visible to `role`
pub fn visible_screens(role: Role) -> Vec<Screen> {
    Screen::all()
        .iter()
        .copied()
        .filter(|screen| role_allowed(role, screen.allowed_roles()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::User;
    use chrono::Utc;

    fn signed_in(role: Role) -> SessionState {
        SessionState::SignedIn(Session {
            token: "t".into(),
            user: User {
                uid: "u1".into(),
                email: "u@school.edu".into(),
                display_name: "U".into(),
                photo_url: None,
                role,
                school_id: None,
                created_at: Utc::now(),
                last_login: None,
            },
            expires_at: Utc::now(),
        })
    }

    #[test]
    fn test_parent_denied_admin_screen() {
        let admin_only: &[Role] = &[Role::Admin];
        assert_eq!(authorize(&signed_in(Role::Parent), Some(admin_only)), Access::Denied);
        assert_eq!(authorize(&signed_in(Role::Admin), Some(admin_only)), Access::Granted);
    }

    #[test]
    fn test_loading_and_signed_out() {
        assert_eq!(authorize(&SessionState::Loading, None), Access::Pending);
        assert_eq!(
            authorize(&SessionState::SignedOut, Some(&[Role::Admin])),
            Access::RedirectToLogin
        );
    }

    #[test]
    fn test_unrestricted_grants_every_role() {
        for role in Role::all() {
            assert_eq!(authorize(&signed_in(*role), None), Access::Granted);
        }
    }

    #[test]
    fn test_menu_per_role() {
        assert_eq!(visible_screens(Role::Admin).len(), 6);
        assert_eq!(
            visible_screens(Role::Teacher),
            vec![
                Screen::Dashboard,
                Screen::Students,
                Screen::Attendance,
                Screen::Reports,
                Screen::Settings
            ]
        );
        assert_eq!(
            visible_screens(Role::Parent),
            vec![
                Screen::Dashboard,
                Screen::Attendance,
                Screen::Reports,
                Screen::Settings
            ]
        );
    }
}
