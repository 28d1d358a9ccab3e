//! Session resolution for handlers
//!
//! Reads the `Authorization: Bearer` header, resolves it to a
//! [`SessionState`] and applies the same [`authorize`] check the dashboard
//! uses for screens.

use axum::http::{header, HeaderMap};

use super::error::{ApiError, ApiResult};
use super::state::AppState;
use crate::auth::{AuthError, Session};
use crate::guard::{authorize, Access, SessionState};
use crate::storage::Role;

/// Admin and teacher only
pub const STAFF: &[Role] = &[Role::Admin, Role::Teacher];

/// Admin only
pub const ADMIN: &[Role] = &[Role::Admin];

/// Token from `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Resolve the request's session; unknown or expired tokens are signed out
pub fn session_state(state: &AppState, headers: &HeaderMap) -> ApiResult<SessionState> {
    let Some(token) = bearer_token(headers) else {
        return Ok(SessionState::SignedOut);
    };

    match state.auth.resolve(token) {
        Ok(session) => Ok(SessionState::SignedIn(session)),
        Err(AuthError::Unauthenticated | AuthError::SessionExpired | AuthError::UserDataMissing) => {
            Ok(SessionState::SignedOut)
        }
        Err(e) => Err(e.into()),
    }
}

/// Require a session whose role is in `allowed` (`None`: any role)
pub fn require(
    state: &AppState,
    headers: &HeaderMap,
    allowed: Option<&[Role]>,
) -> ApiResult<Session> {
    let session = session_state(state, headers)?;
    match authorize(&session, allowed) {
        Access::Granted => match session {
            SessionState::SignedIn(session) => Ok(session),
            _ => Err(ApiError::Unauthorized("Not signed in".to_string())),
        },
        Access::Denied => Err(ApiError::Forbidden(format!(
            "role {} may not access this resource",
            session.role().map(|r| r.as_str()).unwrap_or("unknown")
        ))),
        Access::RedirectToLogin | Access::Pending => {
            Err(ApiError::Unauthorized("Not signed in".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(bearer_token(&headers), Some("abc123"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc123"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("bearer   "));
        assert_eq!(bearer_token(&headers), None);
    }
}
