//! Auth Routes
//!
//! - POST /api/v1/auth/sign-in - Email/password sign-in
//! - POST /api/v1/auth/federated - Sign-in from trusted proxy headers
//! - POST /api/v1/auth/sign-out - Revoke the current session
//! - GET /api/v1/auth/session - Current user
//! - POST /api/v1/auth/password-reset - Issue a reset token
//! - POST /api/v1/auth/password-reset/confirm - Set a password with a reset token
//! - POST /api/v1/auth/change-password - Change the signed-in user's password

use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::{
    ChangePasswordRequest, PasswordResetConfirmRequest, PasswordResetRequest, SessionResponse,
    SignInRequest, StatusResponse,
};
use crate::api::error::{ApiError, ApiResult};
use crate::api::session::{bearer_token, require};
use crate::api::state::AppState;
use crate::auth::{AuthError, FederatedIdentity};
use crate::storage::User;

/// POST /api/v1/auth/sign-in
pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignInRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let session = state.auth.sign_in(&req.email, &req.password)?;
    Ok(Json(session.into()))
}

/// POST /api/v1/auth/federated
///
/// The reverse proxy in front of the server has already verified the
/// identity; the configured headers carry it, together with the shared
/// proxy secret.
pub async fn federated(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<SessionResponse>> {
    let config = &state.auth.config().federated;
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from)
    };

    let email = header(&config.email_header)
        .ok_or_else(|| ApiError::Unauthorized("missing federated identity".to_string()))?;

    let secret = header(&config.proxy_secret_header);

    let session = state.auth.sign_in_federated(
        FederatedIdentity {
            email,
            display_name: header(&config.name_header),
            photo_url: header(&config.photo_header),
        },
        secret.as_deref(),
    )?;
    Ok(Json(session.into()))
}

/// POST /api/v1/auth/sign-out
pub async fn sign_out(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<StatusResponse>> {
    let token = bearer_token(&headers)
        .ok_or_else(|| ApiError::Unauthorized("Not signed in".to_string()))?;
    state.auth.sign_out(token)?;
    Ok(Json(StatusResponse::ok()))
}

/// GET /api/v1/auth/session
pub async fn current_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<User>> {
    let session = require(&state, &headers, None)?;
    Ok(Json(session.user))
}

/// POST /api/v1/auth/password-reset
///
/// Answers 202 whether or not the email has an account.
pub async fn request_password_reset(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PasswordResetRequest>,
) -> ApiResult<(StatusCode, Json<StatusResponse>)> {
    match state.auth.request_password_reset(&req.email).await {
        Ok(()) => {}
        Err(AuthError::Notify(message)) => {
            tracing::error!(error = %message, "Password reset delivery failed");
        }
        Err(e) => return Err(e.into()),
    }
    Ok((StatusCode::ACCEPTED, Json(StatusResponse::accepted())))
}

/// POST /api/v1/auth/password-reset/confirm
pub async fn confirm_password_reset(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PasswordResetConfirmRequest>,
) -> ApiResult<Json<StatusResponse>> {
    state
        .auth
        .confirm_password_reset(&req.token, &req.new_password)?;
    Ok(Json(StatusResponse::ok()))
}

/// POST /api/v1/auth/change-password
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<Json<StatusResponse>> {
    let session = require(&state, &headers, None)?;
    state.auth.change_password(
        &session.user.uid,
        &req.current_password,
        &req.new_password,
        &req.confirm_password,
    )?;
    Ok(Json(StatusResponse::ok()))
}
