//! User Routes
//!
//! - GET /api/v1/users - List users with role counts (admin)
//! - POST /api/v1/users - Create an account (admin)
//! - POST /api/v1/users/from-students - Parent accounts for students (admin)
//! - PUT /api/v1/users/:uid/role - Change a role (admin)
//! - PUT /api/v1/users/:uid/profile - Update a profile (self or admin)

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use std::sync::Arc;

use crate::api::dto::{CreateUserRequest, RoleUpdateRequest, UserListParams, UserListResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::session::{require, ADMIN};
use crate::api::state::AppState;
use crate::auth::NewAccount;
use crate::report::{search_users, RoleCounts};
use crate::services::BulkAccountReport;
use crate::storage::{ProfilePatch, Role, User};

/// GET /api/v1/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<UserListParams>,
) -> ApiResult<Json<UserListResponse>> {
    require(&state, &headers, Some(ADMIN))?;

    let all = state.users.list_all()?;
    let counts = RoleCounts::from_users(&all);

    let by_role: Vec<User> = match params.role {
        Some(role) => state.users.list_by_role(role)?,
        None => all,
    };
    let users = match params.search.as_deref() {
        Some(term) => search_users(&by_role, term),
        None => by_role,
    };

    Ok(Json(UserListResponse { users, counts }))
}

/// POST /api/v1/users
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let admin = require(&state, &headers, Some(ADMIN))?;

    let user = state.auth.create_account(NewAccount {
        email: req.email,
        password: req.password,
        display_name: req.display_name,
        role: req.role,
        school_id: req.school_id,
    })?;

    tracing::info!(admin_id = %admin.user.uid, user_id = %user.uid, "Admin created account");
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /api/v1/users/from-students
pub async fn create_from_students(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<BulkAccountReport>> {
    require(&state, &headers, Some(ADMIN))?;
    Ok(Json(state.users.create_accounts_from_students()?))
}

/// PUT /api/v1/users/:uid/role
pub async fn change_role(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(uid): Path<String>,
    Json(req): Json<RoleUpdateRequest>,
) -> ApiResult<Json<User>> {
    require(&state, &headers, Some(ADMIN))?;
    Ok(Json(state.users.change_role(&uid, req.role)?))
}

/// PUT /api/v1/users/:uid/profile
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(uid): Path<String>,
    Json(patch): Json<ProfilePatch>,
) -> ApiResult<Json<User>> {
    let session = require(&state, &headers, None)?;
    if session.user.uid != uid && session.user.role != Role::Admin {
        return Err(ApiError::Forbidden(
            "profiles can only be edited by their owner or an admin".to_string(),
        ));
    }
    Ok(Json(state.users.update_profile(&uid, &patch)?))
}
