//! Student Routes
//!
//! Admin and teacher only.
//!
//! - GET /api/v1/students - List students (`?class=`)
//! - POST /api/v1/students - Create a student
//! - GET /api/v1/students/:id - Get a student
//! - PUT /api/v1/students/:id - Patch a student
//! - DELETE /api/v1/students/:id - Delete a student
//! - POST /api/v1/students/:id/photo?file_name= - Upload a photo (raw body)

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use std::sync::Arc;

use crate::api::dto::{
    CreatedResponse, PhotoParams, PhotoResponse, StudentListParams, StudentListResponse,
};
use crate::api::error::{ApiError, ApiResult};
use crate::api::session::{require, STAFF};
use crate::api::state::AppState;
use crate::storage::{NewStudent, Student, StudentPatch};

/// GET /api/v1/students
pub async fn list_students(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<StudentListParams>,
) -> ApiResult<Json<StudentListResponse>> {
    require(&state, &headers, Some(STAFF))?;

    let class = params
        .class
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("all"));
    let students = match class {
        Some(class) => state.students.list_by_class(class)?,
        None => state.students.list()?,
    };

    Ok(Json(StudentListResponse {
        total: students.len(),
        students,
    }))
}

/// POST /api/v1/students
pub async fn create_student(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<NewStudent>,
) -> ApiResult<(StatusCode, Json<CreatedResponse>)> {
    require(&state, &headers, Some(STAFF))?;
    req.validate().map_err(ApiError::Validation)?;

    let id = state.students.create(req)?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// GET /api/v1/students/:id
pub async fn get_student(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<Student>> {
    require(&state, &headers, Some(STAFF))?;
    Ok(Json(state.students.get(&id)?))
}

/// PUT /api/v1/students/:id
pub async fn update_student(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(patch): Json<StudentPatch>,
) -> ApiResult<Json<Student>> {
    require(&state, &headers, Some(STAFF))?;
    Ok(Json(state.students.update(&id, &patch)?))
}

/// DELETE /api/v1/students/:id
pub async fn delete_student(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    require(&state, &headers, Some(STAFF))?;
    state.students.delete(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/students/:id/photo?file_name=
pub async fn upload_photo(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(params): Query<PhotoParams>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<PhotoResponse>)> {
    require(&state, &headers, Some(STAFF))?;

    let url = state
        .students
        .upload_photo(&id, &params.file_name, &body)
        .await?;
    Ok((StatusCode::CREATED, Json(PhotoResponse { url })))
}
