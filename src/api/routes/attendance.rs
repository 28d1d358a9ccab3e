//! Attendance Routes
//!
//! - GET /api/v1/attendance - Browse records with counts and pagination
//! - POST /api/v1/attendance - Capture one observation (admin, teacher)

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use std::sync::Arc;

use crate::api::dto::{AttendanceListResponse, AttendanceParams, CaptureRequest};
use crate::api::error::{ApiError, ApiResult};
use crate::api::session::{require, STAFF};
use crate::api::state::AppState;
use crate::report::{paginate, today, AttendanceFilter, StatusCounts, DEFAULT_PER_PAGE};
use crate::storage::{AttendanceQuery, AttendanceRecord, NewAttendanceRecord};

/// Largest accepted page size
const MAX_PER_PAGE: usize = 200;

/// GET /api/v1/attendance
///
/// Without `date`, `start` or `end` the list shows today. Counts cover the
/// selected days and class before the status filter, as the attendance
/// screen's summary cards do.
pub async fn list_attendance(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<AttendanceParams>,
) -> ApiResult<Json<AttendanceListResponse>> {
    require(&state, &headers, None)?;

    let query = match (params.date, params.start, params.end) {
        (Some(date), _, _) => AttendanceQuery::on(date),
        (None, None, None) => AttendanceQuery::on(today()),
        (None, start, end) => {
            if let (Some(start), Some(end)) = (start, end) {
                if start > end {
                    return Err(ApiError::Validation(
                        "start must not be after end".to_string(),
                    ));
                }
            }
            AttendanceQuery {
                from: start,
                to: end,
                ..AttendanceQuery::new()
            }
        }
    };

    let records = state.store.query_attendance(&query)?;

    let in_class = AttendanceFilter::default()
        .class(params.class.as_deref())
        .apply(&records);
    let counts = StatusCounts::from_records(&in_class);

    let rows = AttendanceFilter::default()
        .status(params.status)
        .apply(&in_class);

    let per_page = params
        .per_page
        .unwrap_or(DEFAULT_PER_PAGE)
        .min(MAX_PER_PAGE);
    let page = paginate(&rows, params.page.unwrap_or(1), per_page);

    Ok(Json(AttendanceListResponse {
        records: page.items,
        page: page.page,
        per_page: page.per_page,
        total: page.total,
        total_pages: page.total_pages,
        rate: counts.attendance_rate(),
        counts,
    }))
}

/// POST /api/v1/attendance
///
/// Student name, code and class are copied from the student document.
pub async fn capture(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CaptureRequest>,
) -> ApiResult<(StatusCode, Json<AttendanceRecord>)> {
    let session = require(&state, &headers, Some(STAFF))?;

    if let Some(confidence) = req.confidence {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(ApiError::Validation(
                "confidence must be between 0 and 1".to_string(),
            ));
        }
    }

    let student = state.students.get(&req.student_id)?;
    let mut new = NewAttendanceRecord::for_student(
        &student,
        req.date.unwrap_or_else(today),
        req.status,
    );
    new.timestamp = req.timestamp;
    new.scanned_by = req.scanned_by.or_else(|| Some(session.user.uid.clone()));
    new.confidence = req.confidence;
    new.session_id = req.session_id;
    new.note = req.note;

    let record = state.store.insert_attendance(new, Utc::now())?;

    tracing::info!(
        student_id = %record.student_id,
        status = %record.status,
        class = %record.class,
        "Attendance captured"
    );
    Ok((StatusCode::CREATED, Json(record)))
}
