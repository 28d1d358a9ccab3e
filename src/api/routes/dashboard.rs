//! Dashboard Routes
//!
//! - GET /api/v1/dashboard - Today's, weekly and monthly figures plus class activity

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use chrono::{Duration, Utc};
use std::sync::Arc;

use crate::api::dto::{DashboardParams, DashboardResponse};
use crate::api::error::ApiResult;
use crate::api::session::require;
use crate::api::state::AppState;
use crate::report::{class_activity, today, AttendanceStats};
use crate::storage::AttendanceQuery;

const DEFAULT_ACTIVITY_LIMIT: usize = 5;

/// GET /api/v1/dashboard
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<DashboardParams>,
) -> ApiResult<Json<DashboardResponse>> {
    require(&state, &headers, None)?;

    let date = today();
    let records = state
        .store
        .query_attendance(&AttendanceQuery::since(date - Duration::days(30)))?;
    let total_students = state.students.count()?;

    Ok(Json(DashboardResponse {
        date,
        stats: AttendanceStats::compute(&records, date, total_students),
        class_activity: class_activity(
            &records,
            date,
            Utc::now(),
            params.limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT),
        ),
    }))
}
