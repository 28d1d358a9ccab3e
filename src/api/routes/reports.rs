//! Report Routes
//!
//! - GET /api/v1/reports?period=&class= - Charts and summary for a period
//! - GET /api/v1/reports/export?period=&class=&format= - Spreadsheet download

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
    Json,
};
use std::sync::Arc;

use crate::api::dto::ReportParams;
use crate::api::error::{ApiError, ApiResult};
use crate::api::session::require;
use crate::api::state::AppState;
use crate::export::{file_name, render, ExportFormat};
use crate::report::{today, Report, ReportPeriod};
use crate::storage::AttendanceQuery;

/// GET /api/v1/reports
pub async fn get_report(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<ReportParams>,
) -> ApiResult<Json<Report>> {
    require(&state, &headers, None)?;
    Ok(Json(build_report(&state, &params)?))
}

/// GET /api/v1/reports/export
pub async fn export_report(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<ReportParams>,
) -> ApiResult<Response> {
    let session = require(&state, &headers, None)?;

    let format = match params.format.as_deref() {
        Some(f) => f.parse::<ExportFormat>().map_err(ApiError::Validation)?,
        None => ExportFormat::default(),
    };
    let report = build_report(&state, &params)?;
    let bytes = render(&report, format)?;
    let name = file_name(report.period, report.end, format);

    tracing::info!(
        user_id = %session.user.uid,
        period = %report.period,
        format = %format,
        rows = report.daily.len(),
        "Report exported"
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, format.content_type())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", name),
        )
        .body(Body::from(bytes))
        .map_err(|e| ApiError::Internal(format!("Failed to build response: {}", e)))
}

fn build_report(state: &AppState, params: &ReportParams) -> ApiResult<Report> {
    let period = match params.period.as_deref() {
        Some(p) => p.parse::<ReportPeriod>().map_err(ApiError::Validation)?,
        None => ReportPeriod::default(),
    };

    let date = today();
    let class = params.class.as_deref();

    let mut query = AttendanceQuery::between(period.start_date(date), date);
    if let Some(c) = class
        .map(str::trim)
        .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("all"))
    {
        query = query.class(c);
    }
    let records = state.store.query_attendance(&query)?;

    Ok(Report::build(&records, period, class, date))
}
