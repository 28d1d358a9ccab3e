//! HTTP API Client
//!
//! Functions for communicating with the attendance REST API.

use gloo_net::http::{Request, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::types::*;

/// Default API base URL
pub const DEFAULT_API_BASE: &str = "http://localhost:8090/api/v1";

const API_URL_KEY: &str = "attendance_api_url";

/// Get the API base URL from local storage or use default
pub fn get_api_base() -> String {
    let url = web_sys::window()
        .and_then(|w| w.local_storage().ok().flatten())
        .and_then(|s| s.get_item(API_URL_KEY).ok().flatten())
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
    url.trim_end_matches('/').to_string()
}

/// Set the API base URL in local storage
pub fn set_api_base(url: &str) {
    if let Some(storage) = web_sys::window().and_then(|w| w.local_storage().ok().flatten()) {
        let _ = storage.set_item(API_URL_KEY, url);
    }
}

/// Public photo URL, served next to the API
pub fn files_base() -> String {
    get_api_base().replace("/api/v1", "/files")
}

// ============ Plumbing ============

fn url(path: &str) -> String {
    format!("{}{}", get_api_base(), path)
}

fn authorized(builder: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(t) => builder.header("Authorization", &format!("Bearer {}", t)),
        None => builder,
    }
}

async fn check(response: Response) -> Result<Response, String> {
    if response.ok() {
        return Ok(response);
    }
    let status = response.status();
    match response.json::<ErrorBody>().await {
        Ok(body) => Err(body.error.message),
        Err(_) => Err(format!("HTTP {}", status)),
    }
}

async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, String> {
    check(response)
        .await?
        .json()
        .await
        .map_err(|e| format!("Parse error: {}", e))
}

async fn get<T: DeserializeOwned>(path: &str, token: &str) -> Result<T, String> {
    let response = authorized(Request::get(&url(path)), Some(token))
        .send()
        .await
        .map_err(|e| format!("Network error: {}", e))?;
    parse(response).await
}

async fn send<B: Serialize>(
    builder: RequestBuilder,
    token: Option<&str>,
    body: &B,
) -> Result<Response, String> {
    let response = authorized(builder, token)
        .json(body)
        .map_err(|e| format!("Request build error: {}", e))?
        .send()
        .await
        .map_err(|e| format!("Network error: {}", e))?;
    check(response).await
}

fn query_string(params: &[(&str, Option<String>)]) -> String {
    let pairs: Vec<String> = params
        .iter()
        .filter_map(|(k, v)| {
            v.as_ref()
                .filter(|v| !v.is_empty())
                .map(|v| format!("{}={}", k, js_sys::encode_uri_component(v)))
        })
        .collect();
    if pairs.is_empty() {
        String::new()
    } else {
        format!("?{}", pairs.join("&"))
    }
}

// ============ Auth ============

pub async fn sign_in(email: &str, password: &str) -> Result<SessionResponse, String> {
    let body = serde_json::json!({ "email": email, "password": password });
    let response = send(Request::post(&url("/auth/sign-in")), None, &body).await?;
    response.json().await.map_err(|e| format!("Parse error: {}", e))
}

pub async fn sign_out(token: &str) -> Result<(), String> {
    send(Request::post(&url("/auth/sign-out")), Some(token), &serde_json::json!({})).await?;
    Ok(())
}

pub async fn current_user(token: &str) -> Result<User, String> {
    get("/auth/session", token).await
}

pub async fn request_password_reset(email: &str) -> Result<(), String> {
    let body = serde_json::json!({ "email": email });
    send(Request::post(&url("/auth/password-reset")), None, &body).await?;
    Ok(())
}

pub async fn change_password(
    token: &str,
    current: &str,
    new: &str,
    confirm: &str,
) -> Result<(), String> {
    let body = serde_json::json!({
        "current_password": current,
        "new_password": new,
        "confirm_password": confirm,
    });
    send(Request::post(&url("/auth/change-password")), Some(token), &body).await?;
    Ok(())
}

// ============ Students ============

pub async fn fetch_students(token: &str, class: Option<String>) -> Result<Vec<Student>, String> {
    #[derive(serde::Deserialize)]
    struct StudentList {
        students: Vec<Student>,
    }

    let path = format!("/students{}", query_string(&[("class", class)]));
    let list: StudentList = get(&path, token).await?;
    Ok(list.students)
}

pub async fn create_student(token: &str, form: &StudentForm) -> Result<String, String> {
    #[derive(serde::Deserialize)]
    struct Created {
        id: String,
    }

    let response = send(Request::post(&url("/students")), Some(token), form).await?;
    let created: Created = response.json().await.map_err(|e| format!("Parse error: {}", e))?;
    Ok(created.id)
}

pub async fn update_student(token: &str, id: &str, form: &StudentForm) -> Result<Student, String> {
    let response = send(Request::put(&url(&format!("/students/{}", id))), Some(token), form).await?;
    response.json().await.map_err(|e| format!("Parse error: {}", e))
}

pub async fn delete_student(token: &str, id: &str) -> Result<(), String> {
    let response = authorized(Request::delete(&url(&format!("/students/{}", id))), Some(token))
        .send()
        .await
        .map_err(|e| format!("Network error: {}", e))?;
    check(response).await?;
    Ok(())
}

/// Upload a photo file as the raw request body
pub async fn upload_photo(token: &str, id: &str, file: web_sys::File) -> Result<String, String> {
    #[derive(serde::Deserialize)]
    struct Uploaded {
        url: String,
    }

    let path = format!(
        "/students/{}/photo{}",
        id,
        query_string(&[("file_name", Some(file.name()))])
    );
    let response = authorized(Request::post(&url(&path)), Some(token))
        .body(file)
        .map_err(|e| format!("Request build error: {}", e))?
        .send()
        .await
        .map_err(|e| format!("Network error: {}", e))?;
    let uploaded: Uploaded = parse(response).await?;
    Ok(uploaded.url)
}

// ============ Attendance, dashboard, reports ============

/// Attendance browse filters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttendanceFilter {
    pub date: Option<String>,
    pub class: Option<String>,
    pub status: Option<AttendanceStatus>,
    pub page: usize,
}

pub async fn fetch_attendance(token: &str, filter: &AttendanceFilter) -> Result<AttendancePage, String> {
    let path = format!(
        "/attendance{}",
        query_string(&[
            ("date", filter.date.clone()),
            ("class", filter.class.clone()),
            ("status", filter.status.map(|s| s.as_str().to_string())),
            ("page", Some(filter.page.max(1).to_string())),
        ])
    );
    get(&path, token).await
}

pub async fn fetch_dashboard(token: &str) -> Result<Dashboard, String> {
    get("/dashboard", token).await
}

pub async fn fetch_report(
    token: &str,
    period: ReportPeriod,
    class: Option<String>,
) -> Result<Report, String> {
    let path = format!(
        "/reports{}",
        query_string(&[("period", Some(period.as_str().to_string())), ("class", class)])
    );
    get(&path, token).await
}

/// Downloaded spreadsheet
pub struct ExportFile {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

pub async fn export_report(
    token: &str,
    period: ReportPeriod,
    class: Option<String>,
    format: &str,
) -> Result<ExportFile, String> {
    let path = format!(
        "/reports/export{}",
        query_string(&[
            ("period", Some(period.as_str().to_string())),
            ("class", class),
            ("format", Some(format.to_string())),
        ])
    );
    let response = authorized(Request::get(&url(&path)), Some(token))
        .send()
        .await
        .map_err(|e| format!("Network error: {}", e))?;
    let response = check(response).await?;

    let headers = response.headers();
    let file_name = headers
        .get("content-disposition")
        .and_then(|v| v.split("filename=").nth(1).map(|n| n.trim_matches('"').to_string()));
    let content_type = headers
        .get("content-type")
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let bytes = response
        .binary()
        .await
        .map_err(|e| format!("Read error: {}", e))?;

    Ok(ExportFile {
        file_name,
        content_type,
        bytes,
    })
}

// ============ Users ============

pub async fn fetch_users(
    token: &str,
    role: Option<Role>,
    search: Option<String>,
) -> Result<UserList, String> {
    let path = format!(
        "/users{}",
        query_string(&[("role", role.map(|r| r.as_str().to_string())), ("search", search)])
    );
    get(&path, token).await
}

pub async fn change_role(token: &str, uid: &str, role: Role) -> Result<User, String> {
    let body = serde_json::json!({ "role": role });
    let response = send(Request::put(&url(&format!("/users/{}/role", uid))), Some(token), &body).await?;
    response.json().await.map_err(|e| format!("Parse error: {}", e))
}

pub async fn create_parent_accounts(token: &str) -> Result<serde_json::Value, String> {
    let response = send(
        Request::post(&url("/users/from-students")),
        Some(token),
        &serde_json::json!({}),
    )
    .await?;
    response.json().await.map_err(|e| format!("Parse error: {}", e))
}

pub async fn update_display_name(token: &str, uid: &str, name: &str) -> Result<User, String> {
    let body = serde_json::json!({ "display_name": name });
    let response = send(Request::put(&url(&format!("/users/{}/profile", uid))), Some(token), &body).await?;
    response.json().await.map_err(|e| format!("Parse error: {}", e))
}

/// Check API health
pub async fn check_health() -> Result<HealthResponse, String> {
    let health_url = get_api_base().replace("/api/v1", "/health");

    let response = Request::get(&health_url)
        .send()
        .await
        .map_err(|e| format!("Network error: {}", e))?;

    if !response.ok() {
        return Err("API is not healthy".to_string());
    }

    response.json().await.map_err(|e| format!("Parse error: {}", e))
}
