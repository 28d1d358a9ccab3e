//! Attendance REST API
//!
//! HTTP API layer for the attendance dashboard, built with Axum.
//!
//! # Endpoints
//!
//! ## Auth
//! - `POST /api/v1/auth/sign-in` - Email/password sign-in
//! - `POST /api/v1/auth/federated` - Sign-in from trusted proxy headers
//! - `POST /api/v1/auth/sign-out` - Revoke the session
//! - `GET /api/v1/auth/session` - Current user
//! - `POST /api/v1/auth/password-reset` - Issue a reset token
//! - `POST /api/v1/auth/password-reset/confirm` - Use a reset token
//! - `POST /api/v1/auth/change-password` - Change password
//!
//! ## Users (admin)
//! - `GET /api/v1/users` - List users with role counts
//! - `POST /api/v1/users` - Create an account
//! - `POST /api/v1/users/from-students` - Parent accounts for students
//! - `PUT /api/v1/users/:uid/role` - Change a role
//! - `PUT /api/v1/users/:uid/profile` - Update a profile (owner or admin)
//!
//! ## Students (admin, teacher)
//! - `GET /api/v1/students`, `POST /api/v1/students`
//! - `GET|PUT|DELETE /api/v1/students/:id`
//! - `POST /api/v1/students/:id/photo` - Photo upload
//!
//! ## Attendance, dashboard, reports
//! - `GET /api/v1/attendance` - Browse records
//! - `POST /api/v1/attendance` - Capture a record
//! - `GET /api/v1/dashboard` - Dashboard figures
//! - `GET /api/v1/reports` - Report for a period
//! - `GET /api/v1/reports/export` - Spreadsheet download
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//! - `GET /health` - Full health status
//!
//! ## Other
//! - `GET /api/v1/ws?token=` - Live mirror stream
//! - `GET /files/...` - Uploaded photos
//!
//! # Example
//!
//! ```rust,ignore
//! use school_attendance::api::{serve, AppState};
//! use school_attendance::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     let state = AppState::open(config)?;
//!     serve(state).await?;
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod session;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue},
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::config::ApiConfig;
use crate::live::websocket_handler;

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.api.max_upload_bytes;
    let files_dir = state.files.root().to_path_buf();
    let cors = cors_layer(&state.config.api);

    let api_routes = Router::new()
        // Auth routes
        .route("/auth/sign-in", post(routes::auth::sign_in))
        .route("/auth/federated", post(routes::auth::federated))
        .route("/auth/sign-out", post(routes::auth::sign_out))
        .route("/auth/session", get(routes::auth::current_session))
        .route("/auth/password-reset", post(routes::auth::request_password_reset))
        .route(
            "/auth/password-reset/confirm",
            post(routes::auth::confirm_password_reset),
        )
        .route("/auth/change-password", post(routes::auth::change_password))
        // User routes
        .route(
            "/users",
            get(routes::users::list_users).post(routes::users::create_user),
        )
        .route("/users/from-students", post(routes::users::create_from_students))
        .route("/users/:uid/role", put(routes::users::change_role))
        .route("/users/:uid/profile", put(routes::users::update_profile))
        // Student routes
        .route(
            "/students",
            get(routes::students::list_students).post(routes::students::create_student),
        )
        .route(
            "/students/:id",
            get(routes::students::get_student)
                .put(routes::students::update_student)
                .delete(routes::students::delete_student),
        )
        .route(
            "/students/:id/photo",
            post(routes::students::upload_photo).layer(DefaultBodyLimit::max(upload_limit)),
        )
        // Attendance routes
        .route(
            "/attendance",
            get(routes::attendance::list_attendance).post(routes::attendance::capture),
        )
        // Dashboard and report routes
        .route("/dashboard", get(routes::dashboard::dashboard))
        .route("/reports", get(routes::reports::get_report))
        .route("/reports/export", get(routes::reports::export_report))
        // WebSocket route
        .route("/ws", get(websocket_handler));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    // Create shared state
    let shared_state = Arc::new(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .nest_service("/files", ServeDir::new(files_dir))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(shared_state)
}

/// Configured origins, or any origin when none are listed
fn cors_layer(config: &ApiConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([header::CONTENT_DISPOSITION])
}

/// Start the API server
pub async fn serve(state: AppState) -> Result<(), ApiError> {
    let addr = state.config.api.addr();
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Attendance API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("Attendance API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{LogNotifier, NewAccount};
    use crate::config::Config;
    use crate::storage::{NewStudent, Role, StorageConfig, StorageEngine};
    use axum::{
        body::Body,
        http::{header, Request, Response, StatusCode},
    };
    use serde_json::{json, Value};
    use tempfile::tempdir;
    use tower::util::ServiceExt;

    async fn create_test_app() -> (Router, AppState, tempfile::TempDir) {
        create_test_app_with(|_| {}).await
    }

    async fn create_test_app_with(
        customize: impl FnOnce(&mut Config),
    ) -> (Router, AppState, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let mut config = Config::default();
        config.store.data_dir = dir.path().to_string_lossy().to_string();
        config.files.public_base_url = "http://test/files".to_string();
        customize(&mut config);

        let store = Arc::new(StorageEngine::open(&StorageConfig::new(dir.path())).unwrap());
        let state = AppState::new(store, config, Arc::new(LogNotifier));
        let router = build_router(state.clone());

        (router, state, dir)
    }

    fn token_for(state: &AppState, email: &str, role: Role) -> String {
        state
            .auth
            .create_account(NewAccount {
                email: email.to_string(),
                password: "secret123".to_string(),
                display_name: None,
                role,
                school_id: None,
            })
            .unwrap();
        state.auth.sign_in(email, "secret123").unwrap().token
    }

    fn get(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    fn send_json(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_json(response: Response<Body>) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_live() {
        let (app, _state, _dir) = create_test_app().await;
        let response = app.oneshot(get("/health/live", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_ready() {
        let (app, _state, _dir) = create_test_app().await;
        let response = app.oneshot(get("/health/ready", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_full() {
        let (app, _state, _dir) = create_test_app().await;
        let response = app.oneshot(get("/health", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_dashboard_requires_session() {
        let (app, _state, _dir) = create_test_app().await;
        let response = app.oneshot(get("/api/v1/dashboard", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
        assert!(body["request_id"].is_string());
    }

    #[tokio::test]
    async fn test_sign_in_and_session() {
        let (app, state, _dir) = create_test_app().await;
        token_for(&state, "teacher@school.vn", Role::Teacher);

        let response = app
            .clone()
            .oneshot(send_json(
                "POST",
                "/api/v1/auth/sign-in",
                None,
                json!({"email": "teacher@school.vn", "password": "secret123"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let token = body["token"].as_str().unwrap().to_string();
        assert_eq!(body["user"]["role"], "teacher");

        let response = app
            .oneshot(get("/api/v1/auth/session", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["email"], "teacher@school.vn");
    }

    #[tokio::test]
    async fn test_sign_in_wrong_password() {
        let (app, state, _dir) = create_test_app().await;
        token_for(&state, "teacher@school.vn", Role::Teacher);

        let response = app
            .oneshot(send_json(
                "POST",
                "/api/v1/auth/sign-in",
                None,
                json!({"email": "teacher@school.vn", "password": "wrong-password"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    fn federated_request(email: &str, secret: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/v1/auth/federated")
            .header("x-forwarded-email", email);
        if let Some(secret) = secret {
            builder = builder.header("x-proxy-secret", secret);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_federated_sign_in_needs_proxy_secret() {
        let (app, state, _dir) = create_test_app_with(|config| {
            config.auth.federated.enabled = true;
            config.auth.federated.proxy_secret = Some("proxy-key".to_string());
        })
        .await;
        token_for(&state, "root@school.vn", Role::Admin);

        for secret in [None, Some("wrong-key")] {
            let response = app
                .clone()
                .oneshot(federated_request("root@school.vn", secret))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            let body = body_json(response).await;
            assert!(body.get("token").is_none());
        }

        let response = app
            .oneshot(federated_request("root@school.vn", Some("proxy-key")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["user"]["role"], "admin");
    }

    #[tokio::test]
    async fn test_federated_sign_in_refused_without_configured_secret() {
        let (app, state, _dir) = create_test_app_with(|config| {
            config.auth.federated.enabled = true;
        })
        .await;
        token_for(&state, "root@school.vn", Role::Admin);

        let response = app
            .oneshot(federated_request("root@school.vn", Some("")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_sign_out_revokes_session() {
        let (app, state, _dir) = create_test_app().await;
        let token = token_for(&state, "admin@school.vn", Role::Admin);

        let response = app
            .clone()
            .oneshot(send_json("POST", "/api/v1/auth/sign-out", Some(&token), json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(get("/api/v1/auth/session", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_parent_denied_students() {
        let (app, state, _dir) = create_test_app().await;
        let parent = token_for(&state, "parent@school.vn", Role::Parent);
        let admin = token_for(&state, "admin@school.vn", Role::Admin);

        let response = app
            .clone()
            .oneshot(get("/api/v1/students", Some(&parent)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .oneshot(get("/api/v1/students", Some(&admin)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_create_student_validation() {
        let (app, state, _dir) = create_test_app().await;
        let token = token_for(&state, "teacher@school.vn", Role::Teacher);

        let response = app
            .oneshot(send_json(
                "POST",
                "/api/v1/students",
                Some(&token),
                json!({"student_code": "", "name": "An", "class": "12A1"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_invalid_json() {
        let (app, state, _dir) = create_test_app().await;
        let token = token_for(&state, "teacher@school.vn", Role::Teacher);

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/students")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::from("not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_capture_and_browse_attendance() {
        let (app, state, _dir) = create_test_app().await;
        let token = token_for(&state, "teacher@school.vn", Role::Teacher);
        let id = state
            .students
            .create(NewStudent::new("SV001", "Nguyen Van An", "12A1"))
            .unwrap();

        let response = app
            .clone()
            .oneshot(send_json(
                "POST",
                "/api/v1/attendance",
                Some(&token),
                json!({"student_id": id, "status": "present", "confidence": 0.93}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let record = body_json(response).await;
        assert_eq!(record["student_code"], "SV001");
        assert_eq!(record["class"], "12A1");

        let response = app
            .clone()
            .oneshot(get("/api/v1/attendance?class=12A1", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["counts"]["present"], 1);
        assert_eq!(body["rate"], 100.0);

        let response = app
            .oneshot(get("/api/v1/dashboard", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["stats"]["total_students"], 1);
        assert_eq!(body["stats"]["today"]["present"], 1);
        assert_eq!(body["class_activity"][0]["class"], "12A1");
    }

    #[tokio::test]
    async fn test_capture_unknown_status_rejected() {
        let (app, state, _dir) = create_test_app().await;
        let token = token_for(&state, "teacher@school.vn", Role::Teacher);

        let response = app
            .oneshot(send_json(
                "POST",
                "/api/v1/attendance",
                Some(&token),
                json!({"student_id": "x", "status": "sleeping"}),
            ))
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn test_report_and_export() {
        let (app, state, _dir) = create_test_app().await;
        let token = token_for(&state, "parent@school.vn", Role::Parent);
        crate::demo::seed_store(&state.store, crate::report::today()).unwrap();

        let response = app
            .clone()
            .oneshot(get("/api/v1/reports?period=month", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["period"], "month");
        assert_eq!(body["summary"]["total_sessions"], 8);
        assert!(body["by_class"].is_array());

        let response = app
            .clone()
            .oneshot(get(
                "/api/v1/reports/export?period=week&format=csv",
                Some(&token),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.contains("attendance_report_week_"));
        assert!(disposition.ends_with(".csv\""));

        let response = app
            .oneshot(get("/api/v1/reports?period=decade", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_users_admin_only_with_counts() {
        let (app, state, _dir) = create_test_app().await;
        let admin = token_for(&state, "admin@school.vn", Role::Admin);
        let teacher = token_for(&state, "teacher@school.vn", Role::Teacher);

        let response = app
            .clone()
            .oneshot(get("/api/v1/users", Some(&teacher)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .oneshot(get("/api/v1/users?search=TEACHER", Some(&admin)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["users"].as_array().unwrap().len(), 1);
        assert_eq!(body["counts"]["total"], 2);
        assert_eq!(body["counts"]["admin"], 1);
    }

    #[tokio::test]
    async fn test_profile_update_owner_or_admin() {
        let (app, state, _dir) = create_test_app().await;
        let teacher = token_for(&state, "teacher@school.vn", Role::Teacher);
        let other = token_for(&state, "other@school.vn", Role::Teacher);
        let uid = state
            .store
            .find_user_by_email("teacher@school.vn")
            .unwrap()
            .unwrap()
            .uid;
        let uri = format!("/api/v1/users/{}/profile", uid);

        let response = app
            .clone()
            .oneshot(send_json("PUT", &uri, Some(&other), json!({"display_name": "X"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .oneshot(send_json(
                "PUT",
                &uri,
                Some(&teacher),
                json!({"display_name": "Co Lan"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["display_name"], "Co Lan");
    }

    #[tokio::test]
    async fn test_change_password_mismatch() {
        let (app, state, _dir) = create_test_app().await;
        let token = token_for(&state, "teacher@school.vn", Role::Teacher);

        let response = app
            .oneshot(send_json(
                "POST",
                "/api/v1/auth/change-password",
                Some(&token),
                json!({
                    "current_password": "secret123",
                    "new_password": "newsecret",
                    "confirm_password": "different"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_password_reset_always_accepted() {
        let (app, _state, _dir) = create_test_app().await;

        let response = app
            .oneshot(send_json(
                "POST",
                "/api/v1/auth/password-reset",
                None,
                json!({"email": "nobody@school.vn"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_photo_upload_served() {
        let (app, state, _dir) = create_test_app().await;
        let token = token_for(&state, "teacher@school.vn", Role::Teacher);
        let id = state
            .students
            .create(NewStudent::new("SV001", "An", "12A1"))
            .unwrap();

        let request = Request::builder()
            .method("POST")
            .uri(format!("/api/v1/students/{}/photo?file_name=face.png", id))
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::from(&b"fakepng"[..]))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(
            body["url"],
            format!("http://test/files/students/{}/face.png", id)
        );

        let response = app
            .oneshot(get(&format!("/files/students/{}/face.png", id), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
