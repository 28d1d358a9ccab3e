//! API Error Types
//!
//! Defines error types for the API layer and implements conversion
//! to HTTP responses with appropriate status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::auth::AuthError;
use crate::export::ExportError;
use crate::files::FileError;
use crate::live::HubError;
use crate::services::ServiceError;
use crate::storage::StorageError;

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request validation failed
    #[error("Validation error: {0}")]
    Validation(String),

    /// No valid session
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Session role not allowed
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Duplicate resource
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Storage layer error
    #[error("Storage error: {0}")]
    Storage(StorageError),

    /// Reset delivery or other upstream failure
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Spreadsheet rendering failed
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            StorageError::Conflict(message) => ApiError::Conflict(message),
            StorageError::Validation(message) => ApiError::Validation(message),
            other => ApiError::Storage(other),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials
            | AuthError::UserDataMissing
            | AuthError::Unauthenticated
            | AuthError::SessionExpired
            | AuthError::UntrustedProxy => ApiError::Unauthorized(err.to_string()),
            AuthError::InvalidEmail(_)
            | AuthError::WeakPassword { .. }
            | AuthError::PasswordMismatch
            | AuthError::InvalidResetToken => ApiError::Validation(err.to_string()),
            AuthError::FederatedDisabled => ApiError::Forbidden(err.to_string()),
            AuthError::Notify(message) => ApiError::ServiceUnavailable(message),
            AuthError::Storage(e) => e.into(),
        }
    }
}

impl From<FileError> for ApiError {
    fn from(err: FileError) -> Self {
        match err {
            FileError::InvalidName(_) | FileError::Empty => ApiError::Validation(err.to_string()),
            FileError::Io(e) => ApiError::Io(e),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Storage(e) => e.into(),
            ServiceError::File(e) => e.into(),
            ServiceError::Auth(e) => e.into(),
        }
    }
}

impl From<HubError> for ApiError {
    fn from(err: HubError) -> Self {
        match err {
            HubError::TooManyConnections(_) | HubError::TooManyTopics(_) => {
                ApiError::ServiceUnavailable(err.to_string())
            }
            HubError::InvalidTopic(_) => ApiError::Validation(err.to_string()),
            HubError::Forbidden(_) => ApiError::Forbidden(err.to_string()),
            HubError::ConnectionNotFound => ApiError::NotFound(err.to_string()),
            HubError::SendFailed => ApiError::Internal(err.to_string()),
        }
    }
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
    pub request_id: String,
}

/// Error details
#[derive(Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            ApiError::ServiceUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE")
            }
            ApiError::Export(_) => (StatusCode::INTERNAL_SERVER_ERROR, "EXPORT_ERROR"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ApiError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let request_id = uuid::Uuid::new_v4().to_string();

        if status.is_server_error() {
            tracing::error!(
                request_id = %request_id,
                error_code = %code,
                error_message = %self,
                "API error occurred"
            );
        } else {
            tracing::warn!(
                request_id = %request_id,
                error_code = %code,
                error_message = %self,
                "Request rejected"
            );
        }

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: self.to_string(),
            },
            request_id,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_mapping() {
        let err: ApiError = StorageError::not_found("student", "x").into();
        assert_eq!(err.status_and_code().0, StatusCode::NOT_FOUND);

        let err: ApiError = StorageError::Conflict("email taken".to_string()).into();
        assert_eq!(err.status_and_code().0, StatusCode::CONFLICT);

        let err: ApiError = StorageError::Lock("poisoned".to_string()).into();
        assert_eq!(err.status_and_code().0, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_auth_error_mapping() {
        let err: ApiError = AuthError::SessionExpired.into();
        assert_eq!(err.status_and_code().0, StatusCode::UNAUTHORIZED);

        let err: ApiError = AuthError::UntrustedProxy.into();
        assert_eq!(err.status_and_code().0, StatusCode::UNAUTHORIZED);

        let err: ApiError = AuthError::PasswordMismatch.into();
        assert_eq!(err.status_and_code().0, StatusCode::BAD_REQUEST);

        let err: ApiError = AuthError::Storage(StorageError::not_found("user", "u1")).into();
        assert_eq!(err.status_and_code().0, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_hub_error_mapping() {
        let err: ApiError = HubError::Forbidden("students".to_string()).into();
        assert_eq!(err.status_and_code().0, StatusCode::FORBIDDEN);
    }
}
