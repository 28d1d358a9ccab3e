//! Authentication error types

use crate::storage::StorageError;
use thiserror::Error;

/// Errors raised by sign-in, account and session operations
#[derive(Error, Debug)]
pub enum AuthError {
    /// Unknown email or wrong password
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Credentials matched but no user document exists
    #[error("User data not found")]
    UserDataMissing,

    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Password must be at least {min} characters")]
    WeakPassword { min: usize },

    /// New password and its confirmation differ
    #[error("Password confirmation does not match")]
    PasswordMismatch,

    #[error("Not signed in")]
    Unauthenticated,

    #[error("Session expired")]
    SessionExpired,

    #[error("Invalid or expired password reset token")]
    InvalidResetToken,

    #[error("Federated sign-in is disabled")]
    FederatedDisabled,

    /// Federated request without the shared proxy secret
    #[error("Federated identity not from a trusted proxy")]
    UntrustedProxy,

    /// Reset delivery failed
    #[error("Notification error: {0}")]
    Notify(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type AuthResult<T> = Result<T, AuthError>;
