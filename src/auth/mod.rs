//! Authentication
//!
//! Accounts, credentials and sessions:
//!
//! - **service**: sign-in (password and federated), sessions, account creation,
//!   password change and reset
//! - **password**: salted SHA-256 hashing
//! - **notifier**: delivery of reset tokens (log or webhook)
//! - **error**: Error types
//!
//! Sessions are opaque bearer tokens stored next to the user documents.

mod error;
mod notifier;
mod password;
mod service;

pub use error::{AuthError, AuthResult};
pub use notifier::{LogNotifier, ResetMessage, ResetNotifier, WebhookNotifier};
pub use password::{hash_password, verify_password};
pub use service::{validate_email, AuthService, FederatedIdentity, NewAccount, Session};
