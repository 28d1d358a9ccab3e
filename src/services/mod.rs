//! Collection services
//!
//! Thin wrappers translating dashboard operations into store calls.
//! Errors from the store propagate unchanged.

mod students;
mod users;

pub use students::StudentService;
pub use users::{BulkAccountReport, BulkAccountFailure, UserService};

use thiserror::Error;

use crate::auth::AuthError;
use crate::files::FileError;
use crate::storage::StorageError;

/// Errors from operations that span more than the store
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    File(#[from] FileError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;
