//! User service

use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

use crate::auth::{AuthService, NewAccount};
use crate::storage::{ProfilePatch, Role, StorageEngine, StorageResult, User};

pub struct UserService {
    store: Arc<StorageEngine>,
    auth: Arc<AuthService>,
}

/// One student whose parent account could not be created
#[derive(Debug, Clone, Serialize)]
pub struct BulkAccountFailure {
    pub student_code: String,
    pub error: String,
}

/// Outcome of bulk parent account creation
#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkAccountReport {
    pub created: Vec<User>,
    /// Students without an email, or whose email already has an account
    pub skipped: usize,
    pub failed: Vec<BulkAccountFailure>,
}

impl UserService {
    pub fn new(store: Arc<StorageEngine>, auth: Arc<AuthService>) -> Self {
        Self { store, auth }
    }

    pub fn list_all(&self) -> StorageResult<Vec<User>> {
        self.store.list_users(None)
    }

    pub fn list_by_role(&self, role: Role) -> StorageResult<Vec<User>> {
        self.store.list_users(Some(role))
    }

    pub fn get(&self, uid: &str) -> StorageResult<User> {
        self.store.get_user(uid)
    }

    pub fn change_role(&self, uid: &str, role: Role) -> StorageResult<User> {
        let user = self.store.set_user_role(uid, role)?;
        tracing::info!(user_id = %uid, role = %role, "Role changed");
        Ok(user)
    }

    pub fn update_profile(&self, uid: &str, patch: &ProfilePatch) -> StorageResult<User> {
        self.store.update_user_profile(uid, patch)
    }

    /// Create a parent account for every student with an email that has none.
    ///
    /// The initial password is `{student_code}@123` and the class becomes the
    /// account's school association. Failures are logged and skipped.
    pub fn create_accounts_from_students(&self) -> StorageResult<BulkAccountReport> {
        let students = self.store.list_students(None)?;
        let mut taken: HashSet<String> = self
            .store
            .list_users(None)?
            .into_iter()
            .map(|u| u.email.to_lowercase())
            .collect();

        let mut report = BulkAccountReport::default();

        for student in students {
            let Some(email) = student.email.as_deref().map(str::trim).filter(|e| !e.is_empty())
            else {
                report.skipped += 1;
                continue;
            };
            if taken.contains(&email.to_lowercase()) {
                report.skipped += 1;
                continue;
            }

            let account = NewAccount {
                email: email.to_string(),
                password: format!("{}@123", student.student_code),
                display_name: Some(student.name.clone()),
                role: Role::Parent,
                school_id: Some(student.class.clone()),
            };

            match self.auth.create_account(account) {
                Ok(user) => {
                    taken.insert(user.email.to_lowercase());
                    report.created.push(user);
                }
                Err(e) => {
                    tracing::warn!(
                        student_id = %student.id,
                        student_code = %student.student_code,
                        error = %e,
                        "Could not create parent account"
                    );
                    report.failed.push(BulkAccountFailure {
                        student_code: student.student_code.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            created = report.created.len(),
            skipped = report.skipped,
            failed = report.failed.len(),
            "Parent accounts created from students"
        );
        Ok(report)
    }
}
