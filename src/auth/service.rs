//! Authentication service
//!
//! Email/password and federated sign-in, bearer sessions, admin account
//! creation, password change and password reset.

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::Serialize;
use std::sync::{Arc, OnceLock};
use uuid::Uuid;

use super::error::{AuthError, AuthResult};
use super::notifier::{ResetMessage, ResetNotifier};
use super::password::{hash_password, secrets_match, verify_password};
use crate::config::{AuthConfig, BootstrapAdmin};
use crate::storage::{NewUser, Role, SessionRow, StorageEngine, User};

/// An authenticated session
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Session {
    pub token: String,
    pub user: User,
    pub expires_at: DateTime<Utc>,
}

/// Identity asserted by the federated provider
#[derive(Debug, Clone)]
pub struct FederatedIdentity {
    pub email: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

/// Admin-created account
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
    pub role: Role,
    pub school_id: Option<String>,
}

pub struct AuthService {
    store: Arc<StorageEngine>,
    config: AuthConfig,
    notifier: Arc<dyn ResetNotifier>,
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
    })
}

/// Shape check for an email address
pub fn validate_email(email: &str) -> AuthResult<()> {
    if email_pattern().is_match(email.trim()) {
        Ok(())
    } else {
        Err(AuthError::InvalidEmail(email.to_string()))
    }
}

impl AuthService {
    pub fn new(
        store: Arc<StorageEngine>,
        config: AuthConfig,
        notifier: Arc<dyn ResetNotifier>,
    ) -> Self {
        Self {
            store,
            config,
            notifier,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Email/password sign-in. Stamps the last-login time.
    pub fn sign_in(&self, email: &str, password: &str) -> AuthResult<Session> {
        let user = self
            .store
            .find_user_by_email(email)?
            .ok_or(AuthError::InvalidCredentials)?;

        let credential = self
            .store
            .credential(&user.uid)?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &credential) {
            tracing::info!(user_id = %user.uid, "Rejected sign-in: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        self.start_session(user)
    }

    /// Federated sign-in. First sign-in creates a teacher account.
    ///
    /// `proxy_secret` is what the caller presented in the configured secret
    /// header; it must equal the configured secret.
    pub fn sign_in_federated(
        &self,
        identity: FederatedIdentity,
        proxy_secret: Option<&str>,
    ) -> AuthResult<Session> {
        let federated = &self.config.federated;
        if !federated.enabled {
            return Err(AuthError::FederatedDisabled);
        }

        let expected = federated
            .proxy_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                tracing::warn!("Federated sign-in enabled without a proxy secret; refusing");
                AuthError::UntrustedProxy
            })?;
        match proxy_secret {
            Some(presented) if secrets_match(presented, expected) => {}
            _ => {
                tracing::warn!(email = %identity.email, "Rejected federated sign-in: bad proxy secret");
                return Err(AuthError::UntrustedProxy);
            }
        }

        validate_email(&identity.email)?;

        let user = match self.store.find_user_by_email(&identity.email)? {
            Some(user) => user,
            None => {
                let user = self.store.insert_user(
                    NewUser {
                        email: identity.email,
                        display_name: identity.display_name,
                        photo_url: identity.photo_url,
                        role: Role::Teacher,
                        school_id: None,
                    },
                    Utc::now(),
                )?;
                tracing::info!(user_id = %user.uid, email = %user.email, "Created account on first federated sign-in");
                user
            }
        };

        self.start_session(user)
    }

    fn start_session(&self, mut user: User) -> AuthResult<Session> {
        let now = Utc::now();
        self.store.touch_last_login(&user.uid, now)?;
        user.last_login = Some(now);

        let row = SessionRow {
            token: Uuid::new_v4().to_string(),
            uid: user.uid.clone(),
            created_at: now,
            expires_at: now + Duration::hours(self.config.session_ttl_hours),
        };
        self.store.insert_session(&row)?;

        tracing::info!(user_id = %user.uid, role = %user.role, "Signed in");
        Ok(Session {
            token: row.token,
            user,
            expires_at: row.expires_at,
        })
    }

    /// Revoke a session. Unknown tokens are ignored.
    pub fn sign_out(&self, token: &str) -> AuthResult<()> {
        if self.store.delete_session(token)? {
            tracing::debug!("Session revoked");
        }
        Ok(())
    }

    /// Look up the session behind a bearer token
    pub fn resolve(&self, token: &str) -> AuthResult<Session> {
        let row = self
            .store
            .find_session(token)?
            .ok_or(AuthError::Unauthenticated)?;

        if row.expires_at <= Utc::now() {
            self.store.delete_session(token)?;
            return Err(AuthError::SessionExpired);
        }

        let user = self
            .store
            .find_user(&row.uid)?
            .ok_or(AuthError::UserDataMissing)?;

        Ok(Session {
            token: row.token,
            user,
            expires_at: row.expires_at,
        })
    }

    fn check_password_strength(&self, password: &str) -> AuthResult<()> {
        let min = self.config.min_password_length;
        if password.chars().count() < min {
            return Err(AuthError::WeakPassword { min });
        }
        Ok(())
    }

    /// Create an account with a password (admin action)
    pub fn create_account(&self, account: NewAccount) -> AuthResult<User> {
        validate_email(&account.email)?;
        self.check_password_strength(&account.password)?;

        let user = self.store.insert_user(
            NewUser {
                email: account.email,
                display_name: account.display_name,
                photo_url: None,
                role: account.role,
                school_id: account.school_id,
            },
            Utc::now(),
        )?;
        self.store
            .set_credential(&user.uid, &hash_password(&account.password))?;

        tracing::info!(user_id = %user.uid, role = %user.role, "Account created");
        Ok(user)
    }

    /// Change the signed-in user's password.
    ///
    /// Confirmation and strength are checked before anything is written.
    pub fn change_password(
        &self,
        uid: &str,
        current: &str,
        new_password: &str,
        confirm: &str,
    ) -> AuthResult<()> {
        if new_password != confirm {
            return Err(AuthError::PasswordMismatch);
        }
        self.check_password_strength(new_password)?;

        let credential = self
            .store
            .credential(uid)?
            .ok_or(AuthError::InvalidCredentials)?;
        if !verify_password(current, &credential) {
            return Err(AuthError::InvalidCredentials);
        }

        self.store.set_credential(uid, &hash_password(new_password))?;
        tracing::info!(user_id = %uid, "Password changed");
        Ok(())
    }

    /// Issue a reset token and hand it to the notifier.
    ///
    /// Unknown emails succeed silently.
    pub async fn request_password_reset(&self, email: &str) -> AuthResult<()> {
        validate_email(email)?;

        let Some(user) = self.store.find_user_by_email(email)? else {
            tracing::debug!(email = %email, "Password reset for unknown email ignored");
            return Ok(());
        };

        let token = Uuid::new_v4().simple().to_string();
        let expires_at = Utc::now() + Duration::minutes(self.config.reset_token_ttl_minutes);
        self.store.insert_reset_token(&token, &user.uid, expires_at)?;

        let message = ResetMessage {
            email: user.email,
            display_name: user.display_name,
            token,
            expires_at,
        };
        self.notifier.deliver(&message).await?;

        tracing::info!(user_id = %user.uid, notifier = %self.notifier.name(), "Password reset issued");
        Ok(())
    }

    /// Set a new password using a reset token. Revokes the user's sessions.
    pub fn confirm_password_reset(&self, token: &str, new_password: &str) -> AuthResult<()> {
        self.check_password_strength(new_password)?;

        let (uid, expires_at) = self
            .store
            .take_reset_token(token)?
            .ok_or(AuthError::InvalidResetToken)?;
        if expires_at <= Utc::now() {
            return Err(AuthError::InvalidResetToken);
        }

        self.store.set_credential(&uid, &hash_password(new_password))?;
        let revoked = self.store.delete_sessions_for(&uid)?;

        tracing::info!(user_id = %uid, revoked_sessions = revoked, "Password reset completed");
        Ok(())
    }

    /// Create the configured administrator unless the email is taken
    pub fn ensure_bootstrap_admin(&self, admin: &BootstrapAdmin) -> AuthResult<Option<User>> {
        if self.store.find_user_by_email(&admin.email)?.is_some() {
            return Ok(None);
        }

        let user = self.create_account(NewAccount {
            email: admin.email.clone(),
            password: admin.password.clone(),
            display_name: admin.display_name.clone(),
            role: Role::Admin,
            school_id: None,
        })?;
        tracing::info!(email = %user.email, "Bootstrap administrator created");
        Ok(Some(user))
    }

    /// Drop expired sessions and reset tokens
    pub fn purge_expired(&self) -> AuthResult<usize> {
        Ok(self.store.purge_expired_sessions(Utc::now())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CapturingNotifier {
        sent: Mutex<Vec<ResetMessage>>,
    }

    #[async_trait]
    impl ResetNotifier for CapturingNotifier {
        fn name(&self) -> &str {
            "capture"
        }

        async fn deliver(&self, message: &ResetMessage) -> AuthResult<()> {
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    fn service_with(config: AuthConfig) -> (AuthService, Arc<CapturingNotifier>) {
        let store = Arc::new(StorageEngine::open_in_memory().unwrap());
        let notifier = Arc::new(CapturingNotifier::default());
        (AuthService::new(store, config, notifier.clone()), notifier)
    }

    fn service() -> (AuthService, Arc<CapturingNotifier>) {
        service_with(AuthConfig::default())
    }

    fn account(email: &str, role: Role) -> NewAccount {
        NewAccount {
            email: email.to_string(),
            password: "secret1".to_string(),
            display_name: None,
            role,
            school_id: None,
        }
    }

    #[test]
    fn test_email_validation() {
        assert!(validate_email("gv.an@school.edu.vn").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("a@b").is_err());
        assert!(validate_email("two words@x.io").is_err());
    }

    #[test]
    fn test_sign_in_stamps_last_login() {
        let (auth, _) = service();
        let user = auth.create_account(account("t@school.edu", Role::Teacher)).unwrap();
        assert!(user.last_login.is_none());

        let session = auth.sign_in("t@school.edu", "secret1").unwrap();
        assert_eq!(session.user.uid, user.uid);
        assert!(session.user.last_login.is_some());

        let resolved = auth.resolve(&session.token).unwrap();
        assert_eq!(resolved.user.uid, user.uid);
        assert!(resolved.user.last_login.is_some());
    }

    #[test]
    fn test_wrong_password_and_unknown_email() {
        let (auth, _) = service();
        auth.create_account(account("t@school.edu", Role::Teacher)).unwrap();

        assert!(matches!(
            auth.sign_in("t@school.edu", "nope"),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.sign_in("ghost@school.edu", "secret1"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_weak_password_rejected() {
        let (auth, _) = service();
        let mut new = account("t@school.edu", Role::Teacher);
        new.password = "123".into();
        assert!(matches!(
            auth.create_account(new),
            Err(AuthError::WeakPassword { min: 6 })
        ));
    }

    #[test]
    fn test_sign_out_revokes() {
        let (auth, _) = service();
        auth.create_account(account("t@school.edu", Role::Teacher)).unwrap();
        let session = auth.sign_in("t@school.edu", "secret1").unwrap();

        auth.sign_out(&session.token).unwrap();
        assert!(matches!(
            auth.resolve(&session.token),
            Err(AuthError::Unauthenticated)
        ));
        // second sign-out is harmless
        auth.sign_out(&session.token).unwrap();
    }

    #[test]
    fn test_expired_session() {
        let mut config = AuthConfig::default();
        config.session_ttl_hours = 0;
        let (auth, _) = service_with(config);
        auth.create_account(account("t@school.edu", Role::Teacher)).unwrap();
        let session = auth.sign_in("t@school.edu", "secret1").unwrap();

        assert!(matches!(
            auth.resolve(&session.token),
            Err(AuthError::SessionExpired)
        ));
    }

    fn federated_config(secret: Option<&str>) -> AuthConfig {
        let mut config = AuthConfig::default();
        config.federated.enabled = true;
        config.federated.proxy_secret = secret.map(String::from);
        config
    }

    fn identity(email: &str) -> FederatedIdentity {
        FederatedIdentity {
            email: email.into(),
            display_name: Some("Co Lan".into()),
            photo_url: None,
        }
    }

    #[test]
    fn test_federated_creates_teacher_once() {
        let (auth, _) = service_with(federated_config(Some("proxy-key")));

        let first = auth
            .sign_in_federated(identity("new@school.edu"), Some("proxy-key"))
            .unwrap();
        assert_eq!(first.user.role, Role::Teacher);
        assert_eq!(first.user.display_name, "Co Lan");

        let second = auth
            .sign_in_federated(identity("new@school.edu"), Some("proxy-key"))
            .unwrap();
        assert_eq!(first.user.uid, second.user.uid);
    }

    #[test]
    fn test_federated_disabled() {
        let (auth, _) = service();
        assert!(matches!(
            auth.sign_in_federated(identity("new@school.edu"), Some("anything")),
            Err(AuthError::FederatedDisabled)
        ));
    }

    #[test]
    fn test_federated_requires_proxy_secret() {
        let (auth, _) = service_with(federated_config(Some("proxy-key")));
        auth.create_account(account("root@school.edu", Role::Admin)).unwrap();

        for presented in [None, Some(""), Some("proxy-kez"), Some("proxy-key-longer")] {
            assert!(matches!(
                auth.sign_in_federated(identity("root@school.edu"), presented),
                Err(AuthError::UntrustedProxy)
            ));
        }

        let session = auth
            .sign_in_federated(identity("root@school.edu"), Some("proxy-key"))
            .unwrap();
        assert_eq!(session.user.role, Role::Admin);
    }

    #[test]
    fn test_federated_without_configured_secret_refuses_everyone() {
        let (auth, _) = service_with(federated_config(None));
        auth.create_account(account("root@school.edu", Role::Admin)).unwrap();

        assert!(matches!(
            auth.sign_in_federated(identity("root@school.edu"), None),
            Err(AuthError::UntrustedProxy)
        ));
        assert!(matches!(
            auth.sign_in_federated(identity("root@school.edu"), Some("")),
            Err(AuthError::UntrustedProxy)
        ));
    }

    #[test]
    fn test_change_password_checks_confirmation_first() {
        let (auth, _) = service();
        let user = auth.create_account(account("t@school.edu", Role::Teacher)).unwrap();

        assert!(matches!(
            auth.change_password(&user.uid, "wrong", "newpass1", "newpass2"),
            Err(AuthError::PasswordMismatch)
        ));
        assert!(matches!(
            auth.change_password(&user.uid, "wrong", "newpass1", "newpass1"),
            Err(AuthError::InvalidCredentials)
        ));

        auth.change_password(&user.uid, "secret1", "newpass1", "newpass1")
            .unwrap();
        assert!(auth.sign_in("t@school.edu", "newpass1").is_ok());
    }

    #[tokio::test]
    async fn test_password_reset_flow() {
        let (auth, notifier) = service();
        auth.create_account(account("t@school.edu", Role::Teacher)).unwrap();
        let old_session = auth.sign_in("t@school.edu", "secret1").unwrap();

        auth.request_password_reset("t@school.edu").await.unwrap();
        auth.request_password_reset("ghost@school.edu").await.unwrap();

        let token = {
            let sent = notifier.sent.lock().unwrap();
            assert_eq!(sent.len(), 1);
            sent[0].token.clone()
        };

        auth.confirm_password_reset(&token, "fresh-pass").unwrap();
        assert!(auth.sign_in("t@school.edu", "fresh-pass").is_ok());
        assert!(auth.resolve(&old_session.token).is_err());

        assert!(matches!(
            auth.confirm_password_reset(&token, "another-pass"),
            Err(AuthError::InvalidResetToken)
        ));
    }

    #[test]
    fn test_bootstrap_admin_is_idempotent() {
        let (auth, _) = service();
        let admin = BootstrapAdmin {
            email: "root@school.edu".into(),
            password: "rootpass".into(),
            display_name: None,
        };
        let created = auth.ensure_bootstrap_admin(&admin).unwrap();
        assert_eq!(created.map(|u| u.role), Some(Role::Admin));
        assert!(auth.ensure_bootstrap_admin(&admin).unwrap().is_none());
    }
}
