//! Password reset delivery
//!
//! The auth service hands issued reset tokens to a `ResetNotifier`.
//! `LogNotifier` only logs; `WebhookNotifier` posts JSON to a mailer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;

use super::error::{AuthError, AuthResult};

/// A reset token ready for delivery
#[derive(Debug, Clone, Serialize)]
pub struct ResetMessage {
    pub email: String,
    pub display_name: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Delivers password reset tokens to users
#[async_trait]
pub trait ResetNotifier: Send + Sync {
    fn name(&self) -> &str;

    async fn deliver(&self, message: &ResetMessage) -> AuthResult<()>;
}

/// Writes the reset token to the log. Development default.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl ResetNotifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn deliver(&self, message: &ResetMessage) -> AuthResult<()> {
        tracing::info!(
            email = %message.email,
            token = %message.token,
            expires_at = %message.expires_at,
            "Password reset requested"
        );
        Ok(())
    }
}

/// Posts the reset message to an HTTP endpoint
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> AuthResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AuthError::Notify(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ResetNotifier for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn deliver(&self, message: &ResetMessage) -> AuthResult<()> {
        let response = self
            .client
            .post(&self.url)
            .json(message)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AuthError::Notify("reset webhook timed out".to_string())
                } else {
                    AuthError::Notify(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(AuthError::Notify(format!(
                "reset webhook returned {}",
                response.status()
            )));
        }

        tracing::debug!(email = %message.email, "Password reset delivered via webhook");
        Ok(())
    }
}
