//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use std::sync::Arc;
use std::time::Instant;

use crate::auth::{AuthService, LogNotifier, ResetNotifier, WebhookNotifier};
use crate::config::Config;
use crate::files::FileStore;
use crate::live::{ConnectionHub, HubConfig, LiveMirror};
use crate::services::{StudentService, UserService};
use crate::storage::{StorageConfig, StorageEngine, StorageResult};

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Document store
    pub store: Arc<StorageEngine>,
    /// Sign-in, sessions and password flows
    pub auth: Arc<AuthService>,
    pub students: Arc<StudentService>,
    pub users: Arc<UserService>,
    /// Uploaded photos
    pub files: FileStore,
    /// WebSocket connection hub for live mirrors
    pub ws_hub: Arc<ConnectionHub>,
    pub config: Arc<Config>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    /// Wire services over an open store
    pub fn new(store: Arc<StorageEngine>, config: Config, notifier: Arc<dyn ResetNotifier>) -> Self {
        let files = FileStore::new(
            config.files.resolve_dir(&config.store.data_dir),
            config.files.public_base_url.clone(),
        );
        let auth = Arc::new(AuthService::new(
            Arc::clone(&store),
            config.auth.clone(),
            notifier,
        ));
        let students = Arc::new(StudentService::new(Arc::clone(&store), files.clone()));
        let users = Arc::new(UserService::new(Arc::clone(&store), Arc::clone(&auth)));
        let ws_hub = Arc::new(ConnectionHub::new(
            LiveMirror::new(Arc::clone(&store)),
            HubConfig {
                max_connections: config.api.max_ws_connections,
                ..Default::default()
            },
        ));

        Self {
            store,
            auth,
            students,
            users,
            files,
            ws_hub,
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Open the store named by `config` and pick the reset notifier
    pub fn open(config: Config) -> StorageResult<Self> {
        let mut storage_config = StorageConfig::new(&config.store.data_dir);
        storage_config.feed_capacity = config.store.feed_capacity;
        let store = Arc::new(StorageEngine::open(&storage_config)?);

        Ok(Self::new(store, config.clone(), reset_notifier(&config)))
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Get WebSocket connection count
    pub async fn ws_connection_count(&self) -> usize {
        self.ws_hub.connection_count().await
    }
}

/// Webhook delivery when configured, log-only otherwise
fn reset_notifier(config: &Config) -> Arc<dyn ResetNotifier> {
    let Some(url) = &config.auth.reset_webhook_url else {
        return Arc::new(LogNotifier);
    };

    match WebhookNotifier::new(url.clone(), config.api.request_timeout_secs) {
        Ok(notifier) => Arc::new(notifier),
        Err(e) => {
            tracing::warn!(error = %e, "Reset webhook unavailable, logging reset tokens instead");
            Arc::new(LogNotifier)
        }
    }
}
