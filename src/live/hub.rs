//! WebSocket Connection Hub
//!
//! Manages WebSocket connections and the mirror subscriptions each one holds.
//! A mirror pushes `Snapshot` messages into the connection's channel;
//! unsubscribing or disconnecting cancels it.

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use super::messages::{ServerMessage, TopicRequest};
use super::mirror::{LiveMirror, Subscription};
use crate::guard::role_allowed;
use crate::storage::Role;

/// Unique identifier for a WebSocket connection
pub type ConnectionId = String;

/// Manages all WebSocket connections and subscriptions
pub struct ConnectionHub {
    /// Active connections: ConnectionId → ConnectionHandle
    connections: Arc<RwLock<HashMap<ConnectionId, ConnectionHandle>>>,
    mirror: LiveMirror,
    config: HubConfig,
}

/// Configuration for the connection hub
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Maximum number of concurrent connections
    pub max_connections: usize,
    /// Maximum mirrors per connection
    pub max_topics_per_connection: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_connections: 500,
            max_topics_per_connection: 16,
        }
    }
}

/// Handle for sending messages to a specific connection
pub struct ConnectionHandle {
    pub sender: mpsc::UnboundedSender<ServerMessage>,
    /// Role of the signed-in user behind the connection
    pub role: Role,
    /// Topic key → mirror registration
    pub subscriptions: HashMap<String, Subscription>,
}

impl ConnectionHub {
    pub fn new(mirror: LiveMirror, config: HubConfig) -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
            mirror,
            config,
        }
    }

    /// Register a new WebSocket connection
    ///
    /// Returns the connection ID on success, or an error if the connection
    /// limit has been reached.
    pub async fn register(
        &self,
        sender: mpsc::UnboundedSender<ServerMessage>,
        role: Role,
    ) -> Result<ConnectionId, HubError> {
        let mut connections = self.connections.write().await;
        if connections.len() >= self.config.max_connections {
            return Err(HubError::TooManyConnections(self.config.max_connections));
        }

        let id = Uuid::new_v4().to_string();
        connections.insert(
            id.clone(),
            ConnectionHandle {
                sender,
                role,
                subscriptions: HashMap::new(),
            },
        );

        tracing::info!(connection_id = %id, role = %role, "WebSocket connected");
        Ok(id)
    }

    /// Unregister a connection and cancel its mirrors
    pub async fn unregister(&self, id: &str) {
        let handle = self.connections.write().await.remove(id);

        if let Some(handle) = handle {
            let topics = handle.subscriptions.len();
            for subscription in handle.subscriptions.values() {
                subscription.cancel();
            }
            tracing::info!(connection_id = %id, topics, "WebSocket disconnected");
        }
    }

    /// Start a mirror for `request` on connection `id`. Returns the topic key.
    pub async fn subscribe(&self, id: &str, request: &TopicRequest) -> Result<String, HubError> {
        let query = request.to_query().map_err(HubError::InvalidTopic)?;
        let key = query.key();

        let mut connections = self.connections.write().await;
        let handle = connections
            .get_mut(id)
            .ok_or(HubError::ConnectionNotFound)?;

        if !role_allowed(handle.role, query.allowed_roles()) {
            return Err(HubError::Forbidden(key));
        }
        if handle.subscriptions.contains_key(&key) {
            return Ok(key);
        }
        if handle.subscriptions.len() >= self.config.max_topics_per_connection {
            return Err(HubError::TooManyTopics(self.config.max_topics_per_connection));
        }

        let update_tx = handle.sender.clone();
        let error_tx = handle.sender.clone();
        let update_topic = key.clone();
        let error_topic = key.clone();

        let subscription = self.mirror.subscribe(
            query,
            move |snapshot| {
                let _ = update_tx.send(ServerMessage::Snapshot {
                    topic: update_topic.clone(),
                    snapshot,
                });
            },
            move |error| {
                let _ = error_tx.send(ServerMessage::Error {
                    topic: Some(error_topic.clone()),
                    message: error.to_string(),
                });
            },
        );
        handle.subscriptions.insert(key.clone(), subscription);

        tracing::debug!(connection_id = %id, topic = %key, "Subscribed to topic");
        Ok(key)
    }

    /// Cancel the mirror for `request`. Returns the key if one was active.
    pub async fn unsubscribe(
        &self,
        id: &str,
        request: &TopicRequest,
    ) -> Result<Option<String>, HubError> {
        let key = request.to_query().map_err(HubError::InvalidTopic)?.key();

        let mut connections = self.connections.write().await;
        let handle = connections
            .get_mut(id)
            .ok_or(HubError::ConnectionNotFound)?;

        let removed = handle.subscriptions.remove(&key);
        Ok(removed.map(|subscription| {
            subscription.cancel();
            tracing::debug!(connection_id = %id, topic = %key, "Unsubscribed from topic");
            key
        }))
    }

    /// Send a message directly to a specific connection
    pub async fn send_to(&self, id: &str, message: ServerMessage) -> Result<(), HubError> {
        let connections = self.connections.read().await;
        let handle = connections.get(id).ok_or(HubError::ConnectionNotFound)?;

        handle
            .sender
            .send(message)
            .map_err(|_| HubError::SendFailed)
    }

    /// Get the current connection count
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Number of connections mirroring a topic key
    pub async fn subscription_count(&self, topic: &str) -> usize {
        self.connections
            .read()
            .await
            .values()
            .filter(|handle| handle.subscriptions.contains_key(topic))
            .count()
    }
}

/// Errors that can occur in the connection hub
#[derive(Debug, Error)]
pub enum HubError {
    #[error("Too many connections (limit: {0})")]
    TooManyConnections(usize),

    #[error("Too many topics on one connection (limit: {0})")]
    TooManyTopics(usize),

    #[error("Invalid topic: {0}")]
    InvalidTopic(String),

    #[error("Topic not available for this role: {0}")]
    Forbidden(String),

    #[error("Connection not found")]
    ConnectionNotFound,

    #[error("Failed to send message")]
    SendFailed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::mirror::MirrorSnapshot;
    use crate::storage::{NewStudent, StorageEngine};
    use chrono::Utc;
    use std::time::Duration;
    use tokio::time::timeout;

    fn hub_with(config: HubConfig) -> (Arc<StorageEngine>, ConnectionHub) {
        let store = Arc::new(StorageEngine::open_in_memory().unwrap());
        let hub = ConnectionHub::new(LiveMirror::new(Arc::clone(&store)), config);
        (store, hub)
    }

    async fn next_snapshot(rx: &mut mpsc::UnboundedReceiver<ServerMessage>) -> MirrorSnapshot {
        loop {
            let msg = timeout(Duration::from_secs(2), rx.recv())
                .await
                .expect("message in time")
                .expect("channel open");
            if let ServerMessage::Snapshot { snapshot, .. } = msg {
                return snapshot;
            }
        }
    }

    #[tokio::test]
    async fn test_register_unregister() {
        let (_store, hub) = hub_with(HubConfig::default());
        let (tx, _rx) = mpsc::unbounded_channel();

        let id = hub.register(tx, Role::Teacher).await.unwrap();
        assert!(!id.is_empty());
        assert_eq!(hub.connection_count().await, 1);

        hub.unregister(&id).await;
        assert_eq!(hub.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_connection_limit() {
        let (_store, hub) = hub_with(HubConfig {
            max_connections: 2,
            ..Default::default()
        });

        let (tx1, _) = mpsc::unbounded_channel();
        let (tx2, _) = mpsc::unbounded_channel();
        let (tx3, _) = mpsc::unbounded_channel();

        hub.register(tx1, Role::Admin).await.unwrap();
        hub.register(tx2, Role::Admin).await.unwrap();
        let result = hub.register(tx3, Role::Admin).await;

        assert!(matches!(result, Err(HubError::TooManyConnections(2))));
    }

    #[tokio::test]
    async fn test_subscribe_pushes_snapshots() {
        let (store, hub) = hub_with(HubConfig::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = hub.register(tx, Role::Teacher).await.unwrap();

        let key = hub
            .subscribe(&id, &TopicRequest::new("students"))
            .await
            .unwrap();
        assert_eq!(key, "students");
        assert_eq!(hub.subscription_count("students").await, 1);
        assert!(next_snapshot(&mut rx).await.is_empty());

        store
            .insert_student(NewStudent::new("SV001", "An", "12A1"), Utc::now())
            .unwrap();
        assert_eq!(next_snapshot(&mut rx).await.len(), 1);

        let removed = hub
            .unsubscribe(&id, &TopicRequest::new("students"))
            .await
            .unwrap();
        assert_eq!(removed.as_deref(), Some("students"));
        assert_eq!(hub.subscription_count("students").await, 0);

        hub.unregister(&id).await;
    }

    #[tokio::test]
    async fn test_parent_cannot_mirror_students() {
        let (_store, hub) = hub_with(HubConfig::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = hub.register(tx, Role::Parent).await.unwrap();

        let result = hub.subscribe(&id, &TopicRequest::new("students")).await;
        assert!(matches!(result, Err(HubError::Forbidden(_))));

        let today = hub
            .subscribe(&id, &TopicRequest::new("attendance.today"))
            .await;
        assert!(today.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_topic() {
        let (_store, hub) = hub_with(HubConfig::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = hub.register(tx, Role::Admin).await.unwrap();

        let result = hub.subscribe(&id, &TopicRequest::new("metrics.*")).await;
        assert!(matches!(result, Err(HubError::InvalidTopic(_))));
    }
}
