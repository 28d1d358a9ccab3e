//! Change feed
//!
//! Every successful write publishes a `ChangeEvent` on an in-process
//! broadcast channel. Live mirrors listen here and re-run their query.

use serde::Serialize;
use tokio::sync::broadcast;

/// Stored collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Users,
    Students,
    Attendance,
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Collection::Users => write!(f, "users"),
            Collection::Students => write!(f, "students"),
            Collection::Attendance => write!(f, "attendance"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

/// A single document change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    pub collection: Collection,
    pub kind: ChangeKind,
    pub id: String,
}

/// Broadcast fan-out of change events
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish a change. Having no listeners is not an error.
    pub fn publish(&self, collection: Collection, kind: ChangeKind, id: impl Into<String>) {
        let event = ChangeEvent {
            collection,
            kind,
            id: id.into(),
        };
        tracing::trace!(collection = %event.collection, id = %event.id, "change published");
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let feed = ChangeFeed::new(8);
        let mut rx = feed.subscribe();

        feed.publish(Collection::Students, ChangeKind::Created, "s1");

        let event = rx.recv().await.unwrap();
        assert_eq!(event.collection, Collection::Students);
        assert_eq!(event.kind, ChangeKind::Created);
        assert_eq!(event.id, "s1");
    }

    #[test]
    fn test_publish_without_listeners() {
        let feed = ChangeFeed::default();
        feed.publish(Collection::Users, ChangeKind::Deleted, "u1");
        assert_eq!(feed.listener_count(), 0);
    }
}
