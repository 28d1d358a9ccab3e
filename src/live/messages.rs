//! WebSocket Message Types
//!
//! Defines all message types for WebSocket communication between
//! dashboard clients and the attendance server.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::mirror::{MirrorQuery, MirrorSnapshot};

/// Messages sent from client to server
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Start mirroring a topic
    Subscribe(TopicRequest),
    /// Stop mirroring a topic
    Unsubscribe(TopicRequest),
    /// Ping for keepalive
    Ping,
}

/// A topic plus its parameters
///
/// Topics: `attendance.recent`, `attendance.today`, `students`, and
/// `attendance.class` which needs `class` and `date`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TopicRequest {
    pub topic: String,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

impl TopicRequest {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            class: None,
            date: None,
        }
    }

    /// Resolve into a mirror query
    pub fn to_query(&self) -> Result<MirrorQuery, String> {
        match self.topic.as_str() {
            "attendance.recent" => Ok(MirrorQuery::RecentAttendance),
            "attendance.today" => Ok(MirrorQuery::TodayAttendance),
            "students" => Ok(MirrorQuery::Students),
            "attendance.class" => match (&self.class, self.date) {
                (Some(class), Some(date)) if !class.trim().is_empty() => {
                    Ok(MirrorQuery::ClassAttendance {
                        class: class.trim().to_string(),
                        date,
                    })
                }
                _ => Err("attendance.class needs class and date".to_string()),
            },
            other => Err(format!("unknown topic: {}", other)),
        }
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full current record set of a subscribed topic
    Snapshot {
        topic: String,
        snapshot: MirrorSnapshot,
    },
    /// Subscription confirmed
    Subscribed { topic: String },
    /// Unsubscription confirmed
    Unsubscribed { topic: String },
    /// Pong response to ping
    Pong,
    /// Error message
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        topic: Option<String>,
        message: String,
    },
    /// Connection established
    Connected { connection_id: String },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            topic: None,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_deserialize_subscribe() {
        let json = r#"{"type": "subscribe", "topic": "attendance.class", "class": "12A1", "date": "2024-03-01"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::Subscribe(request) => {
                let query = request.to_query().unwrap();
                assert_eq!(query.key(), "attendance.class:12A1:2024-03-01");
            }
            _ => panic!("Expected Subscribe"),
        }
    }

    #[test]
    fn test_client_message_deserialize_ping() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type": "ping"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Ping));
    }

    #[test]
    fn test_topic_validation() {
        assert!(TopicRequest::new("students").to_query().is_ok());
        assert!(TopicRequest::new("attendance.class").to_query().is_err());
        assert!(TopicRequest::new("metrics.mood").to_query().is_err());
    }

    #[test]
    fn test_server_message_serialize_snapshot() {
        let msg = ServerMessage::Snapshot {
            topic: "students".to_string(),
            snapshot: MirrorSnapshot::Students(Vec::new()),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"snapshot\""));
        assert!(json.contains("\"collection\":\"students\""));
        assert!(json.contains("\"records\":[]"));
    }

    #[test]
    fn test_server_message_serialize_connected() {
        let msg = ServerMessage::Connected {
            connection_id: "abc-123".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"connected\""));
        assert!(json.contains("\"connection_id\":\"abc-123\""));
    }
}
