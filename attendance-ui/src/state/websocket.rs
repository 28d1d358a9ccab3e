//! WebSocket Client
//!
//! Live mirrors of today's and the latest attendance records. Each
//! snapshot replaces the whole mirrored set.

use leptos::*;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CloseEvent, MessageEvent, WebSocket};

use super::global::GlobalState;
use crate::api::types::{AttendanceRecord, Student};

pub const TOPIC_TODAY: &str = "attendance.today";
pub const TOPIC_RECENT: &str = "attendance.recent";

/// Wait before the single reconnect after a dropped connection
const RECONNECT_DELAY_MS: u32 = 2000;

/// Record set carried by a snapshot
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(tag = "collection", content = "records", rename_all = "lowercase")]
pub enum Snapshot {
    Attendance(Vec<AttendanceRecord>),
    Students(Vec<Student>),
}

/// WebSocket message types from server
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    Connected {
        connection_id: String,
    },
    Snapshot {
        topic: String,
        snapshot: Snapshot,
    },
    Subscribed {
        topic: String,
    },
    Unsubscribed {
        topic: String,
    },
    Pong,
    Error {
        #[serde(default)]
        topic: Option<String>,
        message: String,
    },
}

/// WebSocket client message types
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Subscribe { topic: String },
    Unsubscribe { topic: String },
    Ping,
}

/// WebSocket client for live mirrors
#[derive(Clone)]
pub struct WebSocketClient {
    ws: Rc<RefCell<Option<WebSocket>>>,
    url: String,
    /// A reconnect already ran since the last successful open
    retried: Rc<Cell<bool>>,
    /// Set by `close`, stops reconnects
    closed: Rc<Cell<bool>>,
}

impl WebSocketClient {
    pub fn new(url: &str) -> Self {
        Self {
            ws: Rc::new(RefCell::new(None)),
            url: url.to_string(),
            retried: Rc::new(Cell::new(false)),
            closed: Rc::new(Cell::new(false)),
        }
    }

    /// Connect and subscribe to the live topics once open
    pub fn connect(&self, state: GlobalState) {
        if self.closed.get() {
            return;
        }
        match WebSocket::new(&self.url) {
            Ok(ws) => {
                self.setup_handlers(&ws, state);
                *self.ws.borrow_mut() = Some(ws);
            }
            Err(e) => {
                web_sys::console::error_1(&format!("WebSocket connection failed: {:?}", e).into());
                self.schedule_reconnect(state);
            }
        }
    }

    fn setup_handlers(&self, ws: &WebSocket, state: GlobalState) {
        // On open
        let state_clone = state.clone();
        let client = self.clone();
        let on_open = Closure::wrap(Box::new(move |_: JsValue| {
            web_sys::console::log_1(&"WebSocket connected".into());
            state_clone.ws_connected.set(true);
            client.retried.set(false);

            for topic in [TOPIC_TODAY, TOPIC_RECENT] {
                if let Err(e) = client.send(&ClientMessage::Subscribe {
                    topic: topic.to_string(),
                }) {
                    web_sys::console::error_1(&format!("Subscribe failed: {}", e).into());
                }
            }
        }) as Box<dyn FnMut(JsValue)>);
        ws.set_onopen(Some(on_open.as_ref().unchecked_ref()));
        on_open.forget();

        // On message
        let state_clone = state.clone();
        let on_message = Closure::wrap(Box::new(move |event: MessageEvent| {
            if let Ok(text) = event.data().dyn_into::<js_sys::JsString>() {
                let text: String = text.into();
                handle_message(&text, &state_clone);
            }
        }) as Box<dyn FnMut(MessageEvent)>);
        ws.set_onmessage(Some(on_message.as_ref().unchecked_ref()));
        on_message.forget();

        // On close
        let state_clone = state;
        let client = self.clone();
        let on_close = Closure::wrap(Box::new(move |event: CloseEvent| {
            web_sys::console::log_1(
                &format!("WebSocket closed: code={}, reason={}", event.code(), event.reason()).into(),
            );
            state_clone.ws_connected.set(false);
            *client.ws.borrow_mut() = None;

            if !client.closed.get() && state_clone.token().is_some() {
                client.schedule_reconnect(state_clone.clone());
            }
        }) as Box<dyn FnMut(CloseEvent)>);
        ws.set_onclose(Some(on_close.as_ref().unchecked_ref()));
        on_close.forget();

        // On error
        let on_error = Closure::wrap(Box::new(move |e: JsValue| {
            web_sys::console::error_1(&format!("WebSocket error: {:?}", e).into());
        }) as Box<dyn FnMut(JsValue)>);
        ws.set_onerror(Some(on_error.as_ref().unchecked_ref()));
        on_error.forget();
    }

    /// One plain retry per dropped connection. If it fails too, the mirror
    /// stays offline until the next sign-in or page load.
    fn schedule_reconnect(&self, state: GlobalState) {
        let Some(delay) = reconnect_delay(self.retried.get()) else {
            web_sys::console::error_1(&"WebSocket reconnect failed, live updates paused".into());
            return;
        };
        self.retried.set(true);

        let client = self.clone();
        gloo_timers::callback::Timeout::new(delay, move || {
            web_sys::console::log_1(&"Attempting WebSocket reconnect".into());
            client.connect(state);
        })
        .forget();
    }

    pub fn send(&self, message: &ClientMessage) -> Result<(), String> {
        let ws_guard = self.ws.borrow();
        let ws = ws_guard.as_ref().ok_or("WebSocket not connected")?;

        let json = serde_json::to_string(message).map_err(|e| e.to_string())?;
        ws.send_with_str(&json).map_err(|e| format!("{:?}", e))
    }

    pub fn close(&self) {
        self.closed.set(true);
        if let Some(ws) = self.ws.borrow_mut().take() {
            let _ = ws.close();
        }
    }
}

fn reconnect_delay(retried: bool) -> Option<u32> {
    (!retried).then_some(RECONNECT_DELAY_MS)
}

/// Apply one server message to the state
fn handle_message(text: &str, state: &GlobalState) {
    let msg = match serde_json::from_str::<WsMessage>(text) {
        Ok(msg) => msg,
        Err(e) => {
            web_sys::console::error_1(&format!("Failed to parse WebSocket message: {}", e).into());
            return;
        }
    };

    match msg {
        WsMessage::Connected { connection_id } => {
            web_sys::console::log_1(&format!("Connected with ID: {}", connection_id).into());
        }
        WsMessage::Snapshot { topic, snapshot } => {
            if let Snapshot::Attendance(records) = snapshot {
                match topic.as_str() {
                    TOPIC_TODAY => state.today_records.set(records),
                    TOPIC_RECENT => state.recent_records.set(records),
                    _ => {}
                }
                state.last_sync.set(Some(chrono::Utc::now().timestamp_millis()));
            }
        }
        WsMessage::Subscribed { topic } => {
            web_sys::console::log_1(&format!("Subscribed to: {}", topic).into());
        }
        WsMessage::Unsubscribed { topic } => {
            web_sys::console::log_1(&format!("Unsubscribed from: {}", topic).into());
        }
        WsMessage::Pong => {}
        WsMessage::Error { topic, message } => {
            web_sys::console::error_1(
                &format!("Server error ({}): {}", topic.unwrap_or_default(), message).into(),
            );
        }
    }
}

/// WebSocket URL for a bearer token
pub fn ws_url(api_base: &str, token: &str) -> String {
    let base = api_base
        .replace("http://", "ws://")
        .replace("https://", "wss://");
    format!("{}/ws?token={}", base, js_sys::encode_uri_component(token))
}

/// Keep a live connection while signed in (call from app root)
pub fn init_websocket(state: GlobalState, api_base: String) {
    let current: Rc<RefCell<Option<WebSocketClient>>> = Rc::new(RefCell::new(None));

    create_effect(move |_| {
        let token = match state.session.get() {
            super::SessionState::SignedIn(session) => Some(session.token),
            _ => None,
        };

        if let Some(old) = current.borrow_mut().take() {
            old.close();
        }

        if let Some(token) = token {
            let client = WebSocketClient::new(&ws_url(&api_base, &token));
            client.connect(state.clone());
            *current.borrow_mut() = Some(client);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_snapshot() {
        let json = r#"{"type":"snapshot","topic":"attendance.today",
            "snapshot":{"collection":"attendance","records":[]}}"#;
        match serde_json::from_str::<WsMessage>(json).unwrap() {
            WsMessage::Snapshot { topic, snapshot } => {
                assert_eq!(topic, TOPIC_TODAY);
                assert!(matches!(snapshot, Snapshot::Attendance(r) if r.is_empty()));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_single_reconnect() {
        assert_eq!(reconnect_delay(false), Some(RECONNECT_DELAY_MS));
        assert_eq!(reconnect_delay(true), None);
    }

    #[test]
    fn test_subscribe_message_shape() {
        let json = serde_json::to_string(&ClientMessage::Subscribe {
            topic: TOPIC_RECENT.to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"subscribe","topic":"attendance.recent"}"#);
    }
}
