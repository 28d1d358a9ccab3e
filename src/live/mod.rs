//! Live Updates
//!
//! Keeps dashboard state in sync with the stored collections.
//!
//! ## Architecture
//!
//! - **LiveMirror**: re-runs a query on every change to its collection and
//!   hands the full result set to a callback
//! - **ConnectionHub**: tracks WebSocket connections and their mirrors
//! - **Handler**: WebSocket upgrade and message processing
//! - **Messages**: client and server message formats
//!
//! ## Usage
//!
//! Clients connect to `/api/v1/ws?token=...` and subscribe to topics:
//! - `attendance.recent` - latest 100 records
//! - `attendance.today` - records dated today
//! - `attendance.class` - one class on one day (`class`, `date`)
//! - `students` - every student (admin, teacher)
//!
//! ## Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:8090/api/v1/ws?token=' + token);
//!
//! ws.onopen = () => {
//!   ws.send(JSON.stringify({type: 'subscribe', topic: 'attendance.today'}));
//! };
//!
//! ws.onmessage = (event) => {
//!   const msg = JSON.parse(event.data);
//!   if (msg.type === 'snapshot') render(msg.snapshot.records);
//! };
//! ```

mod handler;
mod hub;
mod messages;
mod mirror;

pub use handler::websocket_handler;
pub use hub::{ConnectionHub, HubConfig, HubError};
pub use messages::{ClientMessage, ServerMessage, TopicRequest};
pub use mirror::{LiveMirror, MirrorQuery, MirrorSnapshot, Subscription, RECENT_ATTENDANCE_LIMIT};
