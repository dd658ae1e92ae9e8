//! WebSocket Pipeline Events
//!
//! Pushes application and funding events to portal clients.
//!
//! ## Architecture
//!
//! - **ConnectionHub**: Connections, subscriptions and fan-out
//! - **Handler**: Authenticated upgrade and per-connection loop
//! - **Messages**: Client and server message formats
//!
//! ## Topics
//!
//! - `applications` / `applications.*` - Every application event (admins)
//! - `applications.{id}` - One application (its borrower, admins)
//! - `marketplace` / `marketplace.{id}` - Listings and funding progress (investors)
//!
//! ## Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:8090/ws?token=' + token);
//! ws.onopen = () => ws.send(JSON.stringify({type: 'subscribe', topics: ['marketplace']}));
//! ws.onmessage = (event) => console.log(JSON.parse(event.data));
//! ```

mod handler;
mod hub;
mod messages;

pub use handler::{topic_allowed, websocket_handler};
pub use hub::{is_valid_topic, ConnectionHub, HubConfig, HubError};
pub use messages::{
    topic_for, ClientMessage, ServerMessage, WsEvent, APPLICATIONS_TOPIC, MARKETPLACE_TOPIC,
};
