//! Live reload: client registry, wire protocol and WebSocket endpoint.

mod hub;
mod protocol;
mod websocket;

pub use hub::{ClientEvent, ClientId, HubStatus, NotificationHub, StatusCallback};
pub use protocol::{ClientMessage, PROTOCOL_V7, ServerMessage};
pub(crate) use websocket::ws_handler;
