//! WebSocket push adapters - the NotificationHub and its wire protocol.

mod handler;
mod messages;
mod rooms;

pub use handler::{ws_handler, WebSocketState};
pub use messages::{ClientMessage, ConnectedMessage, PongMessage, ServerMessage, StatusChangedMessage};
pub use rooms::{ClientId, NotificationHub};
