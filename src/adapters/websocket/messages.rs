//! WebSocket message types for live payment status updates.
//!
//! Defines the protocol between server and connected clients:
//! - Server → Client: connection ack, status updates, pings
//! - Client → Server: pings

use serde::{Deserialize, Serialize};

use crate::ports::StatusUpdate;

// ============================================
// Server → Client Messages
// ============================================

/// All message types that can be sent from server to client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection established and subscribed to a reference.
    Connected(ConnectedMessage),

    /// Payment status changed.
    #[serde(rename = "payment.status")]
    StatusChanged(StatusChangedMessage),

    /// Heartbeat response.
    Pong(PongMessage),
}

/// Sent when a client successfully subscribes to a reference.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedMessage {
    pub external_reference: String,
    pub client_id: String,
    pub timestamp: String,
}

/// Payment status push, mirroring the polling read's view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangedMessage {
    pub external_reference: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_detail: Option<String>,
    pub timestamp: String,
}

/// Heartbeat response.
#[derive(Debug, Clone, Serialize)]
pub struct PongMessage {
    pub timestamp: String,
}

impl From<StatusUpdate> for ServerMessage {
    fn from(update: StatusUpdate) -> Self {
        ServerMessage::StatusChanged(StatusChangedMessage {
            external_reference: update.external_reference.to_string(),
            status: update.status.as_str().to_string(),
            status_detail: update.status_detail,
            timestamp: update.timestamp.to_rfc3339(),
        })
    }
}

// ============================================
// Client → Server Messages
// ============================================

/// All message types that can be received from a client.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Heartbeat request.
    Ping,
}
