//! WebSocket upgrade handler for live payment status connections.
//!
//! Handles the HTTP → WebSocket upgrade and manages the connection
//! lifecycle:
//! 1. Upgrade to WebSocket
//! 2. Subscribe to the reference's room
//! 3. Forward status pushes until the room closes or the client leaves
//! 4. Clean up the subscription
//!
//! The push channel is a latency optimization: a client that misses an
//! update (disconnect, full buffer) recovers through the polling read.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};

use crate::domain::foundation::{ExternalReference, Timestamp};

use super::messages::{ClientMessage, ConnectedMessage, ServerMessage};
use super::rooms::{ClientId, NotificationHub};

/// State required for WebSocket handling.
#[derive(Clone)]
pub struct WebSocketState {
    /// Hub for reference-based routing.
    pub hub: Arc<NotificationHub>,
}

impl WebSocketState {
    /// Create a new WebSocket state.
    pub fn new(hub: Arc<NotificationHub>) -> Self {
        Self { hub }
    }
}

/// Handle WebSocket upgrade requests for a payment reference.
///
/// Route: `GET /ws/payments/:external_reference`
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(external_reference): Path<String>,
    State(state): State<WebSocketState>,
) -> Response {
    let reference = ExternalReference::from_string(external_reference);
    ws.on_upgrade(move |socket| handle_socket(socket, reference, state))
}

/// Handle an established WebSocket connection.
async fn handle_socket(socket: WebSocket, reference: ExternalReference, state: WebSocketState) {
    let (mut sender, mut receiver) = socket.split();

    let client_id = ClientId::new();
    let mut room_rx = state.hub.subscribe(&reference, client_id.clone()).await;

    let connected = ServerMessage::Connected(ConnectedMessage {
        external_reference: reference.to_string(),
        client_id: client_id.to_string(),
        timestamp: Timestamp::now().to_rfc3339(),
    });

    if send_message(&mut sender, &connected).await.is_err() {
        // Client disconnected immediately
        state.hub.unsubscribe(&client_id).await;
        return;
    }

    // Forward room broadcasts until the room closes (terminal status)
    // or the client stops listening.
    let mut send_task = {
        let client_id = client_id.clone();
        tokio::spawn(async move {
            while let Ok(update) = room_rx.recv().await {
                let message: ServerMessage = update.into();
                if let Err(e) = send_message(&mut sender, &message).await {
                    tracing::debug!(client_id = %client_id, "Send error, closing connection: {}", e);
                    break;
                }
            }
            // Room closed after a terminal status; say goodbye politely.
            let _ = sender.send(Message::Close(None)).await;
        })
    };

    // Drain client messages; only pings and closes are expected.
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            match message {
                Message::Text(text) => {
                    if !matches!(
                        serde_json::from_str::<ClientMessage>(&text),
                        Ok(ClientMessage::Ping)
                    ) {
                        tracing::debug!("Ignoring unexpected client message");
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Whichever side finishes first tears the other down.
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.hub.unsubscribe(&client_id).await;
}

async fn send_message(
    sender: &mut SplitSink<WebSocket, Message>,
    message: &ServerMessage,
) -> Result<(), axum::Error> {
    let text = serde_json::to_string(message)
        .map_err(|e| axum::Error::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
    sender.send(Message::Text(text)).await
}
