//! WebSocket handler for real-time updates

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use serde::Serialize;

use crate::AppState;

/// Greeting sent as soon as the socket opens
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WsHello {
    Connected,
}

/// Handle a WebSocket connection
pub async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    let hello = serde_json::to_string(&WsHello::Connected).unwrap();
    if sender.send(Message::Text(hello)).await.is_err() {
        return;
    }

    // Forward every coordinator event to the client as JSON
    let mut event_rx = state.coordinator.subscribe();
    let send_task = tokio::spawn(async move {
        loop {
            match event_rx.recv().await {
                Ok(event) => {
                    let json = serde_json::to_string(&event).unwrap();
                    if sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {
                    // Skip missed messages
                    continue;
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                    break;
                }
            }
        }
    });

    // The socket is a one-way event feed; drain the client side until close
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Close(_)) => break,
            Err(_) => break,
            _ => {}
        }
    }

    send_task.abort();
}
