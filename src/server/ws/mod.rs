//! WebSocket endpoint
//!
//! One task reads frames and drives the coordinator; a writer task drains
//! the connection's bounded event queue onto the socket.

pub mod dispatch;
pub mod protocol;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::AppState;
use crate::broadcast::ServerEvent;

/// `GET /ws`
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn = Uuid::new_v4();
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ServerEvent>(state.queue_size);
    state.coordinator.connect(conn, tx);

    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match event.to_json() {
                Ok(text) => text,
                Err(e) => {
                    warn!(participant = %conn, error = %e, "failed to encode event");
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                dispatch::handle_frame(&state.coordinator, conn, text.as_str());
            }
            Ok(Message::Binary(_)) => {
                state.coordinator.reject(
                    conn,
                    protocol::MalformedCommand::KIND,
                    "Binary frames are not supported",
                );
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(participant = %conn, error = %e, "websocket read error");
                break;
            }
        }
    }

    // Detaching drops the queue sender, so the writer drains and exits.
    state.coordinator.disconnect(conn);
    let _ = writer.await;
}
