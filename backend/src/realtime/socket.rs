//! WebSocket endpoint for the real-time channel
//!
//! A socket must send `join_room` before it receives anything from a room.
//! Once joined it gets every event published to `user_{id}` and a `pong` for
//! each `ping`. Lagging sockets skip the events they missed.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{Sink, SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;

use shared::{ClientEvent, ServerEvent, UserId};

use super::RoomHub;
use crate::AppState;

/// Upgrade handler for `/api/v1/realtime`
pub async fn realtime_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state.hub))
}

/// Decode a text frame from a client
pub fn decode_client_frame(text: &str) -> Option<ClientEvent> {
    match serde_json::from_str(text) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring malformed client frame");
            None
        }
    }
}

async fn send_event<S>(sink: &mut S, event: &ServerEvent) -> bool
where
    S: Sink<Message> + Unpin,
{
    let text = match serde_json::to_string(event) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(event = event.name(), error = %e, "Failed to encode event");
            return true;
        }
    };
    sink.send(Message::Text(text)).await.is_ok()
}

async fn handle_socket(socket: WebSocket, hub: RoomHub) {
    let (mut sink, mut stream) = socket.split();

    // Wait for the join request
    let mut user_id: UserId = loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => match decode_client_frame(&text) {
                Some(ClientEvent::JoinRoom { user_id }) => break user_id,
                Some(ClientEvent::Ping) => {
                    if !send_event(&mut sink, &ServerEvent::Pong).await {
                        return;
                    }
                }
                None => {}
            },
            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
            Some(Ok(_)) => {}
        }
    };

    let mut room = hub.join(user_id);
    tracing::info!(user_id = %user_id, "Socket joined room");
    let mut open = send_event(&mut sink, &ServerEvent::Joined { room: user_id.room() }).await;

    while open {
        tokio::select! {
            event = room.recv() => match event {
                Ok(event) => open = send_event(&mut sink, &event).await,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(user_id = %user_id, skipped, "Socket lagging behind room");
                }
                Err(RecvError::Closed) => open = false,
            },
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => match decode_client_frame(&text) {
                    Some(ClientEvent::Ping) => {
                        open = send_event(&mut sink, &ServerEvent::Pong).await;
                    }
                    Some(ClientEvent::JoinRoom { user_id: next }) if next != user_id => {
                        drop(std::mem::replace(&mut room, hub.join(next)));
                        hub.prune(user_id);
                        user_id = next;
                        open = send_event(&mut sink, &ServerEvent::Joined { room: user_id.room() }).await;
                    }
                    Some(ClientEvent::JoinRoom { .. }) => {
                        open = send_event(&mut sink, &ServerEvent::Joined { room: user_id.room() }).await;
                    }
                    None => {}
                },
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => open = false,
                Some(Ok(_)) => {}
            },
        }
    }

    drop(room);
    hub.prune(user_id);
    tracing::info!(user_id = %user_id, "Socket left room");
}
