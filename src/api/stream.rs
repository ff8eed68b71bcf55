//! WebSocket push stream: one snapshot per tick plus alert events, so the
//! dashboard re-renders live without polling.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::api::routes::ApiState;
use crate::state::PushEvent;

pub async fn stream_handler(ws: WebSocketUpgrade, State(state): State<ApiState>) -> Response {
    ws.on_upgrade(move |socket| stream_events(socket, state))
}

async fn stream_events(mut socket: WebSocket, state: ApiState) {
    let mut rx = state.store.subscribe();

    // initial snapshot so a fresh client renders immediately
    let snapshot = PushEvent::Tick(state.store.snapshot().await);
    if send_event(&mut socket, &snapshot).await.is_err() {
        return;
    }
    debug!("stream subscriber connected");

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(event) => {
                    if send_event(&mut socket, &event).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    // slow consumer — the next snapshot catches it up
                    warn!("stream subscriber lagged, skipped {skipped} events");
                }
                Err(RecvError::Closed) => break,
            },
            msg = socket.recv() => match msg {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {} // inbound messages are ignored
            },
        }
    }
    debug!("stream subscriber disconnected");
}

async fn send_event(socket: &mut WebSocket, event: &PushEvent) -> Result<(), axum::Error> {
    let payload = match serde_json::to_string(event) {
        Ok(p) => p,
        Err(e) => {
            warn!("failed to serialize push event: {e}");
            return Ok(());
        }
    };
    socket.send(Message::Text(payload)).await
}
