//! Live connection task.
//!
//! Each connection owns two halves: a writer task draining the bounded
//! outbound queue registered with the hub, and the read loop below. When
//! either side ends the connection leaves the hub, which drops the queue's
//! last sender and lets the writer finish.

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use super::messages::ClientFrame;
use crate::app_state::AppState;
use crate::domain::{ServerEvent, UserId};

/// Serves one authenticated live connection until it closes.
pub async fn run_connection(socket: WebSocket, user_id: UserId, state: AppState) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<ServerEvent>(state.config.outbound_queue_capacity);

    let handle = state.hub.join(user_id, out_tx).await;
    tracing::info!(%user_id, %handle, "live connection opened");

    let mut writer = tokio::spawn(async move {
        while let Some(event) = out_rx.recv().await {
            let Ok(json) = serde_json::to_string(&event) else {
                continue;
            };
            if ws_tx.send(Message::text(json)).await.is_err() {
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        handle_text_message(&state, user_id, text.as_str()).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(%user_id, %handle, error = %e, "live connection read error");
                        break;
                    }
                }
            }
            _ = &mut writer => break,
        }
    }

    state.hub.leave(user_id, handle).await;
    writer.abort();
    tracing::info!(%user_id, %handle, "live connection closed");
}

/// Handles one inbound text frame. Unknown or malformed frames and frames
/// for chats the user is not in are ignored.
async fn handle_text_message(state: &AppState, user_id: UserId, text: &str) {
    match ClientFrame::parse(text) {
        Some(ClientFrame::Typing { chat_id, typing }) => {
            if let Err(e) = state.dispatcher.typing(user_id, chat_id, typing).await {
                tracing::debug!(%user_id, %chat_id, error = %e, "typing frame dropped");
            }
        }
        Some(ClientFrame::Unknown) | None => {
            tracing::trace!(%user_id, "ignored client frame");
        }
    }
}
