//! WebSocket handling for render clients.
//!
//! One task per socket: outbound frames come from the room's presentation
//! bridge through a bounded channel, inbound frames are handed back to the
//! bridge for dispatch.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};

use crate::app::App;
use crate::rooms::{ConnectionHandle, Outbound, Room, CLOSE_WAIT, PING_WRITE_TIMEOUT};

use super::http::{ApiError, ChannelQuery};

/// WebSocket upgrade handler - entry point for new render clients.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app): State<Arc<App>>,
    Query(query): Query<ChannelQuery>,
) -> Result<Response, ApiError> {
    let room = app
        .rooms
        .room(&query.channel_name)
        .await
        .filter(|room| !room.is_closed())
        .ok_or(ApiError::NotFound)?;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, room)))
}

/// Handle an individual render client until either side closes.
async fn handle_socket(socket: WebSocket, room: Arc<Room>) {
    let bridge = room.bridge().clone();
    let ConnectionHandle {
        connection_id,
        mut outbound,
        shutdown,
    } = room.attach().await;
    drop(room);

    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Forward bridge output to the socket
    let send_shutdown = shutdown.clone();
    let mut send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = send_shutdown.cancelled() => {
                    let _ = ws_sender.send(Message::Close(None)).await;
                    break;
                }
                next = outbound.recv() => match next {
                    Some(Outbound::Message(msg)) => {
                        let json = match serde_json::to_string(&msg) {
                            Ok(json) => json,
                            Err(e) => {
                                tracing::warn!(connection_id = %connection_id, error = %e, "Failed to serialize message");
                                continue;
                            }
                        };
                        if ws_sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Some(Outbound::Ping) => {
                        let ping = ws_sender.send(Message::Ping(Bytes::new()));
                        match tokio::time::timeout(PING_WRITE_TIMEOUT, ping).await {
                            Ok(Ok(())) => {}
                            Ok(Err(e)) => {
                                tracing::warn!(connection_id = %connection_id, error = %e, "Ping failed");
                                break;
                            }
                            Err(_) => {
                                tracing::warn!(connection_id = %connection_id, "Ping write timed out");
                                break;
                            }
                        }
                    }
                    None => break,
                },
            }
        }
    });

    // Handle incoming messages
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = &mut send_task => break,
            next = ws_receiver.next() => match next {
                Some(Ok(Message::Text(text))) => bridge.handle_inbound(connection_id, text.as_str()),
                Some(Ok(Message::Close(_))) | None => {
                    tracing::info!(connection_id = %connection_id, "WebSocket closed by client");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!(connection_id = %connection_id, error = %e, "WebSocket error");
                    break;
                }
            },
        }
    }

    // Let the close frame go out before the bridge stops waiting on us
    if shutdown.is_cancelled() && !send_task.is_finished() {
        let _ = tokio::time::timeout(CLOSE_WAIT, &mut send_task).await;
    }
    send_task.abort();
    bridge.remove_connection(connection_id);

    tracing::info!(connection_id = %connection_id, "WebSocket connection terminated");
}
