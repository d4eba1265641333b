use axum::extract::ws::{Message, WebSocket, close_code};
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    services::exit_service,
    state::{SharedState, connections::close_message},
};

/// Reason sent along the close frame when the room or participant is unknown.
const UNKNOWN_PARTICIPANT_REASON: &str = "Unknown room or participant";

/// Failure to hand a message over to a socket's writer task.
#[derive(Debug, Error)]
pub enum SendError {
    /// Writer channel closed, the socket is gone.
    #[error("connection closed")]
    ConnectionClosed,
}

/// Handle the full lifecycle of a participant's WebSocket connection.
///
/// The socket only carries server pushes: every inbound text frame is ignored.
/// Once it closes, the participant goes through exit reconciliation unless a newer
/// socket has taken over or the server already dropped it.
pub async fn handle_socket(
    state: SharedState,
    socket: WebSocket,
    room_id: String,
    player_id: String,
) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            let closing = matches!(message, Message::Close(_));
            if sender.send(message).await.is_err() || closing {
                break;
            }
        }
    });

    let room = match state.store().load(&room_id).await {
        Ok(Some(stored)) if stored.room.players.contains_key(&player_id) => stored.room,
        Ok(_) => {
            warn!(room_id = %room_id, player_id = %player_id, "rejecting socket for unknown room or participant");
            let _ = outbound_tx.send(close_message(
                close_code::POLICY,
                UNKNOWN_PARTICIPANT_REASON,
            ));
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Err(err) => {
            warn!(room_id = %room_id, error = %err, "failed to load room for socket");
            let _ = outbound_tx.send(close_message(close_code::AGAIN, "Storage unavailable"));
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let connection_id = state
        .connections()
        .register(&room_id, &player_id, outbound_tx.clone());
    info!(room_id = %room_id, player_id = %player_id, "participant connected");
    state.connections().send_to(&room, &player_id);

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                debug!(room_id = %room_id, player_id = %player_id, payload = %text, "ignoring inbound text");
            }
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(_)) => {
                info!(room_id = %room_id, player_id = %player_id, "participant closed socket");
                break;
            }
            Ok(Message::Binary(_)) | Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(room_id = %room_id, player_id = %player_id, error = %err, "websocket error");
                break;
            }
        }
    }

    if state
        .connections()
        .unregister(&room_id, &player_id, connection_id)
    {
        info!(room_id = %room_id, player_id = %player_id, "participant disconnected");
        if let Err(err) = exit_service::leave_room(&state, &room_id, &player_id).await {
            debug!(room_id = %room_id, player_id = %player_id, error = %err, "no exit to reconcile");
        }
    }

    finalize(writer_task, outbound_tx).await;
}

/// Serialize a payload and push it onto the provided WebSocket sender.
///
/// Returns `Ok(())` if the message was queued or if serialization failed (permanent
/// error, logged). Returns `Err(SendError::ConnectionClosed)` if the writer channel
/// is closed.
pub fn send_message_to_websocket<T>(
    tx: &mpsc::UnboundedSender<Message>,
    value: &T,
    context: &str,
) -> Result<(), SendError>
where
    T: ?Sized + serde::Serialize,
{
    let payload = match serde_json::to_string(value) {
        Ok(p) => p,
        Err(err) => {
            warn!(error = %err, context, "failed to serialize websocket payload");
            return Ok(());
        }
    };

    tx.send(Message::Text(payload.into()))
        .map_err(|_| SendError::ConnectionClosed)
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
