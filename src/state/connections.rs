use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, close_code};
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    dto::view::RoomView, services::websocket_service::send_message_to_websocket,
    state::room::Room,
};

/// Reason sent along the close frame of a kicked participant.
pub const KICKED_REASON: &str = "Kicked from lobby by host";

#[derive(Clone)]
/// Handle used to push messages to a participant's socket.
pub struct PlayerConnection {
    /// Distinguishes successive sockets opened by the same participant.
    pub id: Uuid,
    /// Writer channel of the socket.
    pub tx: mpsc::UnboundedSender<Message>,
}

/// Live sockets, grouped by room and keyed by participant.
#[derive(Default)]
pub struct ConnectionRegistry {
    rooms: DashMap<String, DashMap<String, PlayerConnection>>,
}

impl ConnectionRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new socket for `player_id`, closing any socket it replaces.
    pub fn register(
        &self,
        room_id: &str,
        player_id: &str,
        tx: mpsc::UnboundedSender<Message>,
    ) -> Uuid {
        let connection = PlayerConnection {
            id: Uuid::new_v4(),
            tx,
        };
        let id = connection.id;
        let previous = self
            .rooms
            .entry(room_id.to_string())
            .or_default()
            .insert(player_id.to_string(), connection);
        if let Some(previous) = previous {
            debug!(room_id, player_id, "replacing previous socket");
            let _ = previous.tx.send(close_message(close_code::NORMAL, "Replaced by a new connection"));
        }
        id
    }

    /// Forget the socket `connection_id` of `player_id`.
    ///
    /// Returns `false` when the participant has since been re-registered with another
    /// socket, or was already removed by a kick or a termination.
    pub fn unregister(&self, room_id: &str, player_id: &str, connection_id: Uuid) -> bool {
        let removed = self.rooms.get(room_id).is_some_and(|players| {
            players
                .remove_if(player_id, |_, connection| connection.id == connection_id)
                .is_some()
        });
        self.rooms.remove_if(room_id, |_, players| players.is_empty());
        removed
    }

    /// Participants of `room_id` with a live socket.
    pub fn connected(&self, room_id: &str) -> Vec<String> {
        self.rooms
            .get(room_id)
            .map(|players| players.iter().map(|entry| entry.key().clone()).collect())
            .unwrap_or_default()
    }

    /// Send every connected participant the view of `room` they are allowed to see.
    ///
    /// Delivery is best-effort: a dead socket is logged and skipped.
    pub fn broadcast(&self, room: &Room) {
        let targets: Vec<(String, mpsc::UnboundedSender<Message>)> = match self.rooms.get(&room.id) {
            Some(players) => players
                .iter()
                .map(|entry| (entry.key().clone(), entry.value().tx.clone()))
                .collect(),
            None => return,
        };

        for (player_id, tx) in targets {
            let view = RoomView::project(room, Some(player_id.as_str()));
            if send_message_to_websocket(&tx, &view, "room update").is_err() {
                warn!(room_id = %room.id, player_id = %player_id, "failed to deliver room update");
            }
        }
    }

    /// Send `player_id` its current view of `room`.
    pub fn send_to(&self, room: &Room, player_id: &str) {
        let Some(tx) = self.sender(&room.id, player_id) else {
            return;
        };
        let view = RoomView::project(room, Some(player_id));
        let _ = send_message_to_websocket(&tx, &view, "initial room state");
    }

    /// Close and forget the socket of a single participant.
    pub fn close_player(&self, room_id: &str, player_id: &str, reason: &'static str) {
        let removed = self
            .rooms
            .get(room_id)
            .and_then(|players| players.remove(player_id));
        if let Some((_, connection)) = removed {
            let _ = connection.tx.send(close_message(close_code::NORMAL, reason));
        }
        self.rooms.remove_if(room_id, |_, players| players.is_empty());
    }

    /// Close every socket of `room_id` and drop its bookkeeping.
    pub fn close_room(&self, room_id: &str) {
        let Some((_, players)) = self.rooms.remove(room_id) else {
            return;
        };
        for (player_id, connection) in players {
            debug!(room_id, player_id = %player_id, "closing socket of terminated room");
            let _ = connection.tx.send(close_message(close_code::NORMAL, "Game terminated"));
        }
    }

    fn sender(&self, room_id: &str, player_id: &str) -> Option<mpsc::UnboundedSender<Message>> {
        self.rooms
            .get(room_id)?
            .get(player_id)
            .map(|connection| connection.tx.clone())
    }
}

pub(crate) fn close_message(code: u16, reason: &'static str) -> Message {
    Message::Close(Some(CloseFrame {
        code,
        reason: Utf8Bytes::from_static(reason),
    }))
}
