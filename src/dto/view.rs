//! Per-recipient views of a room, as delivered over HTTP and WebSocket.

use indexmap::IndexMap;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dto::format_system_time,
    state::room::{
        ChatMessage, LogEntry, MissionCard, MissionRecord, Phase, Player, Role, Room, RoomStatus,
        Vote, Winner,
    },
};

/// Coarse lifecycle exposed to clients; the running phase is carried separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomStatusView {
    /// Waiting for players.
    Lobby,
    /// A game is running.
    InProgress,
    /// The game is over.
    Finished,
}

/// Participant as seen by one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    /// Participant identifier.
    pub id: String,
    /// Name shown to the table.
    pub display_name: String,
    /// Lobby readiness flag.
    pub is_ready: bool,
    /// Whether the participant has a live socket.
    pub is_online: bool,
    /// `null` when the recipient is not allowed to know it.
    pub role: Option<Role>,
    /// `null` unless the recipient played it.
    pub mission_choice: Option<MissionCard>,
    /// Avatar identifier.
    pub character: String,
    /// Chat color.
    pub chat_color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageView {
    /// RFC 3339 timestamp.
    pub timestamp: String,
    pub sender_id: String,
    pub sender_name: String,
    pub sender_color: String,
    pub message: String,
}

impl From<&ChatMessage> for ChatMessageView {
    fn from(value: &ChatMessage) -> Self {
        Self {
            timestamp: format_system_time(value.timestamp),
            sender_id: value.sender_id.clone(),
            sender_name: value.sender_name.clone(),
            sender_color: value.sender_color.clone(),
            message: value.message.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogEntryView {
    /// RFC 3339 timestamp.
    pub timestamp: String,
    pub message: String,
}

impl From<&LogEntry> for LogEntryView {
    fn from(value: &LogEntry) -> Self {
        Self {
            timestamp: format_system_time(value.timestamp),
            message: value.message.clone(),
        }
    }
}

/// Room snapshot redacted for a single recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoomView {
    pub id: String,
    pub status: RoomStatusView,
    /// Running phase, `null` outside of a game.
    pub phase: Option<Phase>,
    pub host_id: String,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    #[schema(value_type = Object)]
    pub players: IndexMap<String, PlayerView>,
    pub player_order: Vec<String>,
    pub mission_number: u8,
    pub round_number: u8,
    pub mastermind_id: Option<String>,
    pub proposed_team: Option<Vec<String>>,
    #[schema(value_type = Object)]
    pub votes: IndexMap<String, Vote>,
    pub mission_history: Vec<MissionRecord>,
    pub acknowledgements: Vec<String>,
    pub winner: Option<Winner>,
    pub chat_history: Vec<ChatMessageView>,
    pub game_log: Vec<LogEntryView>,
    pub is_public: bool,
}

impl RoomView {
    /// Derive what `viewer` may see of `room`.
    ///
    /// While a game is running, secret fields of other participants are hidden:
    /// mission cards always, roles unless both viewer and subject are agents.
    /// Anonymous viewers see no secret at all. Outside of a game nothing is hidden.
    pub fn project(room: &Room, viewer: Option<&str>) -> Self {
        let in_progress = matches!(room.status, RoomStatus::InProgress(_));
        let viewer_is_agent = viewer
            .and_then(|id| room.players.get(id))
            .is_some_and(|player| player.role == Some(Role::Agent));

        let players = room
            .players
            .iter()
            .map(|(id, player)| {
                let is_self = viewer == Some(id.as_str());
                let view = if !in_progress || is_self {
                    PlayerView::unredacted(player)
                } else {
                    let agents_together = viewer_is_agent && player.role == Some(Role::Agent);
                    PlayerView {
                        role: player.role.filter(|_| agents_together),
                        mission_choice: None,
                        ..PlayerView::unredacted(player)
                    }
                };
                (id.clone(), view)
            })
            .collect();

        Self {
            id: room.id.clone(),
            status: match room.status {
                RoomStatus::Lobby => RoomStatusView::Lobby,
                RoomStatus::InProgress(_) => RoomStatusView::InProgress,
                RoomStatus::Finished => RoomStatusView::Finished,
            },
            phase: room.phase(),
            host_id: room.host_id.clone(),
            created_at: format_system_time(room.created_at),
            players,
            player_order: room.player_order.clone(),
            mission_number: room.mission_number,
            round_number: room.round_number,
            mastermind_id: room.mastermind_id.clone(),
            proposed_team: room.proposed_team.clone(),
            votes: room.votes.clone(),
            mission_history: room.mission_history.clone(),
            acknowledgements: room.acknowledgements.iter().cloned().collect(),
            winner: room.winner,
            chat_history: room.chat_history.iter().map(Into::into).collect(),
            game_log: room.game_log.iter().map(Into::into).collect(),
            is_public: room.is_public,
        }
    }
}

impl PlayerView {
    fn unredacted(player: &Player) -> Self {
        Self {
            id: player.id.clone(),
            display_name: player.display_name.clone(),
            is_ready: player.is_ready,
            is_online: player.is_online,
            role: player.role,
            mission_choice: player.mission_choice,
            character: player.character.clone(),
            chat_color: player.chat_color.clone(),
        }
    }
}
