use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::models::StoredRoom,
    dto::room::PublicRoomSummary,
    error::ServiceError,
    state::{
        SharedState,
        connections::KICKED_REASON,
        room::{MissionCard, Player, Room, RoomStatus, Vote},
        state_machine::{RevealScreen, RoomEvent},
        transitions::{Change, commit},
    },
};

/// Characters kept from a fresh UUID to form a room id.
const ROOM_ID_LENGTH: usize = 8;

/// Open a new lobby seating only its host and return it with the host's id.
pub async fn create_room(
    state: &SharedState,
    host_display_name: &str,
    is_public: bool,
) -> Result<(String, Room), ServiceError> {
    let config = state.config();
    let room_id: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(ROOM_ID_LENGTH)
        .collect();
    let host_id = Uuid::new_v4().to_string();
    let display_name = host_display_name.trim().to_string();

    let room = {
        let mut rng = rand::rng();
        let character = config.first_unused_character(&[], &mut rng);
        let chat_color = config.first_unused_chat_color(&[], &mut rng);
        let mut host = Player::new(host_id.clone(), display_name.clone(), character, chat_color);
        host.is_ready = true;
        let mut room = Room::new(room_id.clone(), host, is_public);
        room.log_event(format!("Game created by {display_name}."));
        room
    };

    state.store().save(room.clone(), None).await?;
    if is_public {
        state.store().add_public(&room_id).await?;
    }
    info!(room_id = %room_id, host_id = %host_id, is_public, "room created");
    Ok((host_id, room))
}

/// Load the canonical record of `room_id`.
pub async fn get_room(state: &SharedState, room_id: &str) -> Result<Room, ServiceError> {
    state
        .store()
        .load(room_id)
        .await?
        .map(|StoredRoom { room, .. }| room)
        .ok_or_else(|| ServiceError::NotFound(format!("room `{room_id}` not found")))
}

/// Public rooms that can still be joined.
///
/// Index entries whose room no longer exists are pruned on the way.
pub async fn list_public_rooms(state: &SharedState) -> Result<Vec<PublicRoomSummary>, ServiceError> {
    let mut summaries = Vec::new();
    for room_id in state.store().list_public().await? {
        let Some(StoredRoom { room, .. }) = state.store().load(&room_id).await? else {
            warn!(room_id = %room_id, "pruning dangling public listing");
            state.store().remove_public(&room_id).await?;
            continue;
        };
        if room.status != RoomStatus::Lobby {
            continue;
        }
        summaries.push(PublicRoomSummary {
            host_name: room.display_name(&room.host_id),
            player_count: room.players.len(),
            room_id,
        });
    }
    Ok(summaries)
}

/// Seat a new participant and return the id issued to them.
pub async fn join_room(
    state: &SharedState,
    room_id: &str,
    display_name: &str,
) -> Result<(String, Room), ServiceError> {
    let player_id = Uuid::new_v4().to_string();
    let display_name = display_name.trim().to_string();
    let room = apply_event(
        state,
        room_id,
        RoomEvent::Join {
            player_id: player_id.clone(),
            display_name,
        },
    )
    .await?;
    info!(room_id, player_id = %player_id, "player joined");
    Ok((player_id, room))
}

pub async fn toggle_ready(
    state: &SharedState,
    room_id: &str,
    player_id: &str,
) -> Result<Room, ServiceError> {
    let event = RoomEvent::ToggleReady {
        player_id: player_id.to_string(),
    };
    apply_event(state, room_id, event).await
}

/// Remove `target_id` from the lobby and close their socket.
pub async fn kick_player(
    state: &SharedState,
    room_id: &str,
    player_id: &str,
    target_id: &str,
) -> Result<Room, ServiceError> {
    let event = RoomEvent::Kick {
        player_id: player_id.to_string(),
        target_id: target_id.to_string(),
    };
    let room = apply_event(state, room_id, event).await?;
    state
        .connections()
        .close_player(room_id, target_id, KICKED_REASON);
    info!(room_id, target_id, "player kicked");
    Ok(room)
}

/// Deal the roles and withdraw the room from the public listing.
pub async fn start_game(
    state: &SharedState,
    room_id: &str,
    player_id: &str,
) -> Result<Room, ServiceError> {
    let event = RoomEvent::Start {
        player_id: player_id.to_string(),
    };
    let room = apply_event(state, room_id, event).await?;
    if room.is_public {
        state.store().remove_public(room_id).await?;
    }
    info!(room_id, players = room.seated_count(), "game started");
    Ok(room)
}

pub async fn propose_team(
    state: &SharedState,
    room_id: &str,
    player_id: &str,
    team: Vec<String>,
) -> Result<Room, ServiceError> {
    let event = RoomEvent::ProposeTeam {
        player_id: player_id.to_string(),
        team,
    };
    apply_event(state, room_id, event).await
}

pub async fn submit_vote(
    state: &SharedState,
    room_id: &str,
    player_id: &str,
    vote: Vote,
) -> Result<Room, ServiceError> {
    let event = RoomEvent::SubmitVote {
        player_id: player_id.to_string(),
        vote,
    };
    apply_event(state, room_id, event).await
}

pub async fn play_mission_card(
    state: &SharedState,
    room_id: &str,
    player_id: &str,
    card: MissionCard,
) -> Result<Room, ServiceError> {
    let event = RoomEvent::PlayMissionCard {
        player_id: player_id.to_string(),
        card,
    };
    apply_event(state, room_id, event).await
}

/// Record that `player_id` dismissed a reveal screen.
pub async fn acknowledge(
    state: &SharedState,
    room_id: &str,
    player_id: &str,
    screen: RevealScreen,
) -> Result<Room, ServiceError> {
    let event = RoomEvent::Acknowledge {
        player_id: player_id.to_string(),
        screen,
    };
    apply_event(state, room_id, event).await
}

/// Send a finished room back to its lobby, listing it again when public.
pub async fn reset_game(
    state: &SharedState,
    room_id: &str,
    player_id: &str,
) -> Result<Room, ServiceError> {
    let event = RoomEvent::Reset {
        player_id: player_id.to_string(),
    };
    let room = apply_event(state, room_id, event).await?;
    if room.is_public {
        state.store().add_public(room_id).await?;
    }
    info!(room_id, "room reset to lobby");
    Ok(room)
}

pub async fn post_chat(
    state: &SharedState,
    room_id: &str,
    player_id: &str,
    message: &str,
) -> Result<Room, ServiceError> {
    let event = RoomEvent::Chat {
        player_id: player_id.to_string(),
        message: message.to_string(),
    };
    apply_event(state, room_id, event).await
}

/// Run `event` through the transition engine and commit the result.
async fn apply_event(
    state: &SharedState,
    room_id: &str,
    event: RoomEvent,
) -> Result<Room, ServiceError> {
    let config = state.config();
    let (_, room) = commit(state, room_id, |room, rng| {
        let follow_up = room.apply(event.clone(), &config, rng)?;
        Ok(Change::Save {
            value: (),
            follow_up,
        })
    })
    .await?;
    Ok(room)
}
