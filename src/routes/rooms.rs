use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::{
        room::{
            ChatRequest, CreateRoomRequest, JoinRoomRequest, JoinRoomResponse,
            KickPlayerRequest, PlayMissionCardRequest, PlayerActionRequest, ProposeTeamRequest,
            PublicRoomSummary, SubmitVoteRequest, ViewerQuery,
        },
        view::RoomView,
    },
    error::AppError,
    services::{exit_service, room_service},
    state::{SharedState, state_machine::RevealScreen},
};

/// Room lifecycle and gameplay endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/rooms", get(list_public_rooms).post(create_room))
        .route("/rooms/{room_id}", get(get_room))
        .route("/rooms/{room_id}/join", post(join_room))
        .route("/rooms/{room_id}/leave", post(leave_room))
        .route("/rooms/{room_id}/ready", post(toggle_ready))
        .route("/rooms/{room_id}/kick", post(kick_player))
        .route("/rooms/{room_id}/start", post(start_game))
        .route("/rooms/{room_id}/propose-team", post(propose_team))
        .route("/rooms/{room_id}/submit-vote", post(submit_vote))
        .route("/rooms/{room_id}/play-mission-card", post(play_mission_card))
        .route(
            "/rooms/{room_id}/acknowledge-vote-reveal",
            post(acknowledge_vote_reveal),
        )
        .route("/rooms/{room_id}/acknowledge-reveal", post(acknowledge_reveal))
        .route("/rooms/{room_id}/reset", post(reset_game))
        .route("/rooms/{room_id}/chat", post(post_chat))
}

/// List public rooms still waiting in their lobby.
#[utoipa::path(
    get,
    path = "/rooms",
    tag = "rooms",
    responses((status = 200, description = "Joinable public rooms", body = [PublicRoomSummary]))
)]
pub async fn list_public_rooms(
    State(state): State<SharedState>,
) -> Result<Json<Vec<PublicRoomSummary>>, AppError> {
    Ok(Json(room_service::list_public_rooms(&state).await?))
}

/// Open a new room hosted by the caller.
#[utoipa::path(
    post,
    path = "/rooms",
    tag = "rooms",
    request_body = CreateRoomRequest,
    responses(
        (status = 201, description = "Room created, `playerId` identifies the host", body = JoinRoomResponse),
        (status = 400, description = "Invalid display name")
    )
)]
pub async fn create_room(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateRoomRequest>>,
) -> Result<(StatusCode, Json<JoinRoomResponse>), AppError> {
    let (player_id, room) =
        room_service::create_room(&state, &payload.host_display_name, payload.is_public).await?;
    let room = RoomView::project(&room, Some(player_id.as_str()));
    Ok((StatusCode::CREATED, Json(JoinRoomResponse { player_id, room })))
}

/// Fetch a room as seen by `playerId`, or fully redacted when omitted.
#[utoipa::path(
    get,
    path = "/rooms/{room_id}",
    tag = "rooms",
    params(("room_id" = String, Path, description = "Room identifier"), ViewerQuery),
    responses(
        (status = 200, description = "Room state", body = RoomView),
        (status = 404, description = "Unknown room")
    )
)]
pub async fn get_room(
    State(state): State<SharedState>,
    Path(room_id): Path<String>,
    Query(viewer): Query<ViewerQuery>,
) -> Result<Json<RoomView>, AppError> {
    let room = room_service::get_room(&state, &room_id).await?;
    Ok(Json(RoomView::project(&room, viewer.player_id.as_deref())))
}

/// Take a seat in a lobby.
#[utoipa::path(
    post,
    path = "/rooms/{room_id}/join",
    tag = "rooms",
    params(("room_id" = String, Path, description = "Room identifier")),
    request_body = JoinRoomRequest,
    responses(
        (status = 200, description = "Seat taken, `playerId` identifies the newcomer", body = JoinRoomResponse),
        (status = 409, description = "Room is full or already started")
    )
)]
pub async fn join_room(
    State(state): State<SharedState>,
    Path(room_id): Path<String>,
    Valid(Json(payload)): Valid<Json<JoinRoomRequest>>,
) -> Result<Json<JoinRoomResponse>, AppError> {
    let (player_id, room) = room_service::join_room(&state, &room_id, &payload.display_name).await?;
    let room = RoomView::project(&room, Some(player_id.as_str()));
    Ok(Json(JoinRoomResponse { player_id, room }))
}

/// Leave a room. A departing host terminates it.
#[utoipa::path(
    post,
    path = "/rooms/{room_id}/leave",
    tag = "rooms",
    params(("room_id" = String, Path, description = "Room identifier")),
    request_body = PlayerActionRequest,
    responses((status = 204, description = "Departure recorded"))
)]
pub async fn leave_room(
    State(state): State<SharedState>,
    Path(room_id): Path<String>,
    Valid(Json(payload)): Valid<Json<PlayerActionRequest>>,
) -> Result<StatusCode, AppError> {
    exit_service::leave_room(&state, &room_id, &payload.player_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Flip the caller's readiness in the lobby.
#[utoipa::path(
    post,
    path = "/rooms/{room_id}/ready",
    tag = "rooms",
    params(("room_id" = String, Path, description = "Room identifier")),
    request_body = PlayerActionRequest,
    responses((status = 200, description = "Readiness toggled", body = RoomView))
)]
pub async fn toggle_ready(
    State(state): State<SharedState>,
    Path(room_id): Path<String>,
    Valid(Json(payload)): Valid<Json<PlayerActionRequest>>,
) -> Result<Json<RoomView>, AppError> {
    let room = room_service::toggle_ready(&state, &room_id, &payload.player_id).await?;
    Ok(Json(RoomView::project(&room, Some(payload.player_id.as_str()))))
}

/// Remove a participant from the lobby. Host only.
#[utoipa::path(
    post,
    path = "/rooms/{room_id}/kick",
    tag = "rooms",
    params(("room_id" = String, Path, description = "Room identifier")),
    request_body = KickPlayerRequest,
    responses(
        (status = 200, description = "Participant removed", body = RoomView),
        (status = 403, description = "Caller is not the host")
    )
)]
pub async fn kick_player(
    State(state): State<SharedState>,
    Path(room_id): Path<String>,
    Valid(Json(payload)): Valid<Json<KickPlayerRequest>>,
) -> Result<Json<RoomView>, AppError> {
    let room =
        room_service::kick_player(&state, &room_id, &payload.player_id, &payload.target_id).await?;
    Ok(Json(RoomView::project(&room, Some(payload.player_id.as_str()))))
}

/// Deal the roles and start the game. Host only.
#[utoipa::path(
    post,
    path = "/rooms/{room_id}/start",
    tag = "rooms",
    params(("room_id" = String, Path, description = "Room identifier")),
    request_body = PlayerActionRequest,
    responses(
        (status = 200, description = "Game started", body = RoomView),
        (status = 409, description = "Not enough players or someone is not ready")
    )
)]
pub async fn start_game(
    State(state): State<SharedState>,
    Path(room_id): Path<String>,
    Valid(Json(payload)): Valid<Json<PlayerActionRequest>>,
) -> Result<Json<RoomView>, AppError> {
    let room = room_service::start_game(&state, &room_id, &payload.player_id).await?;
    Ok(Json(RoomView::project(&room, Some(payload.player_id.as_str()))))
}

/// Propose a team for the current mission. Mastermind only.
#[utoipa::path(
    post,
    path = "/rooms/{room_id}/propose-team",
    tag = "rooms",
    params(("room_id" = String, Path, description = "Room identifier")),
    request_body = ProposeTeamRequest,
    responses(
        (status = 200, description = "Team proposed", body = RoomView),
        (status = 400, description = "Wrong team size or unknown member")
    )
)]
pub async fn propose_team(
    State(state): State<SharedState>,
    Path(room_id): Path<String>,
    Valid(Json(payload)): Valid<Json<ProposeTeamRequest>>,
) -> Result<Json<RoomView>, AppError> {
    let ProposeTeamRequest { player_id, team } = payload;
    let room = room_service::propose_team(&state, &room_id, &player_id, team).await?;
    Ok(Json(RoomView::project(&room, Some(player_id.as_str()))))
}

#[utoipa::path(
    post,
    path = "/rooms/{room_id}/submit-vote",
    tag = "rooms",
    params(("room_id" = String, Path, description = "Room identifier")),
    request_body = SubmitVoteRequest,
    responses((status = 200, description = "Ballot recorded", body = RoomView))
)]
pub async fn submit_vote(
    State(state): State<SharedState>,
    Path(room_id): Path<String>,
    Valid(Json(payload)): Valid<Json<SubmitVoteRequest>>,
) -> Result<Json<RoomView>, AppError> {
    let room = room_service::submit_vote(&state, &room_id, &payload.player_id, payload.vote).await?;
    Ok(Json(RoomView::project(&room, Some(payload.player_id.as_str()))))
}

#[utoipa::path(
    post,
    path = "/rooms/{room_id}/play-mission-card",
    tag = "rooms",
    params(("room_id" = String, Path, description = "Room identifier")),
    request_body = PlayMissionCardRequest,
    responses(
        (status = 200, description = "Card played", body = RoomView),
        (status = 403, description = "Caller is not on the team, or a thief tried to fail")
    )
)]
pub async fn play_mission_card(
    State(state): State<SharedState>,
    Path(room_id): Path<String>,
    Valid(Json(payload)): Valid<Json<PlayMissionCardRequest>>,
) -> Result<Json<RoomView>, AppError> {
    let room =
        room_service::play_mission_card(&state, &room_id, &payload.player_id, payload.choice)
            .await?;
    Ok(Json(RoomView::project(&room, Some(payload.player_id.as_str()))))
}

/// Dismiss the vote reveal screen.
#[utoipa::path(
    post,
    path = "/rooms/{room_id}/acknowledge-vote-reveal",
    tag = "rooms",
    params(("room_id" = String, Path, description = "Room identifier")),
    request_body = PlayerActionRequest,
    responses((status = 200, description = "Acknowledgement recorded", body = RoomView))
)]
pub async fn acknowledge_vote_reveal(
    State(state): State<SharedState>,
    Path(room_id): Path<String>,
    Valid(Json(payload)): Valid<Json<PlayerActionRequest>>,
) -> Result<Json<RoomView>, AppError> {
    let room =
        room_service::acknowledge(&state, &room_id, &payload.player_id, RevealScreen::Votes)
            .await?;
    Ok(Json(RoomView::project(&room, Some(payload.player_id.as_str()))))
}

/// Dismiss the mission outcome screen.
#[utoipa::path(
    post,
    path = "/rooms/{room_id}/acknowledge-reveal",
    tag = "rooms",
    params(("room_id" = String, Path, description = "Room identifier")),
    request_body = PlayerActionRequest,
    responses((status = 200, description = "Acknowledgement recorded", body = RoomView))
)]
pub async fn acknowledge_reveal(
    State(state): State<SharedState>,
    Path(room_id): Path<String>,
    Valid(Json(payload)): Valid<Json<PlayerActionRequest>>,
) -> Result<Json<RoomView>, AppError> {
    let room =
        room_service::acknowledge(&state, &room_id, &payload.player_id, RevealScreen::Mission)
            .await?;
    Ok(Json(RoomView::project(&room, Some(payload.player_id.as_str()))))
}

/// Send a finished room back to its lobby. Host only.
#[utoipa::path(
    post,
    path = "/rooms/{room_id}/reset",
    tag = "rooms",
    params(("room_id" = String, Path, description = "Room identifier")),
    request_body = PlayerActionRequest,
    responses((status = 200, description = "Room back in lobby", body = RoomView))
)]
pub async fn reset_game(
    State(state): State<SharedState>,
    Path(room_id): Path<String>,
    Valid(Json(payload)): Valid<Json<PlayerActionRequest>>,
) -> Result<Json<RoomView>, AppError> {
    let room = room_service::reset_game(&state, &room_id, &payload.player_id).await?;
    Ok(Json(RoomView::project(&room, Some(payload.player_id.as_str()))))
}

#[utoipa::path(
    post,
    path = "/rooms/{room_id}/chat",
    tag = "rooms",
    params(("room_id" = String, Path, description = "Room identifier")),
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Message posted", body = RoomView),
        (status = 400, description = "Empty or oversized message")
    )
)]
pub async fn post_chat(
    State(state): State<SharedState>,
    Path(room_id): Path<String>,
    Valid(Json(payload)): Valid<Json<ChatRequest>>,
) -> Result<Json<RoomView>, AppError> {
    let room = room_service::post_chat(&state, &room_id, &payload.player_id, &payload.message).await?;
    Ok(Json(RoomView::project(&room, Some(payload.player_id.as_str()))))
}
