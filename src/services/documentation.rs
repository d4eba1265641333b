use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Heist Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::rooms::list_public_rooms,
        crate::routes::rooms::create_room,
        crate::routes::rooms::get_room,
        crate::routes::rooms::join_room,
        crate::routes::rooms::leave_room,
        crate::routes::rooms::toggle_ready,
        crate::routes::rooms::kick_player,
        crate::routes::rooms::start_game,
        crate::routes::rooms::propose_team,
        crate::routes::rooms::submit_vote,
        crate::routes::rooms::play_mission_card,
        crate::routes::rooms::acknowledge_vote_reveal,
        crate::routes::rooms::acknowledge_reveal,
        crate::routes::rooms::reset_game,
        crate::routes::rooms::post_chat,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::room::CreateRoomRequest,
            crate::dto::room::JoinRoomRequest,
            crate::dto::room::JoinRoomResponse,
            crate::dto::room::PlayerActionRequest,
            crate::dto::room::KickPlayerRequest,
            crate::dto::room::ProposeTeamRequest,
            crate::dto::room::SubmitVoteRequest,
            crate::dto::room::PlayMissionCardRequest,
            crate::dto::room::ChatRequest,
            crate::dto::room::PublicRoomSummary,
            crate::dto::view::RoomView,
            crate::dto::view::PlayerView,
            crate::dto::view::RoomStatusView,
            crate::state::room::Phase,
            crate::state::room::Role,
            crate::state::room::Vote,
            crate::state::room::MissionCard,
            crate::state::room::Winner,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "rooms", description = "Room lifecycle, gameplay actions and the participant WebSocket"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_room_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/rooms/{room_id}/propose-team"));
        assert!(doc.paths.paths.contains_key("/ws/{room_id}/{player_id}"));
    }
}
