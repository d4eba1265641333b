use axum::{
    Router,
    extract::{Path, State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};

use crate::{services::websocket_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/ws/{room_id}/{player_id}",
    tag = "rooms",
    params(
        ("room_id" = String, Path, description = "Room identifier"),
        ("player_id" = String, Path, description = "Participant identifier issued on create or join")
    ),
    responses((status = 101, description = "Switching protocols to WebSocket"))
)]
/// Upgrade the HTTP connection into a participant's room update stream.
pub async fn ws_handler(
    State(state): State<SharedState>,
    Path((room_id, player_id)): Path<(String, String)>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        websocket_service::handle_socket(state, socket, room_id, player_id)
    })
}

/// Configure the WebSocket endpoint.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/ws/{room_id}/{player_id}", get(ws_handler))
}
