use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    dto::{
        validation::{validate_display_name, validate_identifier},
        view::RoomView,
    },
    state::room::{MissionCard, Vote},
};

/// Payload used to open a new room.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    #[validate(custom(function = "validate_display_name"))]
    pub host_display_name: String,
    /// Whether the room is advertised in the public listing.
    #[serde(default)]
    pub is_public: bool,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomRequest {
    #[validate(custom(function = "validate_display_name"))]
    pub display_name: String,
}

/// Identifier issued to the caller, along with its view of the room.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomResponse {
    pub player_id: String,
    pub room: RoomView,
}

/// Body shared by every action that only needs to know who is acting.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PlayerActionRequest {
    #[validate(custom(function = "validate_identifier"))]
    pub player_id: String,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct KickPlayerRequest {
    /// Acting participant, must be the host.
    #[validate(custom(function = "validate_identifier"))]
    pub player_id: String,
    #[validate(custom(function = "validate_identifier"))]
    pub target_id: String,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProposeTeamRequest {
    #[validate(custom(function = "validate_identifier"))]
    pub player_id: String,
    #[validate(length(min = 1))]
    pub team: Vec<String>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitVoteRequest {
    #[validate(custom(function = "validate_identifier"))]
    pub player_id: String,
    pub vote: Vote,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PlayMissionCardRequest {
    #[validate(custom(function = "validate_identifier"))]
    pub player_id: String,
    pub choice: MissionCard,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[validate(custom(function = "validate_identifier"))]
    pub player_id: String,
    pub message: String,
}

/// Optional viewer used to redact a room read.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ViewerQuery {
    /// Participant the view is computed for; anonymous when omitted.
    pub player_id: Option<String>,
}

/// Entry of the public room listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicRoomSummary {
    pub room_id: String,
    pub host_name: String,
    pub player_count: usize,
}
