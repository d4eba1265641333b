use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{dao::storage::StorageError, state::state_machine::TransitionError};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Room or referenced participant does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Action attempted outside of its legal phase.
    #[error("invalid phase: {0}")]
    InvalidPhase(String),
    /// Caller lacks the required identity or role.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Malformed team, chat message or other payload.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    /// Action collides with something that already happened.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Unexpected failure inside the server.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict { room_id } => ServiceError::Conflict(format!(
                "room `{room_id}` kept changing, please retry"
            )),
            StorageError::Serialization { .. } => ServiceError::Internal(err.to_string()),
            StorageError::Unavailable { .. } => ServiceError::Unavailable(err),
        }
    }
}

impl From<TransitionError> for ServiceError {
    fn from(err: TransitionError) -> Self {
        let message = err.to_string();
        match err {
            TransitionError::UnknownPlayer { .. } => ServiceError::NotFound(message),
            TransitionError::WrongPhase { .. } => ServiceError::InvalidPhase(message),
            TransitionError::NotHost { .. }
            | TransitionError::NotMastermind
            | TransitionError::NotOnTeam
            | TransitionError::ThiefCannotFail => ServiceError::Forbidden(message),
            TransitionError::CannotKickSelf
            | TransitionError::WrongTeamSize { .. }
            | TransitionError::DuplicateTeamMember { .. }
            | TransitionError::UnknownTeamMember { .. }
            | TransitionError::EmptyChatMessage
            | TransitionError::ChatMessageTooLong { .. } => ServiceError::InvalidPayload(message),
            TransitionError::AlreadyVoted
            | TransitionError::AlreadyPlayed
            | TransitionError::LobbyFull { .. }
            | TransitionError::AlreadyStarted
            | TransitionError::NotEnoughPlayers { .. }
            | TransitionError::PlayersNotReady => ServiceError::Conflict(message),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Caller is not allowed to perform the action.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::InvalidPhase(message) | ServiceError::Conflict(message) => {
                AppError::Conflict(message)
            }
            ServiceError::Forbidden(message) => AppError::Forbidden(message),
            ServiceError::InvalidPayload(message) => AppError::BadRequest(message),
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Internal(message) => AppError::Internal(message),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_errors_map_to_expected_kinds() {
        assert!(matches!(
            ServiceError::from(TransitionError::ThiefCannotFail),
            ServiceError::Forbidden(_)
        ));
        assert!(matches!(
            ServiceError::from(TransitionError::AlreadyVoted),
            ServiceError::Conflict(_)
        ));
        assert!(matches!(
            ServiceError::from(TransitionError::WrongTeamSize {
                expected: 2,
                actual: 3
            }),
            ServiceError::InvalidPayload(_)
        ));
        assert!(matches!(
            ServiceError::from(TransitionError::UnknownPlayer {
                player_id: "x".into()
            }),
            ServiceError::NotFound(_)
        ));
    }

    #[test]
    fn app_errors_carry_http_status() {
        let cases = [
            (AppError::from(ServiceError::InvalidPhase("x".into())), StatusCode::CONFLICT),
            (AppError::from(ServiceError::Forbidden("x".into())), StatusCode::FORBIDDEN),
            (AppError::from(ServiceError::InvalidPayload("x".into())), StatusCode::BAD_REQUEST),
            (AppError::from(ServiceError::NotFound("x".into())), StatusCode::NOT_FOUND),
            (AppError::from(ServiceError::Internal("x".into())), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }
}
