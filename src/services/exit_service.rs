use tracing::{info, warn};

use crate::{
    error::ServiceError,
    state::{
        SharedState,
        exit::ExitOutcome,
        room::Room,
        transitions::{Change, commit},
    },
};

/// Handle `player_id` leaving `room_id`, explicitly or by dropping its socket.
///
/// Terminated rooms are removed from the store and from the public listing once
/// every participant received the final state.
pub async fn leave_room(
    state: &SharedState,
    room_id: &str,
    player_id: &str,
) -> Result<(ExitOutcome, Room), ServiceError> {
    let (outcome, room) = commit(state, room_id, |room, rng| {
        let outcome = room.reconcile_exit(player_id, rng);
        Ok(match outcome {
            ExitOutcome::Ignored => Change::Skip { value: outcome },
            ExitOutcome::Terminated => Change::Delete { value: outcome },
            ExitOutcome::Continued(follow_up) => Change::Save {
                value: ExitOutcome::Continued(follow_up.clone()),
                follow_up,
            },
        })
    })
    .await?;

    match &outcome {
        ExitOutcome::Terminated => {
            if room.is_public {
                if let Err(err) = state.store().remove_public(room_id).await {
                    warn!(room_id, error = %err, "failed to drop terminated room from public listing");
                }
            }
            info!(room_id, player_id, "player left, room terminated");
        }
        ExitOutcome::Continued(_) => info!(room_id, player_id, "player left"),
        ExitOutcome::Ignored => {}
    }
    Ok((outcome, room))
}
