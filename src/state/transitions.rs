use rand::rngs::ThreadRng;
use tracing::{debug, info};

use crate::{
    dao::{models::StoredRoom, storage::StorageError},
    error::ServiceError,
    state::{SharedState, room::Room, state_machine::DeferredTransition},
};

/// Attempts made to commit a mutation before giving up on a busy room.
const MAX_COMMIT_ATTEMPTS: usize = 5;

/// What the mutation closure decided to do with the room it was handed.
pub enum Change<T> {
    /// Persist the mutated room, broadcast it and schedule the follow-up.
    Save {
        value: T,
        follow_up: Option<DeferredTransition>,
    },
    /// Broadcast the final record, then remove the room and close its sockets.
    Delete { value: T },
    /// Leave the stored room untouched.
    Skip { value: T },
}

impl<T> Change<T> {
    /// Persist without any follow-up.
    pub fn save(value: T) -> Self {
        Self::Save {
            value,
            follow_up: None,
        }
    }
}

/// Load `room_id`, let `mutate` change a fresh copy and write it back.
///
/// The write is a compare-and-swap against the revision that was loaded: when another
/// writer got there first, the room is reloaded and `mutate` runs again, so its
/// validation always sees the latest state. Returns the closure's value together with
/// the committed room.
pub async fn commit<T, F>(
    state: &SharedState,
    room_id: &str,
    mut mutate: F,
) -> Result<(T, Room), ServiceError>
where
    F: FnMut(&mut Room, &mut ThreadRng) -> Result<Change<T>, ServiceError>,
{
    for attempt in 1..=MAX_COMMIT_ATTEMPTS {
        let Some(StoredRoom { mut room, revision }) = state.store().load(room_id).await? else {
            return Err(ServiceError::NotFound(format!("room `{room_id}` not found")));
        };

        let change = {
            let mut rng = rand::rng();
            mutate(&mut room, &mut rng)?
        };

        match change {
            Change::Skip { value } => return Ok((value, room)),
            Change::Save { value, follow_up } => {
                match state.store().save(room.clone(), Some(revision)).await {
                    Ok(_) => {}
                    Err(StorageError::Conflict { .. }) => {
                        debug!(room_id, attempt, "concurrent write detected, retrying");
                        continue;
                    }
                    Err(err) => return Err(err.into()),
                }
                state.connections().broadcast(&room);
                if let Some(transition) = follow_up {
                    state.schedule(transition);
                }
                return Ok((value, room));
            }
            Change::Delete { value } => {
                state.connections().broadcast(&room);
                state.store().delete(room_id).await?;
                state.connections().close_room(room_id);
                info!(room_id, "room terminated");
                return Ok((value, room));
            }
        }
    }

    Err(StorageError::Conflict {
        room_id: room_id.to_string(),
    }
    .into())
}
