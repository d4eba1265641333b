use std::{
    collections::HashSet,
    sync::{Arc, Weak},
    time::Duration,
};

use tokio::{sync::mpsc, task::JoinSet};
use tracing::{debug, info, warn};

use crate::state::{
    AppState,
    state_machine::DeferredTransition,
    transitions::{Change, commit},
};

/// Request to run `transition` once `delay` has elapsed.
#[derive(Debug)]
pub struct ScheduleRequest {
    /// Transition to run.
    pub transition: DeferredTransition,
    /// How long to wait before running it.
    pub delay: Duration,
}

#[derive(Clone)]
/// Handle used to hand deferred transitions over to the scheduler task.
pub struct TransitionScheduler {
    tx: mpsc::UnboundedSender<ScheduleRequest>,
}

impl TransitionScheduler {
    /// Create the handle together with the receiving end consumed by [`run`].
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ScheduleRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue `transition` to run after `delay`. An identical request already sleeping wins.
    pub fn schedule(&self, transition: DeferredTransition, delay: Duration) {
        if self.tx.send(ScheduleRequest { transition, delay }).is_err() {
            warn!("transition scheduler is gone; dropping deferred transition");
        }
    }
}

/// Own every sleeping and firing deferred transition.
///
/// Duplicate requests for a transition that is already sleeping are ignored. The loop
/// ends once every [`TransitionScheduler`] handle is dropped, aborting what is left.
pub async fn run(state: Weak<AppState>, mut rx: mpsc::UnboundedReceiver<ScheduleRequest>) {
    let mut sleeping: HashSet<DeferredTransition> = HashSet::new();
    let mut timers: JoinSet<DeferredTransition> = JoinSet::new();
    let mut firing: JoinSet<()> = JoinSet::new();

    loop {
        tokio::select! {
            request = rx.recv() => {
                let Some(ScheduleRequest { transition, delay }) = request else {
                    break;
                };
                if !sleeping.insert(transition.clone()) {
                    debug!(room_id = %transition.room_id, kind = ?transition.kind, "transition already scheduled");
                    continue;
                }
                debug!(room_id = %transition.room_id, kind = ?transition.kind, delay_ms = delay.as_millis() as u64, "transition scheduled");
                timers.spawn(async move {
                    tokio::time::sleep(delay).await;
                    transition
                });
            }
            Some(woke) = timers.join_next(), if !timers.is_empty() => {
                let transition = match woke {
                    Ok(transition) => transition,
                    Err(err) => {
                        warn!(error = %err, "deferred transition timer failed");
                        continue;
                    }
                };
                sleeping.remove(&transition);
                let Some(state) = state.upgrade() else {
                    break;
                };
                firing.spawn(fire(state, transition));
            }
            Some(done) = firing.join_next(), if !firing.is_empty() => {
                if let Err(err) = done {
                    warn!(error = %err, "deferred transition task failed");
                }
            }
        }
    }
}

/// Apply `transition` if the room is still waiting for it.
async fn fire(state: Arc<AppState>, transition: DeferredTransition) {
    let room_id = transition.room_id.clone();
    let result = commit(&state, &room_id, |room, rng| {
        if !transition.still_applies(room) {
            return Ok(Change::Skip { value: false });
        }
        let follow_up = room.resolve(transition.kind, rng);
        Ok(Change::Save {
            value: true,
            follow_up,
        })
    })
    .await;

    match result {
        Ok((true, room)) => {
            info!(room_id = %room_id, kind = ?transition.kind, status = ?room.status, "deferred transition applied")
        }
        Ok((false, room)) => {
            debug!(room_id = %room_id, kind = ?transition.kind, status = ?room.status, "deferred transition no longer applies")
        }
        Err(err) => {
            debug!(room_id = %room_id, kind = ?transition.kind, error = %err, "deferred transition abandoned")
        }
    }
}
