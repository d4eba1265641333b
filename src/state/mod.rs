pub mod connections;
pub mod exit;
pub mod room;
pub mod rotation;
pub mod rules;
pub mod scheduler;
pub mod state_machine;
pub mod transitions;

use std::sync::Arc;

use crate::{
    config::AppConfig,
    dao::room_store::RoomStore,
    state::{
        connections::ConnectionRegistry, scheduler::TransitionScheduler,
        state_machine::DeferredTransition,
    },
};

pub type SharedState = Arc<AppState>;

/// Central application state: configuration, record store, live sockets and timers.
pub struct AppState {
    config: Arc<AppConfig>,
    store: Arc<dyn RoomStore>,
    connections: ConnectionRegistry,
    scheduler: TransitionScheduler,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] and start its transition scheduler.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: AppConfig, store: Arc<dyn RoomStore>) -> SharedState {
        let (scheduler, requests) = TransitionScheduler::channel();
        let state = Arc::new(Self {
            config: Arc::new(config),
            store,
            connections: ConnectionRegistry::new(),
            scheduler,
        });
        tokio::spawn(scheduler::run(Arc::downgrade(&state), requests));
        state
    }

    /// Immutable application configuration loaded at startup.
    pub fn config(&self) -> Arc<AppConfig> {
        self.config.clone()
    }

    /// Record store holding every room.
    pub fn store(&self) -> &Arc<dyn RoomStore> {
        &self.store
    }

    /// Registry of live sockets keyed by room and participant.
    pub fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }

    /// Run `transition` once its reveal pause has elapsed.
    pub fn schedule(&self, transition: DeferredTransition) {
        let delay = transition.kind.delay(&self.config);
        self.scheduler.schedule(transition, delay);
    }
}
