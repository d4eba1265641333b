//! Heist Back binary entrypoint wiring the REST API, participant WebSockets and the room store.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use heist_back::{
    config::AppConfig,
    dao::room_store::{RoomStore, memory::MemoryRoomStore},
    routes,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let store = open_store().await?;
    let app_state = AppState::new(config, store);

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Select the room store from `HEIST_STORE` (`memory` by default).
async fn open_store() -> anyhow::Result<Arc<dyn RoomStore>> {
    let backend = env::var("HEIST_STORE").unwrap_or_else(|_| "memory".into());
    match backend.as_str() {
        "memory" => {
            info!("using in-memory room store");
            Ok(Arc::new(MemoryRoomStore::new()))
        }
        #[cfg(feature = "couch-store")]
        "couch" => {
            use heist_back::dao::room_store::couchdb::{CouchConfig, CouchRoomStore};

            let config = CouchConfig::from_env().context("reading CouchDB configuration")?;
            let store = CouchRoomStore::connect(config)
                .await
                .context("connecting to CouchDB")?;
            info!("using CouchDB room store");
            Ok(Arc::new(store))
        }
        other => anyhow::bail!("unsupported HEIST_STORE `{other}`"),
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
