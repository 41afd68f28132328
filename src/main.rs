//! Scoreboard binary entrypoint wiring the local store, the sync engine, the
//! clock ticker and the HTTP control surface.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::{net::TcpListener, sync::watch};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scoreboard_sync::{
    config::AppConfig,
    dao::match_store::{MatchStore, file::FileMatchStore},
    routes,
    services::{clock_ticker, sync_engine::SyncEngine},
    state::{AppState, SharedState, store::MatchStateStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    if config.remote_targets_control_surface() {
        anyhow::bail!(
            "remote record store {} is this control surface; set SCOREBOARD_REMOTE_URL or PORT",
            config.remote_url()
        );
    }
    let store = Arc::new(MatchStateStore::default());
    let remote = build_remote(&config)?;
    let local: Arc<dyn MatchStore> = Arc::new(FileMatchStore::new(config.local_path().clone()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (engine, sync) = SyncEngine::new(store.clone(), remote, local, config.sync_settings());
    let engine_task = engine.spawn(shutdown_rx.clone());
    let ticker_task = clock_ticker::spawn(store.clone(), shutdown_rx.clone());

    let app_state = AppState::new(store, sync, shutdown_rx);
    let app = build_router(app_state);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port()));
    info!(
        %addr,
        remote = %config.remote_url(),
        local = %config.local_path().display(),
        "starting control surface"
    );

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await
        .context("serving axum")?;

    for (name, task) in [("sync engine", engine_task), ("clock ticker", ticker_task)] {
        if let Err(err) = task.await {
            warn!(task = name, error = %err, "background task ended abnormally");
        }
    }

    Ok(())
}

#[cfg(feature = "http-store")]
fn build_remote(config: &AppConfig) -> anyhow::Result<Arc<dyn MatchStore>> {
    use scoreboard_sync::dao::match_store::http::{HttpMatchStore, HttpStoreConfig};

    let http_config =
        HttpStoreConfig::new(config.remote_url()).with_timeout(config.request_timeout());
    let store = HttpMatchStore::new(http_config).context("building remote record store client")?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "http-store"))]
fn build_remote(_config: &AppConfig) -> anyhow::Result<Arc<dyn MatchStore>> {
    use scoreboard_sync::dao::match_store::memory::MemoryMatchStore;

    warn!("built without the http-store feature; remote record kept in memory");
    Ok(Arc::new(MemoryMatchStore::new()))
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

/// Wait for Ctrl+C or SIGTERM, then tell background tasks and open streams to stop.
async fn shutdown_signal(shutdown: watch::Sender<bool>) {
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

    info!("shutdown requested");
    shutdown.send_replace(true);
}
