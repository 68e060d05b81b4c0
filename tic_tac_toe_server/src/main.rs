use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tic_tac_toe_server::app_state::AppState;
use tic_tac_toe_server::broadcast::BroadcastHub;
use tic_tac_toe_server::config::Config;
use tic_tac_toe_server::game::service::GameService;
use tic_tac_toe_server::router;
use tic_tac_toe_server::store::SqliteStore;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::parse();

    let store = SqliteStore::open(&config.database_url)
        .with_context(|| format!("failed to open game store at {}", config.database_url))?;
    let hub = BroadcastHub::spawn(config.viewer_buffer);
    let game = GameService::new(store, hub.clone()).context("failed to restore saved game")?;
    let app_state = Arc::new(AppState::new(game, hub));

    let app = router(app_state, Some(config.static_dir.as_path()));

    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("failed to bind to {}:{}", config.host, config.port))?;

    info!("Server is running on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("❌ Unable to listen for shutdown signal: {}", e);
    }
}
