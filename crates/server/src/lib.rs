//! # sqlchat server
//!
//! The HTTP front-end of `sqlchat`. Each route forwards to one cached
//! orchestration function; training routes manage the knowledge store.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod router;
pub mod state;
pub mod types;

use crate::{
    config::{get_config, Config},
    router::create_router,
    state::build_app_state,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Builds the application state and serves the router on `listener` until
/// Ctrl+C is received.
pub async fn run(listener: TcpListener, config: Config) -> anyhow::Result<()> {
    debug!(
        port = config.port,
        project_id = %config.project_id,
        "Server configuration loaded"
    );

    let app_state = build_app_state(config).await?;
    let app = create_router(app_state);

    info!("sqlchat listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for the shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received.");
}

/// The binary's entry point: loads `.env`, installs logging, reads the
/// configuration and binds the listener.
pub async fn start() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = get_config(None)?;
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;

    run(listener, config).await
}
