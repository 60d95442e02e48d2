mod config;
mod error;
mod routes;
mod state;

use crate::config::AppConfig;
use crate::state::AppState;
use clap::Parser;
use drive_backup_core::jobs::start_retention_sweep;
use drive_backup_core::utils::logger;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Drive backup HTTP server
#[derive(Parser, Debug)]
#[command(name = "drive-backup-server")]
#[command(about = "Backs up a remote drive into downloadable ZIP volumes", long_about = None)]
#[command(version)]
struct Args {
    /// Port to listen on (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Path to TOML configuration file (overrides BACKUP_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = AppConfig::from_env(args.config)?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(level) = args.log_level {
        config.engine.log.level = level;
    }

    logger::init(&config.engine.log.level)?;
    tracing::info!("Starting drive backup server on port {}", config.port);

    // Ensure the downloads directory exists
    std::fs::create_dir_all(&config.engine.archive.downloads_dir)?;
    if config.google_client_id.is_empty() {
        tracing::warn!("GOOGLE_CLIENT_ID not set; expired tokens cannot be refreshed");
    }

    // Build application state
    let state = Arc::new(AppState::new(config.clone())?);

    // Start retention sweep
    let cancel = CancellationToken::new();
    let sweep = start_retention_sweep(state.registry(), config.engine.retention.clone(), cancel.clone());

    // Build router
    let app = routes::create_router(state.clone());

    // Start HTTP server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    // Graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await?;

    // Cleanup
    tracing::info!("Shutting down...");
    cancel.cancel();
    if let Err(e) = sweep.await {
        tracing::warn!("Retention sweep did not stop cleanly: {}", e);
    }

    tracing::info!(jobs = state.registry().len(), "Server stopped");

    Ok(())
}

async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl+c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }

    cancel.cancel();
}
