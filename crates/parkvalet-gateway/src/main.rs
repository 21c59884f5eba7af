use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::{info, warn};

use parkvalet_core::ValetConfig;

mod app;
mod auth;
mod error;
mod http;

#[derive(Parser, Debug)]
#[command(author, version, about = "ParkValet reservation server")]
struct Cli {
    /// Path to valet.toml (defaults to ~/.parkvalet/valet.toml)
    #[arg(long, env = "PARKVALET_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parkvalet_gateway=info,tower_http=debug".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = ValetConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        ValetConfig::default()
    });
    config.ensure_data_dir()?;

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;

    let state = Arc::new(app::AppState::open(config)?);
    let purged = state.accounts.purge_expired_sessions()?;
    if purged > 0 {
        info!(purged, "dropped expired sessions");
    }
    let router = app::build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("ParkValet listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("received Ctrl+C, shutting down"),
            Err(e) => warn!("failed to listen for Ctrl+C: {e}"),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
