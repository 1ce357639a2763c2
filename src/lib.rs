//! Community hub API: users, communities and events over PostgreSQL, with
//! image uploads stored on local disk.

pub mod auth;
pub mod config;
pub mod db;
pub mod handlers;
pub mod models;
pub mod payload;
pub mod repos;
pub mod routes;
pub mod state;
pub mod uploads;
pub mod utils;
pub mod validation;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::db::Database;
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(std::io::Error),
}

/// Connect, migrate, and serve until ctrl-c or SIGTERM.
pub async fn serve(config: Config) -> Result<(), ServerError> {
    let db = Database::connect(&config).await?;
    let state = AppState::from_config(db.clone(), &config);
    let app = routes::create_routes(state, config.production);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: config.bind_addr,
            source,
        })?;

    tracing::info!(addr = %config.bind_addr, "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Serve)?;

    db.close().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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

    tracing::info!("Shutdown signal received");
}
