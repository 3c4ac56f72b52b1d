//! HTTP server startup logic.

use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::config::HttpServerConfig;

use super::shutdown;

/// Server startup error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid http.host or http.port: {0}")]
    Address(#[from] std::net::AddrParseError),

    #[error("Failed to bind server: {0}")]
    Bind(#[source] std::io::Error),

    #[error("Server error: {0}")]
    Server(#[source] std::io::Error),
}

/// Start the HTTP server.
///
/// Blocks until a shutdown signal arrives and in-flight requests drain;
/// `shutdown` is notified as soon as the signal is received.
pub async fn start_server(
    app: Router,
    config: &HttpServerConfig,
    shutdown: watch::Sender<bool>,
) -> Result<(), ServerError> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await.map_err(ServerError::Bind)?;

    tracing::info!(%addr, "Starting HTTP server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown::broadcast_on(shutdown::shutdown_signal(), shutdown))
        .await
        .map_err(ServerError::Server)?;

    tracing::info!("HTTP server stopped");
    Ok(())
}
