//! Graceful shutdown and signal handling.
//!
//! SIGTERM (sent by the kubelet when the pod is stopped) and SIGINT both
//! stop the HTTP server from accepting connections and stop the config
//! poller.

use tokio::sync::watch;

/// Resolve once SIGTERM or SIGINT is received.
///
/// A signal whose handler cannot be installed is logged and never fires;
/// the other one still works.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

/// Wait for `signal`, then tell background tasks to stop.
pub async fn broadcast_on<F>(signal: F, notify: watch::Sender<bool>)
where
    F: std::future::Future<Output = ()>,
{
    signal.await;
    // Receivers may already be gone if the poller exited on its own
    let _ = notify.send(true);
}
