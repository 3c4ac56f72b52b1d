//! configmap-greeter: a greeting service configured from a ConfigMap.
//!
//! This is the application entry point. It loads configuration from TOML,
//! initializes tracing, starts the ConfigMap poller, sets up the Axum router
//! and runs the HTTP server until SIGTERM/SIGINT.

use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;

use configmap_greeter::config::{AppConfig, DEFAULT_CONFIG_PATH, DEFAULT_LOG_FILTER};
use configmap_greeter::http::start_server;
use configmap_greeter::routes::create_router;
use configmap_greeter::{logging, source, AppState, ConfigPoller, GreetingStore};

/// configmap-greeter: greeting service configured from a Kubernetes ConfigMap
#[derive(Parser, Debug)]
#[command(name = "configmap-greeter", version, about)]
struct Args {
    /// Path to configuration file (built-in defaults when absent)
    #[arg(short, long)]
    config: Option<String>,

    /// Log filter directives (e.g., "configmap_greeter=debug,tower_http=info")
    #[arg(short, long)]
    log_level: Option<String>,

    /// Override http.port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration; an explicit path must exist
    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::load_or_default(DEFAULT_CONFIG_PATH)?,
    };
    if let Some(port) = args.port {
        config.http.port = port;
    }

    // Initialize tracing with priority: CLI > env > default
    let log_filter = args
        .log_level
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
    let verbosity = logging::init(&log_filter, &config.logging)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.http.host,
        port = config.http.port,
        interval_ms = config.poller.interval_ms,
        "Loaded configuration"
    );

    // Start the ConfigMap poller
    let greetings = GreetingStore::new();
    let config_source = source::from_config(&config.source)?;
    let poller = ConfigPoller::new(
        config_source,
        greetings.clone(),
        Arc::new(verbosity),
        config.poller.interval(),
    );
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poller_task = tokio::spawn(poller.run(shutdown_rx));

    // Create application state and router
    let state = AppState::new(config.clone(), greetings);
    let app = create_router(state);

    start_server(app, &config.http, shutdown_tx).await?;
    poller_task.await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
