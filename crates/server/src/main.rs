use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use imagecast_pipeline::{NotificationRelay, RelayScheduler};
use imagecast_server::api::AppState;
use imagecast_server::config::ImagecastConfig;
use imagecast_server::factory;

/// imagecast HTTP server.
#[derive(Parser, Debug)]
#[command(name = "imagecast-server", about = "Image ingestion and notification server")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "imagecast.toml")]
    config: String,

    /// Override the bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port.
    #[arg(long)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run catalog migrations for the configured backend, then exit.
    Migrate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = ImagecastConfig::load(&cli.config)?;

    if let Some(Commands::Migrate) = cli.command {
        imagecast_server::telemetry::init_fmt();
        return run_migrate(&config).await;
    }

    let telemetry_guard = imagecast_server::telemetry::init(&config.telemetry);

    if !Path::new(&cli.config).exists() {
        info!(path = %cli.config, "config file not found, using defaults");
    }

    let backends = factory::create_backends(&config).await?;
    let state = AppState::new(&backends, &config);
    let ingestion = Arc::clone(&state.ingestion);

    let cancel = CancellationToken::new();
    let relay_handle = if config.relay.enabled {
        let relay = NotificationRelay::new(
            Arc::clone(&backends.queue),
            Arc::clone(&backends.topic),
            &config.relay.to_relay_config(),
        )
        .with_policy(config.calls.policy());
        let scheduler = RelayScheduler::new(Arc::new(relay));
        Some(scheduler.spawn(cancel.clone()))
    } else {
        info!("notification relay disabled");
        None
    };

    let app = imagecast_server::api::router(state);

    let host = cli.host.unwrap_or(config.server.host);
    let port = cli.port.unwrap_or(config.server.port);
    let addr = format!("{host}:{port}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "imagecast-server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_seconds);

    cancel.cancel();
    if let Some(handle) = relay_handle {
        info!("waiting for the current relay run...");
        match tokio::time::timeout(shutdown_timeout, handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "relay scheduler task failed"),
            Err(_) => warn!(
                timeout_secs = config.server.shutdown_timeout_seconds,
                "shutdown timeout exceeded while waiting for the relay"
            ),
        }
    }

    info!(
        pending = ingestion.pending_notifications(),
        "waiting for pending notification enqueues..."
    );
    if tokio::time::timeout(shutdown_timeout, ingestion.shutdown())
        .await
        .is_err()
    {
        warn!(
            timeout_secs = config.server.shutdown_timeout_seconds,
            "shutdown timeout exceeded, some notifications may be lost"
        );
    }

    telemetry_guard.shutdown();

    info!("imagecast-server shut down");
    Ok(())
}

/// Run the `migrate` subcommand: initialize the catalog schema and exit.
async fn run_migrate(config: &ImagecastConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(backend = %config.catalog.backend, "running catalog migrations...");
    let _catalog = factory::create_catalog(&config.catalog).await?;
    info!(backend = %config.catalog.backend, "catalog migrations complete");
    Ok(())
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM, then return to trigger graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received SIGINT"); }
        () = terminate => { info!("received SIGTERM"); }
    }
}
