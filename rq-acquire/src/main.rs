//! rq-acquire - Research quorum acquisition microservice
//!
//! Accepts research topics, discovers candidate videos, acquires a quorum
//! of transcripts per topic and streams accepted sources plus progress
//! status over SSE.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rq_common::config::{self, TomlConfig};
use rq_common::events::EventBus;
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

use rq_acquire::services::{EventBusSink, InFlightRegistry, TopicConsumer};
use rq_acquire::AppState;

const MODULE_NAME: &str = "rq-acquire";

/// How long in-flight runs get to emit their terminal status on shutdown
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Command-line arguments for rq-acquire
#[derive(Parser, Debug)]
#[command(name = "rq-acquire")]
#[command(about = "Research quorum acquisition microservice")]
#[command(version)]
struct Args {
    /// Path to TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override [server] bind_address
    #[arg(short, long, env = "RQ_BIND")]
    bind: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a config file populated with defaults
    InitConfig {
        /// Destination (default: the resolved config path)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing before config loading so its warnings are visible.
    // RUST_LOG wins; otherwise [logging] level replaces the "info" default
    // once the config is read.
    let env_filter = EnvFilter::try_from_default_env().ok();
    let filter_from_env = env_filter.is_some();
    let (filter, filter_handle) =
        reload::Layer::new(env_filter.unwrap_or_else(|| EnvFilter::new("info")));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = config::resolve_config_path(args.config.as_deref(), MODULE_NAME);

    if let Some(Command::InitConfig { output }) = args.command {
        let path = output
            .or(config_path)
            .or_else(|| config::default_config_path(MODULE_NAME))
            .context("No config path given and no home directory found")?;
        config::write_toml_config(&TomlConfig::default(), &path)?;
        println!("Wrote default configuration to {}", path.display());
        return Ok(());
    }

    let mut toml_config = config::load_or_default(config_path.as_deref())?;
    if let Some(bind) = args.bind {
        toml_config.server.bind_address = bind;
    }

    if !filter_from_env {
        if let Err(e) = filter_handle.reload(EnvFilter::new(&toml_config.logging.level)) {
            warn!("Failed to apply configured log level: {}", e);
        }
    }

    info!("Starting {} (Research Quorum Acquisition) microservice", MODULE_NAME);
    info!(
        "Version: {} (git {}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &config_path {
        Some(path) if path.exists() => info!("Config: {}", path.display()),
        _ => info!("Config: compiled defaults"),
    }

    toml_config
        .pipeline
        .validate()
        .context("Invalid [pipeline] configuration")?;

    let api_key = rq_acquire::config::resolve_youtube_api_key(&toml_config);

    let event_bus = EventBus::new(toml_config.server.event_capacity);
    let shutdown = CancellationToken::new();
    let in_flight = InFlightRegistry::new();
    let (inbound_tx, inbound_rx) = mpsc::channel(toml_config.server.queue_depth);

    let orchestrator = rq_acquire::build_orchestrator(&toml_config, api_key, event_bus.clone())
        .context("Failed to initialize acquisition pipeline")?;
    info!(
        quorum_target = orchestrator.parameters().quorum_target,
        search_breadth = orchestrator.parameters().search_breadth,
        "Acquisition pipeline initialized"
    );

    let state = AppState::new(
        event_bus.clone(),
        inbound_tx,
        in_flight.clone(),
        shutdown.clone(),
    );

    let consumer = TopicConsumer::new(
        Arc::new(orchestrator),
        Arc::new(EventBusSink::new(event_bus)),
        in_flight.clone(),
        shutdown.clone(),
    )
    .with_last_error(Arc::clone(&state.last_error));
    let consumer_task = tokio::spawn(consumer.run(inbound_rx));

    let app = rq_acquire::build_router(state).layer(TraceLayer::new_for_http());

    let bind_address = toml_config.server.bind_address.clone();
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_address))?;
    info!("Listening on http://{}", bind_address);
    info!("Health check: http://{}/health", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
        .context("Server error")?;

    // Runs were cancelled through their child tokens; wait briefly for their terminal events
    match consumer_task.await {
        Ok(received) => info!(received, "Topic consumer stopped"),
        Err(e) => warn!(error = %e, "Topic consumer task failed"),
    }

    let drained = tokio::time::timeout(DRAIN_TIMEOUT, async {
        while !in_flight.is_empty().await {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await;
    if drained.is_err() {
        warn!(remaining = in_flight.len().await, "Shutdown with runs still in flight");
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
///
/// Completes on Ctrl+C, SIGTERM, or when `shutdown` is cancelled elsewhere.
/// Cancels `shutdown` before returning so in-flight runs stop and open
/// event streams end; the server waits for those connections to close.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
        _ = shutdown.cancelled() => {
            info!("Shutdown requested");
        },
    }

    shutdown.cancel();
}
