//! rq-acquire library interface
//!
//! Exposes the pipeline components and the HTTP router for the binary and
//! for integration testing.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod types;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use rq_common::config::TomlConfig;
use rq_common::events::EventBus;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;

use crate::models::QuorumParameters;
use crate::services::{
    EventBusSink, FallbackTranscriptAcquirer, IdentityPool, InFlightRegistry, InboundMessage,
    QuorumOrchestrator, RandomSource, WatchPageTranscriptFetcher, YouTubeCaptionProbe,
    YouTubeSearchClient,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Event bus carrying status updates and video chunks
    pub event_bus: EventBus,
    /// Producer side of the inbound topic queue
    pub inbound_tx: mpsc::Sender<InboundMessage>,
    /// Runs currently in flight, by topic id
    pub in_flight: InFlightRegistry,
    /// Service shutdown; ends open event streams
    pub shutdown: CancellationToken,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(
        event_bus: EventBus,
        inbound_tx: mpsc::Sender<InboundMessage>,
        in_flight: InFlightRegistry,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            event_bus,
            inbound_tx,
            in_flight,
            shutdown,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::topic_routes())
        .merge(api::event_routes())
        .merge(api::health_routes())
        .with_state(state)
}

/// Assemble the production orchestrator from configuration
///
/// Wires the Data API search client, caption probe and watch-page fetcher
/// behind the fallback acquirer, with both sinks publishing on `event_bus`.
pub fn build_orchestrator(
    toml_config: &TomlConfig,
    api_key: Option<String>,
    event_bus: EventBus,
) -> rq_common::Result<QuorumOrchestrator> {
    let youtube = &toml_config.youtube;
    let timeout = Duration::from_secs(youtube.http_timeout_secs);
    let params = QuorumParameters::from(&toml_config.pipeline);
    let random = RandomSource::from_config(toml_config.pipeline.rng_seed);

    let source = YouTubeSearchClient::new(&youtube.api_base_url, api_key.clone(), timeout)
        .map_err(|e| rq_common::Error::Internal(e.to_string()))?;
    let probe = YouTubeCaptionProbe::new(&youtube.api_base_url, api_key, timeout);
    let fetcher = WatchPageTranscriptFetcher::new(&youtube.watch_base_url, timeout)
        .map_err(|e| rq_common::Error::Internal(e.to_string()))?;

    let acquirer = FallbackTranscriptAcquirer::new(
        Arc::new(probe),
        Arc::new(fetcher),
        IdentityPool::browsers(random.clone()),
        params.preferred_languages.clone(),
        params.extraction_deadline,
    )
    .with_probe_timeout(params.probe_timeout);

    let sink = Arc::new(EventBusSink::new(event_bus));

    Ok(QuorumOrchestrator::new(
        Arc::new(source),
        Arc::new(acquirer),
        sink.clone(),
        sink,
        params,
        random,
    ))
}
