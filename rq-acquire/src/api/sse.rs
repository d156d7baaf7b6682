//! Server-Sent Events (SSE) for pipeline output streaming
//!
//! Every PipelineEvent is forwarded with its variant name as the SSE event
//! type. The per-topic stream filters on the partition key.

use crate::AppState;
use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures::stream::Stream;
use rq_common::events::PipelineEvent;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Forward bus events until the bus closes or the service shuts down
fn pipeline_event_stream(
    mut rx: broadcast::Receiver<PipelineEvent>,
    topic_filter: Option<Uuid>,
    shutdown: CancellationToken,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        loop {
            let received = tokio::select! {
                received = rx.recv() => received,
                _ = shutdown.cancelled() => {
                    info!("SSE: Service shutting down, ending stream");
                    break;
                }
            };

            let event = match received {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "SSE: Subscriber lagged, events dropped");
                    continue;
                }
                Err(RecvError::Closed) => {
                    info!("SSE: Event bus closed, ending stream");
                    break;
                }
            };

            if topic_filter.is_some_and(|topic_id| event.partition_key() != topic_id) {
                continue;
            }

            let event_type = event.event_type();
            match serde_json::to_string(&event) {
                Ok(event_json) => {
                    debug!("SSE: Broadcasting pipeline event: {}", event_type);
                    yield Ok(Event::default().event(event_type).data(event_json));
                }
                Err(e) => {
                    warn!("SSE: Failed to serialize event {}: {}", event_type, e);
                }
            }
        }
    }
}

fn keep_alive() -> KeepAlive {
    KeepAlive::new()
        .interval(Duration::from_secs(15))
        .text("heartbeat")
}

/// GET /events - every pipeline event
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected to pipeline events");
    Sse::new(pipeline_event_stream(
        state.event_bus.subscribe(),
        None,
        state.shutdown.clone(),
    ))
    .keep_alive(keep_alive())
}

/// GET /topics/{topic_id}/events - events for one topic, in emission order
pub async fn topic_event_stream(
    State(state): State<AppState>,
    Path(topic_id): Path<Uuid>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(topic_id = %topic_id, "New SSE client connected to topic events");
    Sse::new(pipeline_event_stream(
        state.event_bus.subscribe(),
        Some(topic_id),
        state.shutdown.clone(),
    ))
    .keep_alive(keep_alive())
}

/// Build SSE routes
pub fn event_routes() -> Router<AppState> {
    Router::new()
        .route("/events", get(event_stream))
        .route("/topics/:topic_id/events", get(topic_event_stream))
}
