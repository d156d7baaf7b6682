//! Topic submission and run control handlers
//!
//! POST /topics, GET /topics/active, POST /topics/{topic_id}/cancel

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    services::InboundMessage,
    AppState,
};

/// Optional producer key forwarded with the message
pub const MESSAGE_KEY_HEADER: &str = "x-message-key";

/// POST /topics response
#[derive(Debug, Serialize)]
pub struct SubmitTopicResponse {
    pub accepted: bool,
}

/// GET /topics/active response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveTopicsResponse {
    pub topic_ids: Vec<Uuid>,
    pub count: usize,
}

/// POST /topics/{topic_id}/cancel response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelTopicResponse {
    pub topic_id: Uuid,
    pub cancelled: bool,
}

/// POST /topics
///
/// Enqueue the raw body as a topic message. Decoding happens in the
/// consumer, so a malformed body is still accepted here and skipped there.
pub async fn submit_topic(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<SubmitTopicResponse>)> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("Empty topic payload".to_string()));
    }

    let key = headers
        .get(MESSAGE_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let message = InboundMessage::new(key, body.to_vec());

    match state.inbound_tx.try_send(message) {
        Ok(()) => {
            tracing::debug!(bytes = body.len(), "Topic message enqueued");
            Ok((StatusCode::ACCEPTED, Json(SubmitTopicResponse { accepted: true })))
        }
        Err(TrySendError::Full(_)) => {
            tracing::warn!("Topic queue full, rejecting submission");
            Err(ApiError::Unavailable("Topic queue is full".to_string()))
        }
        Err(TrySendError::Closed(_)) => {
            tracing::error!("Topic queue closed, rejecting submission");
            Err(ApiError::Unavailable("Topic queue is closed".to_string()))
        }
    }
}

/// GET /topics/active
pub async fn active_topics(State(state): State<AppState>) -> Json<ActiveTopicsResponse> {
    let topic_ids = state.in_flight.active().await;
    Json(ActiveTopicsResponse {
        count: topic_ids.len(),
        topic_ids,
    })
}

/// POST /topics/{topic_id}/cancel
///
/// The run ends with a FAILED status once it observes the cancellation.
pub async fn cancel_topic(
    State(state): State<AppState>,
    Path(topic_id): Path<Uuid>,
) -> ApiResult<Json<CancelTopicResponse>> {
    if !state.in_flight.cancel(topic_id).await {
        return Err(ApiError::NotFound(format!(
            "No run in flight for topic: {}",
            topic_id
        )));
    }

    tracing::info!(topic_id = %topic_id, "Run cancellation requested");

    Ok(Json(CancelTopicResponse {
        topic_id,
        cancelled: true,
    }))
}

/// Build topic routes
pub fn topic_routes() -> Router<AppState> {
    Router::new()
        .route("/topics", post(submit_topic))
        .route("/topics/active", get(active_topics))
        .route("/topics/:topic_id/cancel", post(cancel_topic))
}
