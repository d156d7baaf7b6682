//! Inbound topic consumer
//!
//! Pulls raw topic messages off the work queue, decodes them, and starts one
//! orchestrator run per topic on its own task. An in-flight registry keyed by
//! topic id drops duplicates while a run for the same topic is active and
//! lets runs be cancelled individually.

use rq_common::events::{ProgressEvent, ProgressPhase, TopicRequest};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::quorum_orchestrator::QuorumOrchestrator;
use crate::types::StatusSink;

/// Raw message as delivered by the inbound queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Producer-side key, informational only
    pub key: Option<String>,
    /// JSON-encoded [`TopicRequest`]
    pub payload: Vec<u8>,
}

impl InboundMessage {
    pub fn new(key: Option<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            key,
            payload: payload.into(),
        }
    }

    /// Encode a request the way the upstream producer does
    pub fn from_request(request: &TopicRequest) -> Result<Self, serde_json::Error> {
        Ok(Self {
            key: Some(request.topic_id.to_string()),
            payload: serde_json::to_vec(request)?,
        })
    }

    pub fn decode(&self) -> Result<TopicRequest, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}

/// Active runs by topic id
///
/// Cancelling a run leaves its marker in place; the marker is removed only
/// when the run task ends.
#[derive(Clone, Default)]
pub struct InFlightRegistry {
    runs: Arc<RwLock<HashMap<Uuid, CancellationToken>>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a run; `false` if one is already active for `topic_id`
    pub async fn try_register(&self, topic_id: Uuid, token: CancellationToken) -> bool {
        let mut runs = self.runs.write().await;
        if runs.contains_key(&topic_id) {
            return false;
        }
        runs.insert(topic_id, token);
        true
    }

    pub async fn remove(&self, topic_id: Uuid) {
        self.runs.write().await.remove(&topic_id);
    }

    /// Cancel an active run; `false` if none is registered
    pub async fn cancel(&self, topic_id: Uuid) -> bool {
        match self.runs.read().await.get(&topic_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub async fn contains(&self, topic_id: Uuid) -> bool {
        self.runs.read().await.contains_key(&topic_id)
    }

    /// Active topic ids, sorted for stable output
    pub async fn active(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self.runs.read().await.keys().copied().collect();
        ids.sort();
        ids
    }

    pub async fn len(&self) -> usize {
        self.runs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.runs.read().await.is_empty()
    }
}

/// What happened to one inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Run started on its own task
    Started(Uuid),
    /// A run for this topic is already active; message dropped
    Duplicate(Uuid),
    /// Payload was not a valid topic request; message dropped
    Malformed(String),
    /// Service is shutting down; message dropped
    ShuttingDown,
}

/// Work-queue consumer driving the orchestrator
pub struct TopicConsumer {
    orchestrator: Arc<QuorumOrchestrator>,
    status_sink: Arc<dyn StatusSink>,
    in_flight: InFlightRegistry,
    shutdown: CancellationToken,
    last_error: Arc<RwLock<Option<String>>>,
}

impl TopicConsumer {
    /// # Arguments
    /// * `orchestrator` - Shared orchestrator used by every run
    /// * `status_sink` - Used to close out runs whose task panicked
    /// * `in_flight` - Registry shared with the HTTP API
    /// * `shutdown` - Service-wide token; each run gets a child of it
    pub fn new(
        orchestrator: Arc<QuorumOrchestrator>,
        status_sink: Arc<dyn StatusSink>,
        in_flight: InFlightRegistry,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            orchestrator,
            status_sink,
            in_flight,
            shutdown,
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Record the latest failure here (shared with health reporting)
    pub fn with_last_error(mut self, last_error: Arc<RwLock<Option<String>>>) -> Self {
        self.last_error = last_error;
        self
    }

    /// Consume until the queue closes or shutdown is requested
    ///
    /// Returns the number of messages received.
    pub async fn run(self, mut inbound: mpsc::Receiver<InboundMessage>) -> usize {
        tracing::info!("Topic consumer started");
        let mut received = 0usize;

        loop {
            let message = tokio::select! {
                message = inbound.recv() => message,
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Topic consumer stopping: shutdown requested");
                    break;
                }
            };

            let Some(message) = message else {
                tracing::info!("Topic consumer stopping: inbound queue closed");
                break;
            };

            received += 1;
            self.dispatch(message).await;
        }

        received
    }

    /// Decode one message and start its run
    pub async fn dispatch(&self, message: InboundMessage) -> Dispatch {
        if self.shutdown.is_cancelled() {
            return Dispatch::ShuttingDown;
        }

        let request = match message.decode() {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(
                    key = ?message.key,
                    bytes = message.payload.len(),
                    error = %e,
                    "Skipping malformed topic message"
                );
                *self.last_error.write().await = Some(format!("malformed topic message: {}", e));
                return Dispatch::Malformed(e.to_string());
            }
        };

        let topic_id = request.topic_id;
        let token = self.shutdown.child_token();

        if !self.in_flight.try_register(topic_id, token.clone()).await {
            tracing::warn!(
                topic_id = %topic_id,
                "Run already in flight for topic, dropping duplicate request"
            );
            return Dispatch::Duplicate(topic_id);
        }

        tracing::info!(topic_id = %topic_id, query = %request.query, "Topic request accepted");

        let orchestrator = Arc::clone(&self.orchestrator);
        let handle = tokio::spawn(async move { orchestrator.run(request, token).await });

        // Supervisor: owns marker removal and absorbs panics of the run task
        let in_flight = self.in_flight.clone();
        let status_sink = Arc::clone(&self.status_sink);
        let last_error = Arc::clone(&self.last_error);
        tokio::spawn(async move {
            match handle.await {
                Ok(outcome) => {
                    if !outcome.is_success() {
                        *last_error.write().await =
                            Some(format!("topic {}: {}", topic_id, outcome.message()));
                    }
                    tracing::debug!(topic_id = %topic_id, outcome = ?outcome, "Run task finished");
                }
                Err(e) => {
                    tracing::error!(topic_id = %topic_id, error = %e, "Run task aborted");
                    *last_error.write().await = Some(format!("topic {}: run task aborted", topic_id));
                    status_sink.emit(ProgressEvent::new(
                        topic_id,
                        ProgressPhase::Failed,
                        "internal pipeline error",
                    ));
                }
            }
            in_flight.remove(topic_id).await;
        });

        Dispatch::Started(topic_id)
    }
}
