//! Event types for the research-quorum event system
//!
//! Provides the pipeline event envelope and the EventBus that carries it.
//! Status updates and video chunks travel on the same ordered channel so
//! their interleaving per topic is preserved end to end.

mod topic_types;

pub use topic_types::{
    AcquiredVideo, CandidateVideo, DeliveredChunk, ProgressEvent, ProgressPhase, TopicRequest,
    TranscriptSegment,
};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Pipeline event envelope
///
/// Events are broadcast via EventBus and can be serialized for SSE transmission.
/// Every variant is keyed by its topic id (see [`PipelineEvent::partition_key`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PipelineEvent {
    /// Pipeline status changed for a topic
    ///
    /// Triggers:
    /// - SSE: Update topic progress display
    /// - Topic management: Record pipeline phase
    StatusUpdate(ProgressEvent),

    /// Accepted video streamed to downstream analysis
    ///
    /// Triggers:
    /// - Analysis service: Begin per-source synthesis
    VideoChunk(DeliveredChunk),
}

impl PipelineEvent {
    /// Ordering key: all events for one topic share it
    pub fn partition_key(&self) -> Uuid {
        match self {
            PipelineEvent::StatusUpdate(event) => event.topic_id,
            PipelineEvent::VideoChunk(chunk) => chunk.topic_id,
        }
    }

    /// Event type name for SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            PipelineEvent::StatusUpdate(_) => "StatusUpdate",
            PipelineEvent::VideoChunk(_) => "VideoChunk",
        }
    }

    /// True for the single ANALYZING or FAILED status that ends a run
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineEvent::StatusUpdate(event) if event.status.is_terminal())
    }
}

impl From<ProgressEvent> for PipelineEvent {
    fn from(event: ProgressEvent) -> Self {
        PipelineEvent::StatusUpdate(event)
    }
}

impl From<DeliveredChunk> for PipelineEvent {
    fn from(chunk: DeliveredChunk) -> Self {
        PipelineEvent::VideoChunk(chunk)
    }
}

/// Central event distribution bus
///
/// A single `tokio::sync::broadcast` channel: `emit` is synchronous, so events
/// sent from one task are received by every subscriber in emission order.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PipelineEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before slow subscribers lag
    ///
    /// # Examples
    ///
    /// ```
    /// use rq_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(1000);
    /// assert_eq!(event_bus.capacity(), 1000);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: PipelineEvent,
    ) -> Result<usize, broadcast::error::SendError<PipelineEvent>> {
        self.tx.send(event)
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
