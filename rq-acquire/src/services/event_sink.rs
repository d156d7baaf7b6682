//! EventBus-backed result and status sinks
//!
//! Both sinks write into the same broadcast channel, so chunks and status
//! updates for a topic reach subscribers in emission order. Emission never
//! blocks and never fails the run.

use rq_common::events::{DeliveredChunk, EventBus, PipelineEvent, ProgressEvent};

use crate::types::{ResultSink, StatusSink};

/// Sink publishing pipeline output on the shared [`EventBus`]
#[derive(Clone)]
pub struct EventBusSink {
    event_bus: EventBus,
}

impl EventBusSink {
    pub fn new(event_bus: EventBus) -> Self {
        Self { event_bus }
    }

    fn publish(&self, event: PipelineEvent) {
        let topic_id = event.partition_key();
        let event_type = event.event_type();

        if let Err(e) = self.event_bus.emit(event) {
            tracing::warn!(
                topic_id = %topic_id,
                event_type = event_type,
                "No subscribers for pipeline event: {}",
                e
            );
        }
    }
}

impl ResultSink for EventBusSink {
    fn emit(&self, chunk: DeliveredChunk) {
        tracing::info!(
            topic_id = %chunk.topic_id,
            video_id = %chunk.video_data.video_id,
            current = chunk.current_count,
            total = chunk.total_videos,
            "Streaming video chunk"
        );
        self.publish(PipelineEvent::VideoChunk(chunk));
    }
}

impl StatusSink for EventBusSink {
    fn emit(&self, event: ProgressEvent) {
        tracing::debug!(
            topic_id = %event.topic_id,
            status = %event.status,
            message = %event.message,
            "Status update"
        );
        self.publish(PipelineEvent::StatusUpdate(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rq_common::events::{AcquiredVideo, ProgressPhase, TranscriptSegment};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_chunks_and_status_share_one_ordered_stream() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let sink = EventBusSink::new(bus);
        let topic_id = Uuid::new_v4();

        ResultSink::emit(
            &sink,
            DeliveredChunk {
                topic_id,
                video_data: AcquiredVideo::new(
                    "aaaaaaaaaaa",
                    "t",
                    vec![TranscriptSegment::new(0.0, "x")],
                ),
                current_count: 1,
                total_videos: 3,
            },
        );
        StatusSink::emit(
            &sink,
            ProgressEvent::new(topic_id, ProgressPhase::Extracting, "source 1 of 3 verified"),
        );

        assert!(matches!(rx.recv().await.unwrap(), PipelineEvent::VideoChunk(c) if c.current_count == 1));
        assert!(matches!(rx.recv().await.unwrap(), PipelineEvent::StatusUpdate(e) if e.topic_id == topic_id));
    }

    #[test]
    fn test_emit_without_subscribers_does_not_panic() {
        let sink = EventBusSink::new(EventBus::new(4));
        StatusSink::emit(
            &sink,
            ProgressEvent::new(Uuid::new_v4(), ProgressPhase::Failed, "nobody listening"),
        );
    }
}
