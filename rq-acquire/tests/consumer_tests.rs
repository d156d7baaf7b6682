//! Topic Consumer Integration Tests
//!
//! Inbound decoding, duplicate suppression, cancellation and panic isolation.

mod helpers;

use async_trait::async_trait;
use helpers::{fast_params, orchestrator_with, FakeSource, RecordingSink, ScriptedAcquirer};
use rq_acquire::services::{
    Dispatch, InFlightRegistry, InboundMessage, QuorumOrchestrator, RandomSource, TopicConsumer,
};
use rq_acquire::types::TranscriptAcquirer;
use rq_common::events::{ProgressPhase, TopicRequest, TranscriptSegment};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

struct Harness {
    consumer: TopicConsumer,
    sink: Arc<RecordingSink>,
    in_flight: InFlightRegistry,
    shutdown: CancellationToken,
}

fn harness(source: FakeSource) -> Harness {
    let sink = Arc::new(RecordingSink::new());
    let orchestrator = orchestrator_with(
        source,
        Arc::new(ScriptedAcquirer::new()),
        sink.clone(),
        fast_params(),
    );
    harness_with(orchestrator, sink)
}

fn harness_with(orchestrator: QuorumOrchestrator, sink: Arc<RecordingSink>) -> Harness {
    let in_flight = InFlightRegistry::new();
    let shutdown = CancellationToken::new();
    let consumer = TopicConsumer::new(
        Arc::new(orchestrator),
        sink.clone(),
        in_flight.clone(),
        shutdown.clone(),
    );
    Harness {
        consumer,
        sink,
        in_flight,
        shutdown,
    }
}

fn message(request: &TopicRequest) -> InboundMessage {
    InboundMessage::from_request(request).unwrap()
}

/// Poll `condition` until it holds or two seconds pass
async fn eventually<F, Fut>(mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test]
async fn test_valid_message_starts_run_to_completion() {
    let h = harness(FakeSource::with_count(8));
    let request = TopicRequest::new(Uuid::new_v4(), "Budget 2026 for middle class");

    let dispatch = h.consumer.dispatch(message(&request)).await;
    assert_eq!(dispatch, Dispatch::Started(request.topic_id));

    let sink = h.sink.clone();
    assert!(eventually(|| {
        let sink = sink.clone();
        async move { sink.count_phase(ProgressPhase::Analyzing) == 1 }
    })
    .await);

    // Marker removed once the run ends
    let in_flight = h.in_flight.clone();
    assert!(eventually(|| {
        let in_flight = in_flight.clone();
        async move { in_flight.is_empty().await }
    })
    .await);
    assert_eq!(h.sink.chunks().len(), 3);
}

#[tokio::test]
async fn test_duplicate_topic_dropped_while_in_flight() {
    // Given: a run that never gets past search
    let h = harness(FakeSource::Hanging);
    let request = TopicRequest::new(Uuid::new_v4(), "q");

    // When: the same topic arrives twice
    let first = h.consumer.dispatch(message(&request)).await;
    let second = h.consumer.dispatch(message(&request)).await;

    // Then: only one run is active
    assert_eq!(first, Dispatch::Started(request.topic_id));
    assert_eq!(second, Dispatch::Duplicate(request.topic_id));
    assert_eq!(h.in_flight.active().await, vec![request.topic_id]);

    // And: after cancellation ends the run, the topic is accepted again
    assert!(h.in_flight.cancel(request.topic_id).await);
    let in_flight = h.in_flight.clone();
    assert!(eventually(|| {
        let in_flight = in_flight.clone();
        async move { in_flight.is_empty().await }
    })
    .await);

    let terminal = h.sink.terminal_statuses();
    assert_eq!(terminal.len(), 1);
    assert_eq!(terminal[0].message, "pipeline run cancelled");

    let third = h.consumer.dispatch(message(&request)).await;
    assert_eq!(third, Dispatch::Started(request.topic_id));
    h.shutdown.cancel();
}

#[tokio::test]
async fn test_different_topics_run_concurrently() {
    let h = harness(FakeSource::Hanging);
    let a = TopicRequest::new(Uuid::new_v4(), "a");
    let b = TopicRequest::new(Uuid::new_v4(), "b");

    assert!(matches!(h.consumer.dispatch(message(&a)).await, Dispatch::Started(_)));
    assert!(matches!(h.consumer.dispatch(message(&b)).await, Dispatch::Started(_)));
    assert_eq!(h.in_flight.len().await, 2);

    h.shutdown.cancel();
}

#[tokio::test]
async fn test_malformed_message_skipped_and_loop_continues() {
    let h = harness(FakeSource::with_count(8));
    let sink = h.sink.clone();
    let (tx, rx) = mpsc::channel(8);
    let request = TopicRequest::new(Uuid::new_v4(), "after garbage");

    tx.send(InboundMessage::new(Some("k".to_string()), "{not json"))
        .await
        .unwrap();
    tx.send(message(&request)).await.unwrap();
    drop(tx);

    let received = tokio::time::timeout(Duration::from_secs(5), h.consumer.run(rx))
        .await
        .unwrap();
    assert_eq!(received, 2);

    assert!(eventually(|| {
        let sink = sink.clone();
        async move { sink.count_phase(ProgressPhase::Analyzing) == 1 }
    })
    .await);
    assert!(sink.statuses().iter().all(|s| s.topic_id == request.topic_id));
}

#[tokio::test]
async fn test_malformed_dispatch_result() {
    let h = harness(FakeSource::with_count(8));
    let dispatch = h
        .consumer
        .dispatch(InboundMessage::new(None, r#"{"query":"missing id"}"#))
        .await;
    assert!(matches!(dispatch, Dispatch::Malformed(_)));
    assert!(h.in_flight.is_empty().await);
}

#[tokio::test]
async fn test_shutdown_cancels_runs_and_stops_loop() {
    let h = harness(FakeSource::Hanging);
    let sink = h.sink.clone();
    let in_flight = h.in_flight.clone();
    let shutdown = h.shutdown.clone();
    let (tx, rx) = mpsc::channel(8);
    let request = TopicRequest::new(Uuid::new_v4(), "q");

    let consumer_task = tokio::spawn(h.consumer.run(rx));
    tx.send(message(&request)).await.unwrap();

    let registry = in_flight.clone();
    assert!(eventually(|| {
        let registry = registry.clone();
        async move { !registry.is_empty().await }
    })
    .await);

    shutdown.cancel();
    let received = tokio::time::timeout(Duration::from_secs(5), consumer_task)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(received, 1);

    assert!(eventually(|| {
        let sink = sink.clone();
        async move { sink.count_phase(ProgressPhase::Failed) == 1 }
    })
    .await);
    drop(tx);
}

#[tokio::test]
async fn test_dispatch_after_shutdown_starts_nothing() {
    // Given: the service is already shutting down
    let h = harness(FakeSource::with_count(8));
    h.shutdown.cancel();
    let request = TopicRequest::new(Uuid::new_v4(), "late arrival");

    // When
    let dispatch = h.consumer.dispatch(message(&request)).await;

    // Then: no run is registered and nothing is emitted
    assert_eq!(dispatch, Dispatch::ShuttingDown);
    assert!(h.in_flight.is_empty().await);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.sink.statuses().is_empty());
}

struct PanickingAcquirer;

#[async_trait]
impl TranscriptAcquirer for PanickingAcquirer {
    async fn acquire(&self, _video_id: &str, _cancel: &CancellationToken) -> Vec<TranscriptSegment> {
        panic!("acquirer exploded");
    }
}

#[tokio::test]
async fn test_panicking_run_reports_internal_error_and_frees_topic() {
    // Given: an acquirer that panics on first use
    let sink = Arc::new(RecordingSink::new());
    let orchestrator = QuorumOrchestrator::new(
        Arc::new(FakeSource::with_count(8)),
        Arc::new(PanickingAcquirer),
        sink.clone(),
        sink.clone(),
        fast_params(),
        RandomSource::seeded(1),
    );
    let h = harness_with(orchestrator, sink.clone());
    let request = TopicRequest::new(Uuid::new_v4(), "q");

    // When
    assert_eq!(
        h.consumer.dispatch(message(&request)).await,
        Dispatch::Started(request.topic_id)
    );

    // Then: the supervisor closes the run with FAILED and frees the topic
    assert!(eventually(|| {
        let sink = sink.clone();
        async move { sink.count_phase(ProgressPhase::Failed) == 1 }
    })
    .await);
    assert_eq!(sink.terminal_statuses()[0].message, "internal pipeline error");

    let in_flight = h.in_flight.clone();
    assert!(eventually(|| {
        let in_flight = in_flight.clone();
        async move { in_flight.is_empty().await }
    })
    .await);
}
