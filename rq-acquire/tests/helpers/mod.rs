//! Test Helper Utilities
//!
//! Shared fakes and builders for testing rq-acquire

#![allow(dead_code)]

pub mod fakes;

pub use fakes::{candidate, video_id, Emitted, FakeSource, RecordingSink, ScriptedAcquirer};

use rq_acquire::models::QuorumParameters;
use rq_acquire::services::{QuorumOrchestrator, RandomSource};
use std::sync::Arc;
use std::time::Duration;

/// Parameters with the default quorum shape and no pacing
pub fn fast_params() -> QuorumParameters {
    QuorumParameters {
        pacing_base: Duration::ZERO,
        pacing_jitter: Duration::ZERO,
        ..QuorumParameters::default()
    }
}

/// Orchestrator over fakes, with `sink` receiving both chunks and statuses
pub fn orchestrator_with(
    source: FakeSource,
    acquirer: Arc<ScriptedAcquirer>,
    sink: Arc<RecordingSink>,
    params: QuorumParameters,
) -> QuorumOrchestrator {
    QuorumOrchestrator::new(
        Arc::new(source),
        acquirer,
        sink.clone(),
        sink,
        params,
        RandomSource::seeded(7),
    )
}
