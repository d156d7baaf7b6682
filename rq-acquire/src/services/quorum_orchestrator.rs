//! Quorum acquisition orchestrator
//!
//! Drives one topic through SEARCHING → EXTRACTING → {ANALYZING | FAILED}:
//! discover candidates, acquire transcripts strictly in candidate order until
//! exactly `quorum_target` sources are accepted, and stream every accepted
//! source plus progress status to the sinks.
//!
//! Every run ends with exactly one terminal status (ANALYZING or FAILED).
//! `run` reports its outcome as a value and never returns an error.

use rq_common::events::{
    AcquiredVideo, CandidateVideo, DeliveredChunk, ProgressEvent, ProgressPhase, TopicRequest,
};
use rq_common::video_id;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::pacing::PacingPolicy;
use super::random_source::RandomSource;
use crate::models::{QuorumParameters, RunOutcome, RunState, TopicRun};
use crate::types::{CandidateSource, ResultSink, StatusSink, TranscriptAcquirer};

/// Per-topic quorum acquisition
///
/// Holds no per-run state; one orchestrator serves any number of
/// concurrent runs.
pub struct QuorumOrchestrator {
    source: Arc<dyn CandidateSource>,
    acquirer: Arc<dyn TranscriptAcquirer>,
    result_sink: Arc<dyn ResultSink>,
    status_sink: Arc<dyn StatusSink>,
    params: QuorumParameters,
    pacing: PacingPolicy,
    random: RandomSource,
}

impl QuorumOrchestrator {
    /// Create new orchestrator
    ///
    /// # Arguments
    /// * `source` - Candidate discovery
    /// * `acquirer` - Transcript acquisition with fallback chain
    /// * `result_sink` - Destination for accepted sources
    /// * `status_sink` - Destination for progress updates
    /// * `params` - Quorum and pacing parameters
    /// * `random` - Randomness for pacing jitter
    pub fn new(
        source: Arc<dyn CandidateSource>,
        acquirer: Arc<dyn TranscriptAcquirer>,
        result_sink: Arc<dyn ResultSink>,
        status_sink: Arc<dyn StatusSink>,
        params: QuorumParameters,
        random: RandomSource,
    ) -> Self {
        let pacing = PacingPolicy::new(params.pacing_base, params.pacing_jitter);
        Self {
            source,
            acquirer,
            result_sink,
            status_sink,
            params,
            pacing,
            random,
        }
    }

    pub fn parameters(&self) -> &QuorumParameters {
        &self.params
    }

    /// Execute one acquisition run for `request`
    ///
    /// # Phases
    /// 1. Searching - Request `search_breadth` candidates
    /// 2. Extracting - Acquire in order, pacing between acceptances
    /// 3. Analyzing / Failed - Emit the single terminal status
    pub async fn run(&self, request: TopicRequest, cancel: CancellationToken) -> RunOutcome {
        let mut run = TopicRun::new(request.topic_id, request.query);
        let target = self.params.quorum_target;

        tracing::info!(
            topic_id = %run.topic_id,
            query = %run.query,
            quorum_target = target,
            "Starting acquisition run"
        );

        // Phase 1: Searching
        self.status(
            &run,
            ProgressPhase::Searching,
            format!("discovering sources for \"{}\"", run.query),
        );

        let search = tokio::select! {
            result = self.source.search(&run.query, self.params.search_breadth) => Some(result),
            _ = cancel.cancelled() => None,
        };

        let candidates = match search {
            None => return self.finish(&mut run, RunOutcome::Cancelled { accepted: 0 }),
            Some(Ok(candidates)) => candidates,
            Some(Err(e)) => {
                tracing::error!(topic_id = %run.topic_id, error = %e, "Candidate search failed");
                return self.finish(&mut run, RunOutcome::SourceError(e.to_string()));
            }
        };

        tracing::info!(
            topic_id = %run.topic_id,
            candidates = candidates.len(),
            "Candidate search completed"
        );

        if candidates.len() < target {
            return self.finish(
                &mut run,
                RunOutcome::InsufficientCandidates {
                    needed: target,
                    found: candidates.len(),
                },
            );
        }

        // Phase 2: Extracting
        run.transition_to(RunState::Extracting);

        if let Some(outcome) = self.extract(&mut run, candidates, &cancel).await {
            return self.finish(&mut run, outcome);
        }

        // Phase 3: quorum check
        let outcome = if run.success_count >= target {
            RunOutcome::Completed {
                accepted: run.success_count,
            }
        } else {
            RunOutcome::Exhausted {
                accepted: run.success_count,
                needed: target,
            }
        };
        self.finish(&mut run, outcome)
    }

    /// Walk candidates until quorum; `Some` only when the run was cancelled
    async fn extract(
        &self,
        run: &mut TopicRun,
        candidates: Vec<CandidateVideo>,
        cancel: &CancellationToken,
    ) -> Option<RunOutcome> {
        let target = self.params.quorum_target;
        let mut pause_pending = false;

        for candidate in candidates {
            if run.success_count >= target {
                break;
            }

            if pause_pending {
                if !self.pacing.wait(&self.random, cancel).await {
                    return Some(RunOutcome::Cancelled {
                        accepted: run.success_count,
                    });
                }
                pause_pending = false;
            }

            if cancel.is_cancelled() {
                return Some(RunOutcome::Cancelled {
                    accepted: run.success_count,
                });
            }

            let video_id = video_id::normalize(&candidate.video_id);
            if video_id.is_empty() {
                tracing::warn!(
                    topic_id = %run.topic_id,
                    raw_id = %candidate.video_id,
                    "Rejecting candidate with unusable video id"
                );
                run.record_rejection();
                continue;
            }

            let segments = self.acquirer.acquire(&video_id, cancel).await;

            // Content acquired after cancellation is not delivered
            if cancel.is_cancelled() {
                return Some(RunOutcome::Cancelled {
                    accepted: run.success_count,
                });
            }

            if segments.is_empty() {
                tracing::warn!(
                    topic_id = %run.topic_id,
                    video_id = %video_id,
                    "Rejecting candidate with empty transcript"
                );
                run.record_rejection();
                continue;
            }

            let rank = run.record_success();
            self.result_sink.emit(DeliveredChunk {
                topic_id: run.topic_id,
                video_data: AcquiredVideo::new(video_id, candidate.title, segments),
                current_count: rank,
                total_videos: target,
            });
            self.status(
                run,
                ProgressPhase::Extracting,
                format!("source {} of {} verified", rank, target),
            );

            pause_pending = rank < target;
        }

        None
    }

    /// Emit the terminal status and close out the run
    fn finish(&self, run: &mut TopicRun, outcome: RunOutcome) -> RunOutcome {
        let terminal = if outcome.is_success() {
            RunState::Analyzing
        } else {
            RunState::Failed
        };
        run.transition_to(terminal);

        let message = outcome.message();
        match &outcome {
            RunOutcome::Completed { .. } => tracing::info!(
                topic_id = %run.topic_id,
                accepted = run.success_count,
                rejected = run.rejected_count,
                elapsed_ms = run.elapsed_ms(),
                "Quorum reached"
            ),
            RunOutcome::SourceError(detail) => tracing::error!(
                topic_id = %run.topic_id,
                detail = %detail,
                "Acquisition run failed"
            ),
            _ => tracing::warn!(
                topic_id = %run.topic_id,
                accepted = run.success_count,
                rejected = run.rejected_count,
                elapsed_ms = run.elapsed_ms(),
                reason = %message,
                "Acquisition run failed"
            ),
        }

        self.status(run, outcome.phase(), message);
        outcome
    }

    fn status(&self, run: &TopicRun, phase: ProgressPhase, message: String) {
        self.status_sink
            .emit(ProgressEvent::new(run.topic_id, phase, message));
    }
}
