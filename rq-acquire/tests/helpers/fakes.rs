//! Deterministic fakes for the pipeline capability traits

use async_trait::async_trait;
use rq_acquire::types::{
    CandidateSource, ResultSink, SearchError, StatusSink, TranscriptAcquirer,
};
use rq_common::events::{CandidateVideo, DeliveredChunk, ProgressEvent, ProgressPhase, TranscriptSegment};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Candidate source answering from a fixed script
pub enum FakeSource {
    Candidates(Vec<CandidateVideo>),
    Failing,
    /// Never answers (for cancellation tests)
    Hanging,
}

impl FakeSource {
    /// `count` candidates with distinct 11-character ids
    pub fn with_count(count: usize) -> Self {
        FakeSource::Candidates((0..count).map(candidate).collect())
    }

    pub fn with_ids(ids: &[&str]) -> Self {
        FakeSource::Candidates(
            ids.iter()
                .map(|id| CandidateVideo::new(*id, format!("Video {}", id)))
                .collect(),
        )
    }
}

/// Candidate `n` of a fake search: id `vid0000000n` style, 11 characters
pub fn candidate(n: usize) -> CandidateVideo {
    CandidateVideo::new(video_id(n), format!("Source {}", n))
}

pub fn video_id(n: usize) -> String {
    format!("vid{:08}", n)
}

#[async_trait]
impl CandidateSource for FakeSource {
    async fn search(
        &self,
        _query: &str,
        max_results: usize,
    ) -> Result<Vec<CandidateVideo>, SearchError> {
        match self {
            FakeSource::Candidates(list) => Ok(list.iter().take(max_results).cloned().collect()),
            FakeSource::Failing => Err(SearchError::Api(403, "quotaExceeded".to_string())),
            FakeSource::Hanging => futures::future::pending().await,
        }
    }
}

/// Acquirer returning one real-looking segment per video unless scripted otherwise
#[derive(Default)]
pub struct ScriptedAcquirer {
    empty_for: HashSet<String>,
    /// Block until cancelled for these ids, then return content anyway
    hang_for: HashSet<String>,
    calls: Mutex<Vec<String>>,
    in_progress: AtomicUsize,
    max_in_progress: AtomicUsize,
}

impl ScriptedAcquirer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn empty_for(mut self, ids: &[String]) -> Self {
        self.empty_for.extend(ids.iter().cloned());
        self
    }

    pub fn hang_for(mut self, ids: &[String]) -> Self {
        self.hang_for.extend(ids.iter().cloned());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_in_progress(&self) -> usize {
        self.max_in_progress.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranscriptAcquirer for ScriptedAcquirer {
    async fn acquire(&self, video_id: &str, cancel: &CancellationToken) -> Vec<TranscriptSegment> {
        self.calls.lock().unwrap().push(video_id.to_string());
        let now = self.in_progress.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_progress.fetch_max(now, Ordering::SeqCst);

        if self.hang_for.contains(video_id) {
            cancel.cancelled().await;
        }
        tokio::task::yield_now().await;

        self.in_progress.fetch_sub(1, Ordering::SeqCst);

        if self.empty_for.contains(video_id) {
            return Vec::new();
        }
        vec![TranscriptSegment::new(0.0, format!("transcript of {}", video_id))]
    }
}

/// Everything a run emitted, in one shared order
#[derive(Debug, Clone, PartialEq)]
pub enum Emitted {
    Chunk(DeliveredChunk),
    Status(ProgressEvent),
}

/// Sink implementing both traits over one ordered log
#[derive(Default)]
pub struct RecordingSink {
    log: Mutex<Vec<Emitted>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Emitted> {
        self.log.lock().unwrap().clone()
    }

    pub fn chunks(&self) -> Vec<DeliveredChunk> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Emitted::Chunk(chunk) => Some(chunk),
                Emitted::Status(_) => None,
            })
            .collect()
    }

    pub fn statuses(&self) -> Vec<ProgressEvent> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Emitted::Status(status) => Some(status),
                Emitted::Chunk(_) => None,
            })
            .collect()
    }

    pub fn terminal_statuses(&self) -> Vec<ProgressEvent> {
        self.statuses()
            .into_iter()
            .filter(|s| s.status.is_terminal())
            .collect()
    }

    pub fn count_phase(&self, phase: ProgressPhase) -> usize {
        self.statuses().iter().filter(|s| s.status == phase).count()
    }
}

impl ResultSink for RecordingSink {
    fn emit(&self, chunk: DeliveredChunk) {
        self.log.lock().unwrap().push(Emitted::Chunk(chunk));
    }
}

impl StatusSink for RecordingSink {
    fn emit(&self, event: ProgressEvent) {
        self.log.lock().unwrap().push(Emitted::Status(event));
    }
}
