//! Capability traits and error types for the acquisition pipeline
//!
//! Every external collaborator of the orchestrator is a trait object passed
//! at construction time, so runs can be driven by deterministic fakes:
//! - **CandidateSource:** query → ordered candidate videos
//! - **TranscriptAcquirer:** video id → non-empty transcript (fallback chain)
//! - **CaptionProbe / TranscriptFetcher:** the two network stages inside the
//!   production acquirer
//! - **ResultSink / StatusSink:** ordered, fire-and-forget event emission

use async_trait::async_trait;
use rq_common::events::{CandidateVideo, DeliveredChunk, ProgressEvent, TranscriptSegment};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::services::identity::ClientIdentity;

// ============================================================================
// Candidate discovery
// ============================================================================

/// Candidate discovery errors
#[derive(Debug, Error)]
pub enum SearchError {
    /// Transport failure reaching the search API
    #[error("Network error: {0}")]
    Network(String),

    /// Search API answered with a non-success status
    #[error("API error {0}: {1}")]
    Api(u16, String),

    /// Response body could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),

    /// Required configuration is missing (e.g. API key)
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Ordered source of candidate videos for a query
///
/// Returns an empty list (never an error) when the query has no results;
/// transport problems surface as `SearchError`.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<CandidateVideo>, SearchError>;
}

// ============================================================================
// Transcript acquisition
// ============================================================================

/// Per-candidate transcript acquisition with an internal fallback chain
///
/// Implementations never fail and never return an empty list.
#[async_trait]
pub trait TranscriptAcquirer: Send + Sync {
    async fn acquire(&self, video_id: &str, cancel: &CancellationToken) -> Vec<TranscriptSegment>;
}

/// Result of the caption capability probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Metadata lists at least one caption track
    HasCaptions,
    /// Metadata cleanly reports no caption tracks
    NoCaptions,
    /// Probe could not tell (transport, status or parse problem)
    Unknown,
}

impl ProbeOutcome {
    /// Optimistic reading: only a clean "no captions" answer skips extraction
    pub fn worth_fetching(&self) -> bool {
        !matches!(self, ProbeOutcome::NoCaptions)
    }
}

/// Cheap pre-check for caption availability
#[async_trait]
pub trait CaptionProbe: Send + Sync {
    async fn probe(&self, video_id: &str) -> ProbeOutcome;
}

/// Primary transcript extraction errors
#[derive(Debug, Error)]
pub enum FetchError {
    /// Remote service refused the request (HTTP 429 / 403)
    #[error("Blocked by remote service (status {0})")]
    Blocked(u16),

    /// Transport failure
    #[error("Network error: {0}")]
    Network(String),

    /// Unexpected HTTP status
    #[error("HTTP error {0}")]
    Http(u16),

    /// Video exposes no caption tracks at all
    #[error("No caption tracks available")]
    NoCaptionTracks,

    /// Tracks exist, but none in a preferred language
    #[error("No caption track in preferred languages {0:?}")]
    LanguageUnavailable(Vec<String>),

    /// Track fetched but contained no text
    #[error("Transcript content empty")]
    EmptyTranscript,

    /// Page or track could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Real transcript extraction for one video
#[async_trait]
pub trait TranscriptFetcher: Send + Sync {
    /// Fetch the first available track among `languages` (priority order)
    async fn fetch(
        &self,
        video_id: &str,
        languages: &[String],
        identity: &ClientIdentity,
    ) -> Result<Vec<TranscriptSegment>, FetchError>;
}

// ============================================================================
// Output sinks
// ============================================================================

/// Downstream destination for accepted videos
///
/// `emit` returns immediately; delivery failures are logged by the sink and
/// never reported back to the orchestrator.
pub trait ResultSink: Send + Sync {
    fn emit(&self, chunk: DeliveredChunk);
}

/// Downstream destination for progress updates
///
/// Same delivery contract and partition key as [`ResultSink`].
pub trait StatusSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}
