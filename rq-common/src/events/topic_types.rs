//! Topic, transcript and progress payload types
//!
//! Field names are serialized in camelCase to match the upstream topic
//! producer and the downstream analysis consumer.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::video_id::canonical_url;

/// Research request submitted by the topic management service
///
/// Immutable; consumed once per acquisition run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicRequest {
    /// Opaque topic identifier, also the partition key of every output event
    pub topic_id: Uuid,
    /// Free-text research query (e.g. "Budget 2026 for middle class")
    pub query: String,
}

impl TopicRequest {
    pub fn new(topic_id: Uuid, query: impl Into<String>) -> Self {
        Self {
            topic_id,
            query: query.into(),
        }
    }
}

/// Video discovered by a candidate source, not yet confirmed to have usable content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateVideo {
    pub video_id: String,
    pub title: String,
}

impl CandidateVideo {
    pub fn new(video_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            title: title.into(),
        }
    }
}

/// One timestamped piece of a transcript
///
/// Sequences are ordered by `start` (chronological position in the video).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Offset from the start of the video, in seconds (non-negative)
    pub start: f64,
    /// Caption text at this offset
    pub text: String,
}

impl TranscriptSegment {
    pub fn new(start: f64, text: impl Into<String>) -> Self {
        Self {
            start: start.max(0.0),
            text: text.into(),
        }
    }
}

/// Accepted candidate with its transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcquiredVideo {
    pub video_id: String,
    pub title: String,
    /// Canonical watch URL built from `video_id`
    pub video_url: String,
    pub segments: Vec<TranscriptSegment>,
}

impl AcquiredVideo {
    /// Build an acquired video, deriving the canonical URL from the id
    pub fn new(
        video_id: impl Into<String>,
        title: impl Into<String>,
        segments: Vec<TranscriptSegment>,
    ) -> Self {
        let video_id = video_id.into();
        Self {
            video_url: canonical_url(&video_id),
            video_id,
            title: title.into(),
            segments,
        }
    }
}

/// Pipeline phase reported in status updates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProgressPhase {
    /// Candidate discovery
    Searching,
    /// Per-candidate transcript extraction
    Extracting,
    /// Quorum met, handed off to downstream synthesis (terminal)
    Analyzing,
    /// Run ended without a quorum (terminal)
    Failed,
}

impl ProgressPhase {
    /// Terminal phases end a run; exactly one is emitted per topic
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProgressPhase::Analyzing | ProgressPhase::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressPhase::Searching => "SEARCHING",
            ProgressPhase::Extracting => "EXTRACTING",
            ProgressPhase::Analyzing => "ANALYZING",
            ProgressPhase::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for ProgressPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status update for one topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub topic_id: Uuid,
    pub status: ProgressPhase,
    /// Human-readable description of the current step
    pub message: String,
}

impl ProgressEvent {
    pub fn new(topic_id: Uuid, status: ProgressPhase, message: impl Into<String>) -> Self {
        Self {
            topic_id,
            status,
            message: message.into(),
        }
    }
}

/// One accepted video streamed downstream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveredChunk {
    pub topic_id: Uuid,
    pub video_data: AcquiredVideo,
    /// 1-based rank among accepted videos
    pub current_count: usize,
    /// Quorum size for this run
    pub total_videos: usize,
}
