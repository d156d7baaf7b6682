//! Acquisition run state machine
//!
//! A run progresses SEARCHING → EXTRACTING → {ANALYZING | FAILED}.
//! SEARCHING may also go straight to FAILED when discovery comes up short
//! or the run is cancelled.

use chrono::{DateTime, Utc};
use rq_common::events::ProgressPhase;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Orchestrator state for one topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunState {
    /// Querying the candidate source
    Searching,
    /// Acquiring transcripts candidate by candidate
    Extracting,
    /// Quorum reached (terminal)
    Analyzing,
    /// Run ended without quorum (terminal)
    Failed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Analyzing | RunState::Failed)
    }

    /// Whether `next` is a legal successor of `self`
    pub fn can_transition_to(&self, next: RunState) -> bool {
        matches!(
            (self, next),
            (RunState::Searching, RunState::Extracting)
                | (RunState::Searching, RunState::Failed)
                | (RunState::Extracting, RunState::Analyzing)
                | (RunState::Extracting, RunState::Failed)
        )
    }
}

/// In-memory state of one acquisition run
///
/// Discarded when the run ends; nothing carries over between topics.
#[derive(Debug, Clone)]
pub struct TopicRun {
    pub topic_id: Uuid,
    pub query: String,
    pub state: RunState,
    /// Accepted sources so far; never exceeds the quorum target
    pub success_count: usize,
    /// Candidates rejected (unusable id or empty transcript)
    pub rejected_count: usize,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl TopicRun {
    pub fn new(topic_id: Uuid, query: impl Into<String>) -> Self {
        Self {
            topic_id,
            query: query.into(),
            state: RunState::Searching,
            success_count: 0,
            rejected_count: 0,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Transition to new state
    ///
    /// Illegal transitions are logged and applied anyway; the orchestrator
    /// only requests legal ones.
    pub fn transition_to(&mut self, new_state: RunState) {
        if !self.state.can_transition_to(new_state) {
            tracing::warn!(
                topic_id = %self.topic_id,
                from = ?self.state,
                to = ?new_state,
                "Unexpected run state transition"
            );
        }

        tracing::debug!(
            topic_id = %self.topic_id,
            from = ?self.state,
            to = ?new_state,
            "Run state transition"
        );
        self.state = new_state;

        if new_state.is_terminal() {
            self.ended_at = Some(Utc::now());
        }
    }

    /// Record one accepted source, returning its 1-based rank
    pub fn record_success(&mut self) -> usize {
        self.success_count += 1;
        self.success_count
    }

    pub fn record_rejection(&mut self) {
        self.rejected_count += 1;
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn elapsed_ms(&self) -> i64 {
        (self.ended_at.unwrap_or_else(Utc::now) - self.started_at).num_milliseconds()
    }
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Quorum reached; `accepted` sources were delivered
    Completed { accepted: usize },
    /// Candidate source returned fewer candidates than the quorum target
    InsufficientCandidates { needed: usize, found: usize },
    /// Every candidate was tried without reaching quorum
    Exhausted { accepted: usize, needed: usize },
    /// Run cancelled before completion
    Cancelled { accepted: usize },
    /// Candidate source failed
    SourceError(String),
}

impl RunOutcome {
    /// Terminal phase emitted for this outcome
    pub fn phase(&self) -> ProgressPhase {
        match self {
            RunOutcome::Completed { .. } => ProgressPhase::Analyzing,
            _ => ProgressPhase::Failed,
        }
    }

    /// Terminal status message
    pub fn message(&self) -> String {
        match self {
            RunOutcome::Completed { accepted } => {
                format!("synthesizing consensus from {} sources", accepted)
            }
            RunOutcome::InsufficientCandidates { needed, found } => {
                format!("insufficient sources found: need {}, found {}", needed, found)
            }
            RunOutcome::Exhausted { accepted, needed } => {
                format!(
                    "candidate list exhausted: verified {} of {} sources",
                    accepted, needed
                )
            }
            RunOutcome::Cancelled { .. } => "pipeline run cancelled".to_string(),
            RunOutcome::SourceError(_) => "internal pipeline error".to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Completed { .. })
    }
}
