//! Quorum run parameters
//!
//! Runtime form of `[pipeline]` configuration: millisecond and second
//! counts become `Duration`s once, at startup.

use rq_common::config::PipelineConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Parameters shared by every run of one orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuorumParameters {
    /// Candidates requested from the source (default: 8)
    pub search_breadth: usize,

    /// Accepted sources that complete a run (default: 3)
    pub quorum_target: usize,

    /// Fixed part of the pause between acceptances (default: 7s)
    pub pacing_base: Duration,

    /// Upper bound of the random part of the pause (default: 3s)
    pub pacing_jitter: Duration,

    /// Budget for one primary transcript extraction (default: 25s)
    pub extraction_deadline: Duration,

    /// Budget for the caption probe (default: 10s)
    pub probe_timeout: Duration,

    /// Caption languages in priority order
    pub preferred_languages: Vec<String>,
}

impl From<&PipelineConfig> for QuorumParameters {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            search_breadth: config.search_breadth,
            quorum_target: config.quorum_target,
            pacing_base: Duration::from_millis(config.pacing_base_ms),
            pacing_jitter: Duration::from_millis(config.pacing_jitter_ms),
            extraction_deadline: Duration::from_secs(config.extraction_deadline_secs),
            probe_timeout: Duration::from_secs(config.probe_timeout_secs),
            preferred_languages: config.preferred_languages.clone(),
        }
    }
}

impl Default for QuorumParameters {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}
