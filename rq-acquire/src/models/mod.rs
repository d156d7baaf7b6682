//! Data models for rq-acquire
//!
//! - Run state machine and outcomes
//! - Quorum run parameters

pub mod parameters;
pub mod run_state;

pub use parameters::QuorumParameters;
pub use run_state::{RunOutcome, RunState, TopicRun};
