//! # Research Quorum Common Library
//!
//! Shared code for the research-quorum services including:
//! - Topic, transcript and progress data model
//! - Pipeline event types and the ordered EventBus
//! - TOML configuration loading
//! - Video identifier normalization

pub mod config;
pub mod error;
pub mod events;
pub mod video_id;

pub use error::{Error, Result};
