//! Service modules for the acquisition pipeline
//!
//! - Discovery: YouTube Data API search client
//! - Acquisition: caption probe, watch-page fetcher, fallback acquirer
//! - Orchestration: quorum orchestrator, pacing, topic consumer
//! - Output: EventBus-backed sinks

pub mod caption_probe;
pub mod event_sink;
pub mod identity;
pub mod pacing;
pub mod quorum_orchestrator;
pub mod random_source;
pub mod topic_consumer;
pub mod transcript_acquirer;
pub mod transcript_scraper;
pub mod youtube_search;

pub use caption_probe::YouTubeCaptionProbe;
pub use event_sink::EventBusSink;
pub use identity::{ClientIdentity, IdentityPool};
pub use pacing::PacingPolicy;
pub use quorum_orchestrator::QuorumOrchestrator;
pub use random_source::RandomSource;
pub use topic_consumer::{Dispatch, InFlightRegistry, InboundMessage, TopicConsumer};
pub use transcript_acquirer::{fallback_transcript, FallbackTranscriptAcquirer};
pub use transcript_scraper::WatchPageTranscriptFetcher;
pub use youtube_search::YouTubeSearchClient;
