//! HTTP API handlers for rq-acquire
//!
//! REST routes for topic submission and run control, SSE for pipeline
//! output, and a health endpoint.

pub mod health;
pub mod sse;
pub mod topics;

pub use health::health_routes;
pub use sse::{event_routes, event_stream, topic_event_stream};
pub use topics::topic_routes;
