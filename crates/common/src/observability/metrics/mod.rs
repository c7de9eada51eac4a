//! Metrics data model
//!
//! Counters and latency samples for outbound requests. Only the data model
//! lives here; exporting to a sink is left to the embedding application,
//! which pulls [`MetricsSnapshot`] values and serializes them with `serde`.

pub mod collector;
mod reservoir;
pub mod snapshot;

pub use collector::{MetricsCollector, DEFAULT_LATENCY_SAMPLE_CAPACITY};
pub use snapshot::MetricsSnapshot;
