//! Observability primitives
//!
//! - Request metrics and latency sampling (metrics/)
//!
//! Logging goes through `tracing` directly; this crate never installs a
//! subscriber.

pub mod metrics;

pub use metrics::{MetricsCollector, MetricsSnapshot, DEFAULT_LATENCY_SAMPLE_CAPACITY};
