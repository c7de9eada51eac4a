//! Generic building blocks shared across Tollgate crates.
//!
//! Nothing in this crate knows about HTTP or about the request types of the
//! client; every primitive is generic and independently testable.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: configuration errors, clock abstraction
//! - `runtime`: async infrastructure (resilience, sync, observability)
//! - `observability`: tracing instrumentation (implied by `runtime`)

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod error;
#[cfg(feature = "foundation")]
pub mod time;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod observability;
#[cfg(feature = "runtime")]
pub mod resilience;
#[cfg(feature = "runtime")]
pub mod sync;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "foundation")]
pub use error::{ConfigError, ConfigResult};
#[cfg(feature = "runtime")]
pub use observability::{MetricsCollector, MetricsSnapshot};
#[cfg(feature = "runtime")]
pub use resilience::{
    Acquisition, Admission, CallPermit, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats,
    CircuitOpenRejection, CircuitState, RetryClass, RetryConfig, RetryPolicy, StateTransition, TokenBucket,
    TokenBucketConfig,
};
#[cfg(feature = "runtime")]
pub use sync::{Dequeued, PriorityRequestQueue, PushError, QueueItem};
#[cfg(feature = "runtime")]
pub use time::TokioClock;
#[cfg(feature = "foundation")]
pub use time::{Clock, MockClock, SystemClock};
