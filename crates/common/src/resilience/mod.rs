//! Resilience primitives for calling an unreliable dependency
//!
//! - **Token bucket**: bounds the request rate while allowing bursts
//! - **Circuit breaker**: stops calling a dependency that keeps failing
//! - **Retry policy**: decides whether and when a failed call is retried
//!
//! Each primitive is independent and generic. They do not know about HTTP or
//! about each other; composition happens in the dispatcher.
//!
//! All time-dependent logic reads time through [`crate::time::Clock`], so the
//! breaker and bucket can be driven by `MockClock` in tests.

pub mod circuit_breaker;
pub mod rate_limiter;
pub mod retry;

pub use circuit_breaker::{
    Admission, CallPermit, CircuitBreaker, CircuitBreakerBuilderWithClock, CircuitBreakerConfig,
    CircuitBreakerConfigBuilder, CircuitBreakerStats, CircuitOpenRejection, CircuitState,
    StateTransition,
};
pub use rate_limiter::{Acquisition, TokenBucket, TokenBucketConfig, TokenBucketConfigBuilder};
pub use retry::{RetryClass, RetryConfig, RetryConfigBuilder, RetryPolicy};
