//! Outcome classification
//!
//! Maps a terminal-or-not error onto the two decisions the dispatcher makes
//! after every attempt: whether to retry, and how the attempt counts against
//! the circuit breaker.

use tollgate_common::RetryClass;
use tollgate_domain::{ApiResponse, Result, TollgateError};

/// How an attempt's outcome is reported to the circuit breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerVerdict {
    Success,
    Failure,
    /// The dependency answered correctly; the permit is released without
    /// touching failure counters
    Neutral,
}

/// Retry class for a failed attempt
///
/// Network errors, timeouts and 5xx responses are retryable. A 429 carries
/// the server's `Retry-After` hint. Everything else, including other 4xx
/// responses and errors produced by the dispatcher itself, is final.
pub fn retry_class(err: &TollgateError) -> RetryClass {
    match err {
        TollgateError::Network(_) | TollgateError::Timeout(_) | TollgateError::Server { .. } => {
            RetryClass::Retryable
        }
        TollgateError::RateLimited { retry_after } => {
            RetryClass::RateLimited { retry_after: *retry_after }
        }
        TollgateError::Client { .. }
        | TollgateError::CircuitOpen
        | TollgateError::QueueFull { .. }
        | TollgateError::DeadlineExceeded
        | TollgateError::Serialization(_)
        | TollgateError::Config(_)
        | TollgateError::Shutdown => RetryClass::NonRetryable,
    }
}

/// Breaker accounting for one attempt
///
/// Only failures that say something about the dependency's health count.
/// 429 responses are neutral unless `count_rate_limit_as_failure` is set.
pub fn breaker_verdict(
    outcome: &Result<ApiResponse>,
    count_rate_limit_as_failure: bool,
) -> BreakerVerdict {
    match outcome {
        Ok(_) => BreakerVerdict::Success,
        Err(TollgateError::Network(_) | TollgateError::Timeout(_) | TollgateError::Server { .. }) => {
            BreakerVerdict::Failure
        }
        Err(TollgateError::RateLimited { .. }) if count_rate_limit_as_failure => {
            BreakerVerdict::Failure
        }
        Err(_) => BreakerVerdict::Neutral,
    }
}
