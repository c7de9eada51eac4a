//! Integration tests for resilience module
//!
//! Drives the token bucket, circuit breaker and retry policy together through
//! failure and recovery scenarios with a mock clock.

#![cfg(feature = "runtime")]

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tollgate_common::resilience::{
    Acquisition, CircuitBreaker, CircuitBreakerConfig, CircuitState, RetryClass, RetryConfig,
    RetryPolicy, TokenBucket, TokenBucketConfig,
};
use tollgate_common::time::MockClock;
use tollgate_common::TokioClock;

/// Validates a full breaker lifecycle: open, reject, probe, re-open, recover.
///
/// # Test Steps
/// 1. Fail three calls with a threshold of 3 and observe CLOSED -> OPEN
/// 2. Verify admission is refused until the recovery timeout elapses
/// 3. Fail the first probe and observe HALF_OPEN -> OPEN with a fresh timer
/// 4. Succeed the next probe and observe HALF_OPEN -> CLOSED
#[test]
fn test_circuit_breaker_full_lifecycle() {
    let clock = MockClock::new();
    let breaker = CircuitBreakerConfig::builder()
        .clock(clock.clone())
        .failure_threshold(3)
        .recovery_timeout(Duration::from_secs(5))
        .half_open_max_probes(1)
        .build()
        .expect("valid breaker config");

    let mut transitions = Vec::new();
    for _ in 0..3 {
        let admission = breaker.try_acquire().expect("closed breaker admits");
        transitions.extend(breaker.record_failure(admission.permit));
    }
    assert_eq!(transitions.len(), 1);
    assert_eq!(transitions[0].to, CircuitState::Open);

    clock.advance(Duration::from_secs(4));
    assert!(breaker.try_acquire().is_err());

    clock.advance(Duration::from_secs(1));
    let probe = breaker.try_acquire().expect("recovery timeout elapsed");
    assert_eq!(probe.transition.map(|t| t.to), Some(CircuitState::HalfOpen));
    assert!(breaker.try_acquire().is_err(), "only one probe allowed");

    let reopened = breaker.record_failure(probe.permit).expect("probe failure re-opens");
    assert_eq!(reopened.from, CircuitState::HalfOpen);
    assert_eq!(reopened.to, CircuitState::Open);

    clock.advance(Duration::from_secs(5));
    let probe = breaker.try_acquire().expect("second recovery window");
    let closed = breaker.record_success(probe.permit).expect("probe success closes");
    assert_eq!(closed.to, CircuitState::Closed);
    assert_eq!(breaker.state(), CircuitState::Closed);
}

/// Validates that a breaker shared across threads opens exactly once.
///
/// # Test Steps
/// 1. Eight threads each record failures on clones of one breaker
/// 2. Count CLOSED -> OPEN transitions reported to callers
#[test]
fn test_circuit_breaker_concurrent_failures_open_once() {
    let config = CircuitBreakerConfig::builder()
        .failure_threshold(10)
        .recovery_timeout(Duration::from_secs(60))
        .build()
        .expect("valid breaker config");
    let breaker = CircuitBreaker::new(config).expect("breaker");

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let breaker = breaker.clone();
            thread::spawn(move || {
                let mut opens = 0;
                for _ in 0..10 {
                    if let Ok(admission) = breaker.try_acquire() {
                        if breaker.record_failure(admission.permit).is_some() {
                            opens += 1;
                        }
                    }
                }
                opens
            })
        })
        .collect();

    let opens: u32 = handles.into_iter().map(|h| h.join().expect("thread panicked")).sum();
    assert_eq!(opens, 1);
    assert_eq!(breaker.state(), CircuitState::Open);
}

/// Validates the burst-then-throttle scenario of the token bucket.
///
/// # Test Steps
/// 1. capacity=5, refill=1/s: five immediate acquisitions succeed
/// 2. The sixth reports a wait of about one second
/// 3. After advancing the clock by that wait the sixth succeeds
#[test]
fn test_token_bucket_burst_then_steady_state() {
    let clock = MockClock::new();
    let config = TokenBucketConfig::builder()
        .capacity(5.0)
        .refill_rate(1.0)
        .build()
        .expect("valid bucket config");
    let bucket = TokenBucket::with_clock(config, clock.clone()).expect("bucket");

    for _ in 0..5 {
        assert_eq!(bucket.try_acquire(1.0), Acquisition::Acquired);
    }

    let wait = match bucket.try_acquire(1.0) {
        Acquisition::Wait(wait) => wait,
        Acquisition::Acquired => panic!("bucket should be empty"),
    };
    assert!((wait.as_secs_f64() - 1.0).abs() < 1e-6);

    clock.advance(wait);
    assert_eq!(bucket.try_acquire(1.0), Acquisition::Acquired);
}

/// Validates that concurrent acquisitions never over-spend the bucket.
#[test]
fn test_token_bucket_concurrent_acquisitions_respect_capacity() {
    let clock = MockClock::new();
    let config = TokenBucketConfig { capacity: 50.0, refill_rate: 1.0 };
    let bucket = Arc::new(TokenBucket::with_clock(config, clock).expect("bucket"));

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let bucket = Arc::clone(&bucket);
            thread::spawn(move || (0..20).filter(|_| bucket.try_acquire(1.0).is_acquired()).count())
        })
        .collect();

    let granted: usize = handles.into_iter().map(|h| h.join().expect("thread panicked")).sum();
    assert_eq!(granted, 50);
    assert!(bucket.available_tokens() < 1.0);
}

/// Validates that async acquisition paces callers at the refill rate.
#[tokio::test(start_paused = true)]
async fn test_token_bucket_async_pacing() {
    let config = TokenBucketConfig { capacity: 2.0, refill_rate: 4.0 };
    let bucket = TokenBucket::with_clock(config, TokioClock).expect("bucket");
    let start = tokio::time::Instant::now();

    for _ in 0..6 {
        bucket.acquire(1.0).await;
    }

    // Two from the burst, four more at 250ms each.
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(995), "elapsed {elapsed:?}");
    assert!(elapsed <= Duration::from_millis(1100), "elapsed {elapsed:?}");
}

/// Validates the retry schedule produced by the default configuration.
///
/// # Test Steps
/// 1. Walk attempts 0..max_attempts with jitter disabled
/// 2. Verify 100ms, 200ms, 400ms then exhaustion
#[test]
fn test_retry_schedule_without_jitter() {
    let config = RetryConfig::builder().no_jitter().build().expect("valid retry config");
    let policy = RetryPolicy::new(config).expect("policy");

    let schedule: Vec<_> =
        (0..4).map(|attempt| policy.next_delay(attempt, RetryClass::Retryable)).collect();
    assert_eq!(
        schedule,
        vec![
            Some(Duration::from_millis(100)),
            Some(Duration::from_millis(200)),
            Some(Duration::from_millis(400)),
            None,
        ]
    );
}

/// Validates that rate-limit hints bypass backoff and jitter.
#[test]
fn test_retry_rate_limit_hint_overrides_backoff() {
    let policy = RetryPolicy::new(RetryConfig::default()).expect("policy");
    let hint = Duration::from_millis(1500);

    assert_eq!(
        policy.next_delay(0, RetryClass::RateLimited { retry_after: Some(hint) }),
        Some(hint)
    );
    assert_eq!(policy.next_delay(0, RetryClass::NonRetryable), None);
}
