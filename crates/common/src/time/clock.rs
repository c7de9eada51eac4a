//! Time abstraction for testability
//!
//! Every time-dependent primitive in this crate (token bucket refill,
//! circuit breaker recovery, queue deadlines) reads time through [`Clock`]
//! so tests can drive it deterministically.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use tollgate_common::time::{Clock, MockClock, SystemClock};
//!
//! // Use system clock in production
//! let clock = SystemClock;
//! let _now = clock.now();
//!
//! // Use mock clock in tests
//! let mock = MockClock::new();
//! let start = mock.now();
//! mock.advance(Duration::from_secs(5));
//! assert_eq!(mock.now().duration_since(start), Duration::from_secs(5));
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

/// Source of monotonic and wall-clock time
///
/// Implementations must be monotonic: successive calls to [`Clock::now`]
/// never go backwards.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;

    /// Wall-clock time, used for HTTP-date `Retry-After` values
    fn system_time(&self) -> SystemTime;
}

/// Process clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Clock backed by the tokio timer.
///
/// Reads `tokio::time::Instant`, so it follows `tokio::time::pause` and
/// `advance` in tests while matching `Instant::now()` in production. Anything
/// that both sleeps on the tokio timer and measures elapsed time should use
/// this clock so the two never disagree.
#[cfg(feature = "runtime")]
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[cfg(feature = "runtime")]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }
}

impl<T: Clock> Clock for Arc<T> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn system_time(&self) -> SystemTime {
        (**self).system_time()
    }
}

/// Manually driven clock for unit tests
///
/// Time only moves through [`MockClock::advance`]. Clones share the offset,
/// so advancing one handle moves every component holding a clone. Wall-clock
/// time starts at the UNIX epoch.
#[derive(Debug, Clone)]
pub struct MockClock {
    origin: Instant,
    offset_nanos: Arc<AtomicU64>,
}

impl MockClock {
    pub fn new() -> Self {
        Self { origin: Instant::now(), offset_nanos: Arc::new(AtomicU64::new(0)) }
    }

    pub fn advance(&self, duration: Duration) {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        self.offset_nanos
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| Some(current.saturating_add(nanos)))
            .ok();
    }

    pub fn advance_millis(&self, millis: u64) {
        self.advance(Duration::from_millis(millis));
    }

    /// Time advanced since construction
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.offset_nanos.load(Ordering::SeqCst))
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn system_time(&self) -> SystemTime {
        SystemTime::UNIX_EPOCH + self.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_now() {
        let clock = SystemClock;
        let now1 = clock.now();
        let now2 = clock.now();
        assert!(now2 >= now1, "System clock should advance");
    }

    /// Validates `MockClock::advance` for the mock clock advance scenario.
    ///
    /// Assertions:
    /// - Confirms `after.duration_since(start)` equals
    ///   `Duration::from_secs(5)`.
    #[test]
    fn test_mock_clock_advance() {
        let clock = MockClock::new();
        let start = clock.now();

        clock.advance(Duration::from_secs(5));

        assert_eq!(clock.now().duration_since(start), Duration::from_secs(5));
    }

    #[test]
    fn test_mock_clock_wall_time_starts_at_epoch() {
        let clock = MockClock::new();
        clock.advance_millis(1_500);

        assert_eq!(clock.elapsed(), Duration::from_millis(1_500));
        assert_eq!(
            clock.system_time().duration_since(SystemTime::UNIX_EPOCH).unwrap(),
            Duration::from_millis(1_500)
        );
    }

    /// Validates that clones of a `MockClock` share their elapsed offset.
    ///
    /// Assertions:
    /// - Confirms `clock1.elapsed()` equals `Duration::from_secs(15)`.
    /// - Confirms `clock2.elapsed()` equals `Duration::from_secs(15)`.
    #[test]
    fn test_mock_clock_clone_shares_time() {
        let clock1 = MockClock::new();
        clock1.advance(Duration::from_secs(10));

        let clock2 = clock1.clone();
        clock2.advance(Duration::from_secs(5));

        assert_eq!(clock1.elapsed(), Duration::from_secs(15));
        assert_eq!(clock2.elapsed(), Duration::from_secs(15));
    }

    /// Validates that `TokioClock` follows the paused tokio timer.
    ///
    /// Assertions:
    /// - Confirms the clock moved by exactly the advanced duration.
    #[cfg(feature = "runtime")]
    #[tokio::test(start_paused = true)]
    async fn test_tokio_clock_follows_paused_time() {
        let clock = TokioClock;
        let start = clock.now();

        tokio::time::advance(Duration::from_secs(3)).await;

        assert_eq!(clock.now().duration_since(start), Duration::from_secs(3));
    }
}
