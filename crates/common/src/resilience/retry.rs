//! Retry delay computation
//!
//! [`RetryPolicy`] is a pure decision function: given how many retries have
//! already been performed and how the last failure was classified, it says
//! whether to retry and after how long. It never sleeps and never runs the
//! operation itself; scheduling the retry belongs to the caller.
//!
//! Delays grow geometrically (`base_delay * backoff_multiplier^attempt`), are
//! capped at `max_delay`, and are perturbed by symmetric uniform jitter of
//! `± jitter_fraction` so that clients failing together do not retry together.

use std::time::Duration;

use rand::Rng;
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

/// How a failed attempt should be treated by the retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// Transient failure; retry with exponential backoff
    Retryable,
    /// The server asked us to slow down. A `retry_after` hint is honored
    /// exactly; without one the failure is treated as [`RetryClass::Retryable`].
    RateLimited { retry_after: Option<Duration> },
    /// Permanent failure; never retried
    NonRetryable,
}

/// Retry configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of retries after the initial attempt
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound for the un-jittered delay
    pub max_delay: Duration,
    /// Geometric growth factor between retries
    pub backoff_multiplier: f64,
    /// Symmetric jitter as a fraction of the delay (0.0 disables jitter)
    pub jitter_fraction: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter_fraction: 0.25,
        }
    }
}

impl RetryConfig {
    /// Create a configuration builder
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    /// Validate the retry configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(ConfigError::invalid("backoff_multiplier must be finite and at least 1.0"));
        }

        if !(0.0..=1.0).contains(&self.jitter_fraction) {
            return Err(ConfigError::invalid("jitter_fraction must be between 0.0 and 1.0"));
        }

        if self.base_delay > self.max_delay {
            return Err(ConfigError::invalid("base_delay must not exceed max_delay"));
        }

        Ok(())
    }
}

/// Builder for RetryConfig
#[derive(Debug, Default)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl RetryConfigBuilder {
    pub fn new() -> Self {
        Self { config: RetryConfig::default() }
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.config.base_delay = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.config.max_delay = delay;
        self
    }

    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.config.backoff_multiplier = multiplier;
        self
    }

    pub fn jitter_fraction(mut self, fraction: f64) -> Self {
        self.config.jitter_fraction = fraction;
        self
    }

    pub fn no_jitter(mut self) -> Self {
        self.config.jitter_fraction = 0.0;
        self
    }

    pub fn build(self) -> ConfigResult<RetryConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Exponential backoff retry policy
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
///
/// use tollgate_common::resilience::{RetryClass, RetryConfig, RetryPolicy};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = RetryConfig::builder()
///     .max_attempts(2)
///     .base_delay(Duration::from_millis(100))
///     .no_jitter()
///     .build()?;
/// let policy = RetryPolicy::new(config)?;
///
/// assert_eq!(policy.next_delay(0, RetryClass::Retryable), Some(Duration::from_millis(100)));
/// assert_eq!(policy.next_delay(1, RetryClass::Retryable), Some(Duration::from_millis(200)));
/// assert_eq!(policy.next_delay(2, RetryClass::Retryable), None);
/// assert_eq!(policy.next_delay(0, RetryClass::NonRetryable), None);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Create a policy from a validated configuration
    pub fn new(config: RetryConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    /// Un-jittered delay before retry number `attempt + 1`, capped at
    /// `max_delay`
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let raw = self.config.base_delay.as_secs_f64() * self.config.backoff_multiplier.powi(exponent);
        let capped = raw.min(self.config.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped.max(0.0))
    }

    /// Decide whether and when to retry, using the thread-local RNG for jitter
    ///
    /// `attempt` is the number of retries already performed.
    pub fn next_delay(&self, attempt: u32, class: RetryClass) -> Option<Duration> {
        self.next_delay_with_rng(attempt, class, &mut rand::thread_rng())
    }

    /// Same as [`RetryPolicy::next_delay`] with a caller-supplied RNG
    pub fn next_delay_with_rng<R: Rng + ?Sized>(
        &self,
        attempt: u32,
        class: RetryClass,
        rng: &mut R,
    ) -> Option<Duration> {
        if attempt >= self.config.max_attempts {
            debug!(attempt, max_attempts = self.config.max_attempts, "Retry budget exhausted");
            return None;
        }

        match class {
            RetryClass::NonRetryable => None,
            RetryClass::RateLimited { retry_after: Some(hint) } => Some(hint),
            RetryClass::RateLimited { retry_after: None } | RetryClass::Retryable => {
                Some(self.jittered(self.backoff_delay(attempt), rng))
            }
        }
    }

    fn jittered<R: Rng + ?Sized>(&self, delay: Duration, rng: &mut R) -> Duration {
        let fraction = self.config.jitter_fraction;
        if fraction == 0.0 {
            return delay;
        }

        let offset: f64 = rng.gen_range(-fraction..=fraction);
        Duration::from_secs_f64((delay.as_secs_f64() * (1.0 + offset)).max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn policy(max_attempts: u32, jitter: f64) -> RetryPolicy {
        let config = RetryConfig::builder()
            .max_attempts(max_attempts)
            .base_delay(Duration::from_millis(100))
            .max_delay(Duration::from_secs(1))
            .backoff_multiplier(2.0)
            .jitter_fraction(jitter)
            .build()
            .unwrap();
        RetryPolicy::new(config).unwrap()
    }

    /// Validates the default retry configuration.
    ///
    /// Assertions:
    /// - Confirms every default field matches the documented value.
    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.base_delay, Duration::from_millis(100));
        assert_eq!(config.max_delay, Duration::from_secs(10));
        assert!((config.backoff_multiplier - 2.0).abs() < f64::EPSILON);
        assert!((config.jitter_fraction - 0.25).abs() < f64::EPSILON);
        assert!(config.validate().is_ok());
    }

    /// Validates `RetryConfig::validate` rejects out-of-range values.
    #[test]
    fn test_retry_config_validation() {
        assert!(RetryConfig::builder().backoff_multiplier(0.5).build().is_err());
        assert!(RetryConfig::builder().backoff_multiplier(f64::INFINITY).build().is_err());
        assert!(RetryConfig::builder().jitter_fraction(1.5).build().is_err());
        assert!(RetryConfig::builder().jitter_fraction(-0.1).build().is_err());
        assert!(RetryConfig::builder()
            .base_delay(Duration::from_secs(5))
            .max_delay(Duration::from_secs(1))
            .build()
            .is_err());
    }

    /// Validates the exponential growth and cap of the un-jittered delay.
    ///
    /// Assertions:
    /// - Confirms delays of 100, 200, 400, 800 ms then the 1 s cap.
    #[test]
    fn test_backoff_delay_exponential_with_cap() {
        let policy = policy(10, 0.0);
        let expected = [100, 200, 400, 800, 1000, 1000];
        for (attempt, millis) in expected.iter().enumerate() {
            assert_eq!(policy.backoff_delay(attempt as u32), Duration::from_millis(*millis));
        }
        assert_eq!(policy.backoff_delay(u32::MAX), Duration::from_secs(1));
    }

    /// Validates that the un-jittered delay is non-decreasing in `attempt`.
    #[test]
    fn test_backoff_delay_non_decreasing() {
        let policy = policy(64, 0.0);
        let mut previous = Duration::ZERO;
        for attempt in 0..64 {
            let delay = policy.next_delay(attempt, RetryClass::Retryable).unwrap();
            assert!(delay >= previous, "attempt {attempt}: {delay:?} < {previous:?}");
            previous = delay;
        }
    }

    /// Validates that jittered delays stay within `[d*(1-j), d*(1+j)]`.
    #[test]
    fn test_jitter_bounds() {
        let policy = policy(5, 0.25);
        let mut rng = StdRng::seed_from_u64(42);

        for attempt in 0..5 {
            let base = policy.backoff_delay(attempt).as_secs_f64();
            for _ in 0..200 {
                let delay = policy
                    .next_delay_with_rng(attempt, RetryClass::Retryable, &mut rng)
                    .unwrap()
                    .as_secs_f64();
                assert!(delay >= base * 0.75 - 1e-9 && delay <= base * 1.25 + 1e-9);
            }
        }
    }

    /// Validates that the retry budget counts retries already performed.
    ///
    /// Assertions:
    /// - Confirms attempts 0..max_attempts retry and `max_attempts` stops.
    #[test]
    fn test_max_attempts_exhaustion() {
        let policy = policy(3, 0.0);
        assert!(policy.next_delay(0, RetryClass::Retryable).is_some());
        assert!(policy.next_delay(2, RetryClass::Retryable).is_some());
        assert!(policy.next_delay(3, RetryClass::Retryable).is_none());
        assert!(policy.next_delay(7, RetryClass::Retryable).is_none());
    }

    #[test]
    fn test_zero_max_attempts_never_retries() {
        let policy = policy(0, 0.0);
        assert!(policy.next_delay(0, RetryClass::Retryable).is_none());
    }

    #[test]
    fn test_non_retryable_is_never_retried() {
        let policy = policy(3, 0.25);
        assert!(policy.next_delay(0, RetryClass::NonRetryable).is_none());
    }

    /// Validates that a rate-limit hint is honored exactly without jitter,
    /// even when it exceeds `max_delay`.
    #[test]
    fn test_rate_limited_hint_is_exact() {
        let policy = policy(3, 0.25);
        let hint = Duration::from_secs(5);
        let class = RetryClass::RateLimited { retry_after: Some(hint) };

        for _ in 0..20 {
            assert_eq!(policy.next_delay(1, class), Some(hint));
        }
        assert_eq!(policy.next_delay(3, class), None);
    }

    #[test]
    fn test_rate_limited_without_hint_uses_backoff() {
        let policy = policy(3, 0.0);
        let class = RetryClass::RateLimited { retry_after: None };
        assert_eq!(policy.next_delay(1, class), Some(Duration::from_millis(200)));
    }

    #[test]
    fn test_same_seed_same_delays() {
        let policy = policy(3, 0.5);
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);
        for attempt in 0..3 {
            assert_eq!(
                policy.next_delay_with_rng(attempt, RetryClass::Retryable, &mut a),
                policy.next_delay_with_rng(attempt, RetryClass::Retryable, &mut b)
            );
        }
    }
}
