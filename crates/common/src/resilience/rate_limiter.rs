//! Token bucket rate limiter
//!
//! Tokens accumulate at `refill_rate` per second up to `capacity` and are
//! debited per request. Refill is computed lazily on every acquisition, so
//! the bucket needs no background task. When there are not enough tokens the
//! caller is told exactly how long to wait instead of being rejected.
//!
//! Invariant: `0 <= tokens <= capacity` at every observation point.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::time::{Clock, SystemClock};

/// Configuration for token bucket rate limiter
#[derive(Debug, Clone, PartialEq)]
pub struct TokenBucketConfig {
    /// Maximum number of tokens the bucket can hold (burst size)
    pub capacity: f64,
    /// Tokens added per second (steady-state throughput)
    pub refill_rate: f64,
}

impl Default for TokenBucketConfig {
    fn default() -> Self {
        Self { capacity: 20.0, refill_rate: 10.0 }
    }
}

impl TokenBucketConfig {
    /// Create a new configuration builder
    pub fn builder() -> TokenBucketConfigBuilder {
        TokenBucketConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.capacity.is_finite() || self.capacity <= 0.0 {
            return Err(ConfigError::invalid("capacity must be a finite value greater than 0"));
        }
        if !self.refill_rate.is_finite() || self.refill_rate <= 0.0 {
            return Err(ConfigError::invalid("refill_rate must be a finite value greater than 0"));
        }
        Ok(())
    }
}

/// Builder for TokenBucketConfig
#[derive(Debug, Default)]
pub struct TokenBucketConfigBuilder {
    config: TokenBucketConfig,
}

impl TokenBucketConfigBuilder {
    pub fn new() -> Self {
        Self { config: TokenBucketConfig::default() }
    }

    pub fn capacity(mut self, capacity: f64) -> Self {
        self.config.capacity = capacity;
        self
    }

    pub fn refill_rate(mut self, tokens_per_second: f64) -> Self {
        self.config.refill_rate = tokens_per_second;
        self
    }

    pub fn build(self) -> Result<TokenBucketConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Result of a non-blocking acquisition attempt
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Acquisition {
    /// Tokens were debited
    Acquired,
    /// Not enough tokens; nothing was debited. Retry after the given wait.
    Wait(Duration),
}

impl Acquisition {
    /// Returns `true` if the tokens were debited.
    pub fn is_acquired(&self) -> bool {
        matches!(self, Acquisition::Acquired)
    }
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket rate limiter
///
/// Cloning is cheap and every clone shares the same bucket.
///
/// # Examples
///
/// ```rust
/// use tollgate_common::resilience::{Acquisition, TokenBucket, TokenBucketConfig};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = TokenBucketConfig::builder().capacity(2.0).refill_rate(1.0).build()?;
/// let bucket = TokenBucket::new(config)?;
///
/// assert!(bucket.try_acquire(1.0).is_acquired());
/// assert!(bucket.try_acquire(1.0).is_acquired());
/// assert!(matches!(bucket.try_acquire(1.0), Acquisition::Wait(_)));
/// # Ok(())
/// # }
/// ```
pub struct TokenBucket<C: Clock = SystemClock> {
    config: TokenBucketConfig,
    state: Arc<Mutex<BucketState>>,
    clock: Arc<C>,
}

impl TokenBucket<SystemClock> {
    /// Create a new token bucket with system clock
    pub fn new(config: TokenBucketConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> TokenBucket<C> {
    /// Create a new token bucket with custom clock. The bucket starts full.
    pub fn with_clock(config: TokenBucketConfig, clock: C) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            state: Arc::new(Mutex::new(BucketState {
                tokens: config.capacity,
                last_refill: clock.now(),
            })),
            clock: Arc::new(clock),
            config,
        })
    }

    /// Burst capacity
    pub fn capacity(&self) -> f64 {
        self.config.capacity
    }

    /// Steady-state refill rate in tokens per second
    pub fn refill_rate(&self) -> f64 {
        self.config.refill_rate
    }

    fn refill(&self, state: &mut BucketState, now: Instant) {
        let elapsed = now.saturating_duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.config.refill_rate).min(self.config.capacity);
        state.last_refill = now;
    }

    fn clamp_cost(&self, cost: f64) -> f64 {
        if cost > self.config.capacity {
            warn!(
                cost,
                capacity = self.config.capacity,
                "Token cost exceeds bucket capacity; clamping to capacity"
            );
            return self.config.capacity;
        }
        cost.max(0.0)
    }

    /// Try to acquire `cost` tokens without waiting
    ///
    /// Returns [`Acquisition::Acquired`] after debiting, or
    /// [`Acquisition::Wait`] with the exact time until enough tokens will
    /// have accumulated. A `Wait` result leaves the bucket unchanged apart
    /// from the lazy refill.
    pub fn try_acquire(&self, cost: f64) -> Acquisition {
        let cost = self.clamp_cost(cost);
        let now = self.clock.now();
        let mut state = self.state.lock();
        self.refill(&mut state, now);

        if state.tokens >= cost {
            state.tokens -= cost;
            debug!(cost, remaining = state.tokens, "Acquired tokens");
            return Acquisition::Acquired;
        }

        let deficit = cost - state.tokens;
        // Tiny refill rates can push the wait past what a Duration can hold.
        let wait = Duration::try_from_secs_f64(deficit / self.config.refill_rate).unwrap_or(Duration::MAX);
        debug!(cost, available = state.tokens, ?wait, "Rate limit: insufficient tokens");
        Acquisition::Wait(wait)
    }

    /// Acquire `cost` tokens, suspending the current task until they are
    /// available
    ///
    /// Uses `tokio::time::sleep` for the wait, so other tasks keep running.
    /// Returns the total time spent waiting.
    pub async fn acquire(&self, cost: f64) -> Duration {
        let mut waited = Duration::ZERO;
        loop {
            match self.try_acquire(cost) {
                Acquisition::Acquired => return waited,
                Acquisition::Wait(wait) => {
                    tokio::time::sleep(wait).await;
                    waited = waited.saturating_add(wait);
                }
            }
        }
    }

    /// Get the current number of available tokens
    pub fn available_tokens(&self) -> f64 {
        let now = self.clock.now();
        let mut state = self.state.lock();
        self.refill(&mut state, now);
        state.tokens
    }

    /// Reset the limiter to full capacity
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.tokens = self.config.capacity;
        state.last_refill = self.clock.now();
    }
}

impl<C: Clock> Clone for TokenBucket<C> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            state: Arc::clone(&self.state),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<C: Clock> std::fmt::Debug for TokenBucket<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenBucket")
            .field("config", &self.config)
            .field("tokens", &self.state.lock().tokens)
            .finish()
    }
}
