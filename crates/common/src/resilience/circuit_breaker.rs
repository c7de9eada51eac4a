//! Circuit breaker for isolating a failing dependency
//!
//! The breaker is a three-state machine held under a single lock:
//!
//! ```text
//!            failures >= threshold                 recovery_timeout elapsed
//!   CLOSED ------------------------> OPEN ----------------------------------> HALF_OPEN
//!     ^                               ^                                          |
//!     |          probe failure        |                                          |
//!     |       <-----------------------+------------------------------------------+
//!     |                          probe success                                   |
//!     +--------------------------------------------------------------------------+
//! ```
//!
//! Callers ask for admission with [`CircuitBreaker::try_acquire`] and report
//! the outcome of the call with the returned [`CallPermit`]. Every transition
//! bumps a generation counter; outcomes carried by permits from an older
//! generation are discarded, so a late reply from a probe that was in flight
//! when another probe failed cannot close the circuit again.
//!
//! Transitions are returned to the caller as [`StateTransition`] values so a
//! metrics layer can count them without the breaker knowing about metrics.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::{ConfigError, ConfigResult};
use crate::time::{Clock, SystemClock};

/// Externally visible circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CircuitState {
    /// Circuit is closed, allowing requests
    Closed,
    /// Circuit is open, rejecting requests
    Open,
    /// Circuit is half-open, allowing limited probes to test recovery
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "CLOSED"),
            CircuitState::Open => write!(f, "OPEN"),
            CircuitState::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// A state change performed by the breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTransition {
    pub from: CircuitState,
    pub to: CircuitState,
}

impl StateTransition {
    fn new(from: CircuitState, to: CircuitState) -> Self {
        Self { from, to }
    }
}

impl fmt::Display for StateTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// Returned when the breaker refuses admission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Circuit breaker is {state}, rejecting call")]
pub struct CircuitOpenRejection {
    /// State at the time of rejection (`Open` or saturated `HalfOpen`)
    pub state: CircuitState,
    /// Time left until the breaker becomes eligible for half-open probes.
    /// `None` while half-open probes are saturated.
    pub retry_in: Option<Duration>,
}

/// Proof of admission, consumed when the outcome is reported
#[must_use = "a permit must be resolved with record_success, record_failure or release"]
#[derive(Debug)]
pub struct CallPermit {
    generation: u64,
    probe: bool,
}

impl CallPermit {
    /// Whether this permit occupies a half-open probe slot
    pub fn is_probe(&self) -> bool {
        self.probe
    }

    /// Breaker generation the permit was issued in
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Successful admission
#[derive(Debug)]
pub struct Admission {
    pub permit: CallPermit,
    /// Set when the admission check itself moved the breaker (OPEN -> HALF_OPEN)
    pub transition: Option<StateTransition>,
}

/// Point-in-time view of the breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerStats {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub probes_in_flight: u32,
    pub generation: u64,
}

/// Configuration for circuit breaker behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures while closed before the circuit opens
    pub failure_threshold: u32,
    /// Time the circuit stays open before probes are allowed
    pub recovery_timeout: Duration,
    /// Maximum concurrent probes while half-open
    pub half_open_max_probes: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
            half_open_max_probes: 1,
        }
    }
}

impl CircuitBreakerConfig {
    /// Create a configuration builder
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.failure_threshold == 0 {
            return Err(ConfigError::invalid("failure_threshold must be greater than 0"));
        }

        if self.recovery_timeout.is_zero() {
            return Err(ConfigError::invalid("recovery_timeout must be greater than 0"));
        }

        if self.half_open_max_probes == 0 {
            return Err(ConfigError::invalid("half_open_max_probes must be greater than 0"));
        }

        Ok(())
    }
}

/// Builder for CircuitBreakerConfig
#[derive(Debug, Default)]
pub struct CircuitBreakerConfigBuilder {
    config: CircuitBreakerConfig,
}

impl CircuitBreakerConfigBuilder {
    pub fn new() -> Self {
        Self { config: CircuitBreakerConfig::default() }
    }

    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.config.failure_threshold = threshold;
        self
    }

    pub fn recovery_timeout(mut self, timeout: Duration) -> Self {
        self.config.recovery_timeout = timeout;
        self
    }

    pub fn half_open_max_probes(mut self, probes: u32) -> Self {
        self.config.half_open_max_probes = probes;
        self
    }

    /// Set a custom clock for the circuit breaker (useful for testing)
    pub fn clock<C: Clock>(self, clock: C) -> CircuitBreakerBuilderWithClock<C> {
        CircuitBreakerBuilderWithClock { config: self.config, clock }
    }

    pub fn build(self) -> ConfigResult<CircuitBreakerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Builder with custom clock that builds a CircuitBreaker directly
pub struct CircuitBreakerBuilderWithClock<C: Clock> {
    config: CircuitBreakerConfig,
    clock: C,
}

impl<C: Clock> CircuitBreakerBuilderWithClock<C> {
    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.config.failure_threshold = threshold;
        self
    }

    pub fn recovery_timeout(mut self, timeout: Duration) -> Self {
        self.config.recovery_timeout = timeout;
        self
    }

    pub fn half_open_max_probes(mut self, probes: u32) -> Self {
        self.config.half_open_max_probes = probes;
        self
    }

    pub fn build(self) -> ConfigResult<CircuitBreaker<C>> {
        CircuitBreaker::with_clock(self.config, self.clock)
    }
}

#[derive(Debug, Clone, Copy)]
enum BreakerState {
    Closed { consecutive_failures: u32 },
    Open { opened_at: Instant },
    HalfOpen { probes_in_flight: u32 },
}

impl BreakerState {
    fn public(&self) -> CircuitState {
        match self {
            BreakerState::Closed { .. } => CircuitState::Closed,
            BreakerState::Open { .. } => CircuitState::Open,
            BreakerState::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }
}

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    generation: u64,
}

impl Inner {
    fn transition(&mut self, next: BreakerState) -> StateTransition {
        let change = StateTransition::new(self.state.public(), next.public());
        self.state = next;
        self.generation += 1;
        change
    }
}

/// Circuit breaker
///
/// Cloning is cheap; clones share state.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
///
/// use tollgate_common::resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = CircuitBreakerConfig::builder()
///     .failure_threshold(1)
///     .recovery_timeout(Duration::from_secs(10))
///     .build()?;
/// let breaker = CircuitBreaker::new(config)?;
///
/// let admission = breaker.try_acquire()?;
/// let transition = breaker.record_failure(admission.permit);
///
/// assert_eq!(transition.map(|t| t.to), Some(CircuitState::Open));
/// assert!(breaker.try_acquire().is_err());
/// # Ok(())
/// # }
/// ```
pub struct CircuitBreaker<C: Clock = SystemClock> {
    config: CircuitBreakerConfig,
    inner: Arc<Mutex<Inner>>,
    clock: Arc<C>,
}

impl CircuitBreaker<SystemClock> {
    /// Create a new circuit breaker with the given configuration using system
    /// clock
    pub fn new(config: CircuitBreakerConfig) -> ConfigResult<Self> {
        Self::with_clock(config, SystemClock)
    }

    /// Create a circuit breaker using the builder pattern
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }
}

impl<C: Clock> CircuitBreaker<C> {
    /// Create a new circuit breaker with a custom clock (useful for testing)
    pub fn with_clock(config: CircuitBreakerConfig, clock: C) -> ConfigResult<Self> {
        config.validate()?;

        Ok(Self {
            config,
            inner: Arc::new(Mutex::new(Inner {
                state: BreakerState::Closed { consecutive_failures: 0 },
                generation: 0,
            })),
            clock: Arc::new(clock),
        })
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Ask for permission to call the protected dependency
    ///
    /// While OPEN the first check made after `recovery_timeout` moves the
    /// breaker to HALF_OPEN and admits that caller as the first probe.
    pub fn try_acquire(&self) -> Result<Admission, CircuitOpenRejection> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        match inner.state {
            BreakerState::Closed { .. } => Ok(Admission {
                permit: CallPermit { generation: inner.generation, probe: false },
                transition: None,
            }),
            BreakerState::Open { opened_at } => {
                let open_for = now.saturating_duration_since(opened_at);
                if open_for < self.config.recovery_timeout {
                    return Err(CircuitOpenRejection {
                        state: CircuitState::Open,
                        retry_in: Some(self.config.recovery_timeout - open_for),
                    });
                }

                let change = inner.transition(BreakerState::HalfOpen { probes_in_flight: 1 });
                info!(
                    generation = inner.generation,
                    open_for_ms = open_for.as_millis() as u64,
                    "Circuit breaker half-open, admitting probe"
                );
                Ok(Admission {
                    permit: CallPermit { generation: inner.generation, probe: true },
                    transition: Some(change),
                })
            }
            BreakerState::HalfOpen { probes_in_flight } => {
                if probes_in_flight >= self.config.half_open_max_probes {
                    debug!(probes_in_flight, "Circuit breaker half-open probes saturated");
                    return Err(CircuitOpenRejection {
                        state: CircuitState::HalfOpen,
                        retry_in: None,
                    });
                }

                inner.state = BreakerState::HalfOpen { probes_in_flight: probes_in_flight + 1 };
                Ok(Admission {
                    permit: CallPermit { generation: inner.generation, probe: true },
                    transition: None,
                })
            }
        }
    }

    /// Report a successful call
    ///
    /// A successful probe closes the circuit. Returns the transition, if any.
    pub fn record_success(&self, permit: CallPermit) -> Option<StateTransition> {
        let mut inner = self.inner.lock();
        if permit.generation != inner.generation {
            debug!(
                permit_generation = permit.generation,
                generation = inner.generation,
                "Discarding success from stale permit"
            );
            return None;
        }

        match inner.state {
            BreakerState::Closed { .. } => {
                inner.state = BreakerState::Closed { consecutive_failures: 0 };
                None
            }
            BreakerState::HalfOpen { .. } => {
                let change = inner.transition(BreakerState::Closed { consecutive_failures: 0 });
                info!(generation = inner.generation, "Circuit breaker closed after successful probe");
                Some(change)
            }
            // Entering OPEN bumps the generation, so no live permit can be here.
            BreakerState::Open { .. } => None,
        }
    }

    /// Report a failed call
    ///
    /// Opens the circuit when the consecutive failure count reaches the
    /// threshold, or immediately when a half-open probe fails.
    pub fn record_failure(&self, permit: CallPermit) -> Option<StateTransition> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        if permit.generation != inner.generation {
            debug!(
                permit_generation = permit.generation,
                generation = inner.generation,
                "Discarding failure from stale permit"
            );
            return None;
        }

        match inner.state {
            BreakerState::Closed { consecutive_failures } => {
                let failures = consecutive_failures.saturating_add(1);
                if failures < self.config.failure_threshold {
                    inner.state = BreakerState::Closed { consecutive_failures: failures };
                    debug!(failures, threshold = self.config.failure_threshold, "Recorded failure");
                    return None;
                }

                let change = inner.transition(BreakerState::Open { opened_at: now });
                warn!(
                    failures,
                    recovery_timeout_ms = self.config.recovery_timeout.as_millis() as u64,
                    "Circuit breaker opened after consecutive failures"
                );
                Some(change)
            }
            BreakerState::HalfOpen { .. } => {
                let change = inner.transition(BreakerState::Open { opened_at: now });
                warn!(generation = inner.generation, "Circuit breaker re-opened after failed probe");
                Some(change)
            }
            BreakerState::Open { .. } => None,
        }
    }

    /// Resolve a permit without affecting failure accounting
    ///
    /// Frees the half-open probe slot held by the permit, if any.
    pub fn release(&self, permit: CallPermit) {
        let mut inner = self.inner.lock();
        if permit.generation != inner.generation || !permit.probe {
            return;
        }

        if let BreakerState::HalfOpen { probes_in_flight } = inner.state {
            inner.state =
                BreakerState::HalfOpen { probes_in_flight: probes_in_flight.saturating_sub(1) };
        }
    }

    /// Get the current state of the circuit breaker
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state.public()
    }

    /// Get a snapshot of the breaker counters
    pub fn stats(&self) -> CircuitBreakerStats {
        let inner = self.inner.lock();
        let (consecutive_failures, probes_in_flight) = match inner.state {
            BreakerState::Closed { consecutive_failures } => (consecutive_failures, 0),
            BreakerState::Open { .. } => (0, 0),
            BreakerState::HalfOpen { probes_in_flight } => (0, probes_in_flight),
        };

        CircuitBreakerStats {
            state: inner.state.public(),
            consecutive_failures,
            probes_in_flight,
            generation: inner.generation,
        }
    }

    /// Force the breaker back to CLOSED
    pub fn reset(&self) -> Option<StateTransition> {
        let mut inner = self.inner.lock();
        if let BreakerState::Closed { .. } = inner.state {
            inner.state = BreakerState::Closed { consecutive_failures: 0 };
            return None;
        }

        let change = inner.transition(BreakerState::Closed { consecutive_failures: 0 });
        info!("Circuit breaker manually reset");
        Some(change)
    }
}

impl<C: Clock> Clone for CircuitBreaker<C> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            inner: Arc::clone(&self.inner),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<C: Clock> fmt::Debug for CircuitBreaker<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}
