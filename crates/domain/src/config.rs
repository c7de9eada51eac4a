//! Client configuration
//!
//! Plain serde structs; every section and field has a default so a config
//! file only needs to mention what it overrides. Durations are expressed in
//! milliseconds in files and environment variables and exposed as
//! [`Duration`] through accessor methods.
//!
//! ```toml
//! base_url = "https://api.example.com"
//!
//! [rate_limit]
//! requests_per_second = 5.0
//!
//! [retry]
//! max_attempts = 5
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::errors::{Result, TollgateError};

/// Root configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL every request path is resolved against
    pub base_url: String,
    pub transport: TransportSettings,
    pub rate_limit: RateLimitSettings,
    pub circuit_breaker: CircuitBreakerSettings,
    pub retry: RetrySettings,
    pub queue: QueueSettings,
    pub dispatch: DispatchSettings,
    pub metrics: MetricsSettings,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            transport: TransportSettings::default(),
            rate_limit: RateLimitSettings::default(),
            circuit_breaker: CircuitBreakerSettings::default(),
            retry: RetrySettings::default(),
            queue: QueueSettings::default(),
            dispatch: DispatchSettings::default(),
            metrics: MetricsSettings::default(),
        }
    }
}

/// HTTP transport settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    pub user_agent: String,
    pub connect_timeout_ms: u64,
    /// Headers added to every request unless the request sets them itself
    pub default_headers: BTreeMap<String, String>,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            default_headers: BTreeMap::new(),
        }
    }
}

impl TransportSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Token bucket settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    /// Steady-state refill rate
    pub requests_per_second: f64,
    /// Bucket capacity
    pub burst_capacity: f64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
            burst_capacity: DEFAULT_BURST_CAPACITY,
        }
    }
}

/// Circuit breaker settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    pub failure_threshold: u32,
    pub recovery_timeout_ms: u64,
    pub half_open_max_probes: u32,
    /// Count 429 responses as breaker failures
    pub count_rate_limit_as_failure: bool,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            recovery_timeout_ms: DEFAULT_RECOVERY_TIMEOUT_MS,
            half_open_max_probes: DEFAULT_HALF_OPEN_MAX_PROBES,
            count_rate_limit_as_failure: false,
        }
    }
}

impl CircuitBreakerSettings {
    pub fn recovery_timeout(&self) -> Duration {
        Duration::from_millis(self.recovery_timeout_ms)
    }
}

/// Retry settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Maximum retries after the initial attempt
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter_fraction: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            jitter_fraction: DEFAULT_JITTER_FRACTION,
        }
    }
}

impl RetrySettings {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    pub queue_capacity: usize,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self { queue_capacity: DEFAULT_QUEUE_CAPACITY }
    }
}

/// Worker pool and per-request timing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchSettings {
    pub worker_count: usize,
    /// Upper bound for a single transport call
    pub request_timeout_ms: u64,
    /// Deadline applied to requests submitted without one
    pub default_deadline_ms: u64,
    /// How long an idle worker waits on the queue before re-checking shutdown
    pub idle_poll_ms: u64,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            default_deadline_ms: DEFAULT_DEADLINE_MS,
            idle_poll_ms: DEFAULT_IDLE_POLL_MS,
        }
    }
}

impl DispatchSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn default_deadline(&self) -> Duration {
        Duration::from_millis(self.default_deadline_ms)
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSettings {
    pub latency_sample_capacity: usize,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self { latency_sample_capacity: DEFAULT_LATENCY_SAMPLE_CAPACITY }
    }
}

fn invalid(message: impl Into<String>) -> TollgateError {
    TollgateError::Config(message.into())
}

fn positive_finite(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{name} must be a finite value greater than 0, got {value}")))
    }
}

fn non_zero(name: &str, value: u64) -> Result<()> {
    if value == 0 {
        Err(invalid(format!("{name} must be greater than 0")))
    } else {
        Ok(())
    }
}

impl ClientConfig {
    /// Start from defaults with a specific base URL
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), ..Self::default() }
    }

    /// Reject zero, negative and non-finite values
    ///
    /// # Errors
    /// Returns `TollgateError::Config` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let base_url = self.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(invalid(format!(
                "base_url must start with http:// or https://, got {:?}",
                self.base_url
            )));
        }

        positive_finite("rate_limit.requests_per_second", self.rate_limit.requests_per_second)?;
        positive_finite("rate_limit.burst_capacity", self.rate_limit.burst_capacity)?;

        let cb = &self.circuit_breaker;
        non_zero("circuit_breaker.failure_threshold", u64::from(cb.failure_threshold))?;
        non_zero("circuit_breaker.recovery_timeout_ms", cb.recovery_timeout_ms)?;
        non_zero("circuit_breaker.half_open_max_probes", u64::from(cb.half_open_max_probes))?;

        let retry = &self.retry;
        if !retry.backoff_multiplier.is_finite() || retry.backoff_multiplier < 1.0 {
            return Err(invalid("retry.backoff_multiplier must be finite and at least 1.0"));
        }
        if !(0.0..=1.0).contains(&retry.jitter_fraction) {
            return Err(invalid("retry.jitter_fraction must be between 0.0 and 1.0"));
        }
        if retry.base_delay_ms > retry.max_delay_ms {
            return Err(invalid("retry.base_delay_ms must not exceed retry.max_delay_ms"));
        }

        non_zero("queue.queue_capacity", self.queue.queue_capacity as u64)?;

        let dispatch = &self.dispatch;
        non_zero("dispatch.worker_count", dispatch.worker_count as u64)?;
        non_zero("dispatch.request_timeout_ms", dispatch.request_timeout_ms)?;
        non_zero("dispatch.default_deadline_ms", dispatch.default_deadline_ms)?;
        non_zero("dispatch.idle_poll_ms", dispatch.idle_poll_ms)?;

        non_zero("metrics.latency_sample_capacity", self.metrics.latency_sample_capacity as u64)?;
        non_zero("transport.connect_timeout_ms", self.transport.connect_timeout_ms)?;

        Ok(())
    }
}
