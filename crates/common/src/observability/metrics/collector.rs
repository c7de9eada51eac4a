//! Request-level metrics collector
//!
//! Counters are plain atomics so recording never takes a lock on the hot
//! path. Latencies go into a reservoir sample behind its own mutex, which is
//! never held together with any other lock in the crate.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::reservoir::Reservoir;
use super::snapshot::MetricsSnapshot;
use crate::error::{ConfigError, ConfigResult};
use crate::resilience::{CircuitState, StateTransition};

/// Default number of retained latency samples
pub const DEFAULT_LATENCY_SAMPLE_CAPACITY: usize = 1024;

#[derive(Debug, Default)]
struct Counters {
    requests_submitted: AtomicU64,
    requests_sent: AtomicU64,
    requests_succeeded: AtomicU64,
    requests_failed: AtomicU64,
    retries_performed: AtomicU64,
    circuit_opens: AtomicU64,
    circuit_half_opens: AtomicU64,
    circuit_closes: AtomicU64,
    circuit_rejections: AtomicU64,
    rate_limited_waits: AtomicU64,
    queue_rejections: AtomicU64,
    deadline_exceeded: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

/// Thread-safe metrics collector
///
/// Cloning is cheap and clones record into the same counters.
///
/// # Example
/// ```
/// use tollgate_common::observability::MetricsCollector;
///
/// let metrics = MetricsCollector::default();
/// metrics.record_submitted();
/// metrics.record_sent();
/// metrics.record_succeeded();
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.requests_submitted, 1);
/// assert_eq!(snapshot.requests_succeeded, 1);
/// ```
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    counters: Arc<Counters>,
    latencies: Arc<Mutex<Reservoir>>,
}

impl MetricsCollector {
    /// Create a collector retaining at most `latency_sample_capacity` latencies
    pub fn new(latency_sample_capacity: usize) -> ConfigResult<Self> {
        if latency_sample_capacity == 0 {
            return Err(ConfigError::invalid("latency_sample_capacity must be greater than 0"));
        }

        Ok(Self {
            counters: Arc::new(Counters::default()),
            latencies: Arc::new(Mutex::new(Reservoir::new(latency_sample_capacity))),
        })
    }

    pub fn record_submitted(&self) {
        bump(&self.counters.requests_submitted);
    }

    /// A request was handed to the transport
    pub fn record_sent(&self) {
        bump(&self.counters.requests_sent);
    }

    pub fn record_succeeded(&self) {
        bump(&self.counters.requests_succeeded);
    }

    /// A request reached a terminal failure of any kind
    pub fn record_failed(&self) {
        bump(&self.counters.requests_failed);
    }

    pub fn record_retry(&self) {
        bump(&self.counters.retries_performed);
    }

    /// Count a breaker transition under the counter for its target state
    pub fn record_circuit_transition(&self, transition: StateTransition) {
        match transition.to {
            CircuitState::Open => bump(&self.counters.circuit_opens),
            CircuitState::HalfOpen => bump(&self.counters.circuit_half_opens),
            CircuitState::Closed => bump(&self.counters.circuit_closes),
        }
    }

    pub fn record_circuit_rejection(&self) {
        bump(&self.counters.circuit_rejections);
    }

    /// A worker had to wait for rate-limit tokens
    pub fn record_rate_limited_wait(&self) {
        bump(&self.counters.rate_limited_waits);
    }

    pub fn record_queue_rejection(&self) {
        bump(&self.counters.queue_rejections);
    }

    pub fn record_deadline_exceeded(&self) {
        bump(&self.counters.deadline_exceeded);
    }

    /// Offer one latency observation to the reservoir
    pub fn record_latency(&self, latency: Duration) {
        let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self.latencies.lock().offer(micros, &mut rand::thread_rng());
    }

    /// Take an immutable copy of every counter and the latency sample
    pub fn snapshot(&self) -> MetricsSnapshot {
        let c = &self.counters;
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);

        let (latency_observations, mut latency_samples_us) = {
            let reservoir = self.latencies.lock();
            (reservoir.seen(), reservoir.samples().to_vec())
        };
        latency_samples_us.sort_unstable();

        MetricsSnapshot {
            requests_submitted: load(&c.requests_submitted),
            requests_sent: load(&c.requests_sent),
            requests_succeeded: load(&c.requests_succeeded),
            requests_failed: load(&c.requests_failed),
            retries_performed: load(&c.retries_performed),
            circuit_opens: load(&c.circuit_opens),
            circuit_half_opens: load(&c.circuit_half_opens),
            circuit_closes: load(&c.circuit_closes),
            circuit_rejections: load(&c.circuit_rejections),
            rate_limited_waits: load(&c.rate_limited_waits),
            queue_rejections: load(&c.queue_rejections),
            deadline_exceeded: load(&c.deadline_exceeded),
            latency_observations,
            latency_samples_us,
        }
    }

    /// Reset all counters and samples to zero
    pub fn reset(&self) {
        let c = &self.counters;
        for counter in [
            &c.requests_submitted,
            &c.requests_sent,
            &c.requests_succeeded,
            &c.requests_failed,
            &c.retries_performed,
            &c.circuit_opens,
            &c.circuit_half_opens,
            &c.circuit_closes,
            &c.circuit_rejections,
            &c.rate_limited_waits,
            &c.queue_rejections,
            &c.deadline_exceeded,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        self.latencies.lock().clear();
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self {
            counters: Arc::new(Counters::default()),
            latencies: Arc::new(Mutex::new(Reservoir::new(DEFAULT_LATENCY_SAMPLE_CAPACITY))),
        }
    }
}
