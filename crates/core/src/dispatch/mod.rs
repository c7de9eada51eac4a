//! Request dispatcher - the client facade over the resilience primitives
//!
//! The dispatcher owns one [`PriorityRequestQueue`], one [`TokenBucket`], one
//! [`CircuitBreaker`], one [`RetryPolicy`] and one [`MetricsCollector`], and a
//! fixed pool of tokio worker tasks consuming the queue.
//!
//! ```text
//! submit ─▶ queue ─▶ worker: token bucket ─▶ breaker ─▶ Transport::send
//!                       ▲                                      │
//!                       └──── retry timer task ◀── classify ◀──┘
//! ```
//!
//! Every submitted request ends in exactly one terminal outcome that is
//! recorded in the metrics before the caller's [`ResponseHandle`] resolves.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tollgate_core::{Dispatcher, Transport};
//! use tollgate_domain::{ApiRequest, ClientConfig};
//!
//! # async fn example(transport: Arc<dyn Transport>) -> tollgate_domain::Result<()> {
//! let dispatcher = Dispatcher::new(ClientConfig::with_base_url("https://api.example.com"), transport)?;
//!
//! let response = dispatcher.execute(ApiRequest::get("/v1/status")).await?;
//! println!("status {}", response.status);
//!
//! dispatcher.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod classify;
mod handle;
mod job;
mod worker;

use std::sync::Arc;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tollgate_common::resilience::CircuitBreakerStats;
use tollgate_common::{
    CircuitBreaker, CircuitBreakerConfig, CircuitState, Clock, ConfigError, MetricsCollector,
    MetricsSnapshot, PriorityRequestQueue, PushError, RetryConfig, RetryPolicy, TokenBucket,
    TokenBucketConfig, TokioClock,
};
use tollgate_domain::{ApiRequest, ApiResponse, ClientConfig, Result, TollgateError};
use tracing::{debug, error, info, instrument, warn};

pub use classify::{breaker_verdict, retry_class, BreakerVerdict};
pub use handle::ResponseHandle;
use job::Job;
use worker::Shared;

use crate::transport_ports::Transport;

fn config_error(err: ConfigError) -> TollgateError {
    TollgateError::Config(err.message().to_string())
}

/// Resilient request dispatcher
///
/// Must be created inside a tokio runtime; the worker tasks are spawned on
/// it. Dropping the dispatcher cancels pending retries and fails queued
/// requests with [`TollgateError::Shutdown`]; call
/// [`shutdown`](Self::shutdown) to also wait for in-flight attempts.
pub struct Dispatcher {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Dispatcher {
    /// Validate `config`, build every component and start the worker pool
    ///
    /// # Errors
    /// Returns `TollgateError::Config` for an invalid configuration or when
    /// called outside a tokio runtime.
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|err| {
            TollgateError::Config(format!("Dispatcher requires a tokio runtime: {err}"))
        })?;

        let clock = TokioClock;

        let bucket_config = TokenBucketConfig::builder()
            .capacity(config.rate_limit.burst_capacity)
            .refill_rate(config.rate_limit.requests_per_second)
            .build()
            .map_err(config_error)?;
        let bucket = TokenBucket::with_clock(bucket_config, clock).map_err(config_error)?;

        let breaker_config = CircuitBreakerConfig::builder()
            .failure_threshold(config.circuit_breaker.failure_threshold)
            .recovery_timeout(config.circuit_breaker.recovery_timeout())
            .half_open_max_probes(config.circuit_breaker.half_open_max_probes)
            .build()
            .map_err(config_error)?;
        let breaker = CircuitBreaker::with_clock(breaker_config, clock).map_err(config_error)?;

        let retry_config = RetryConfig::builder()
            .max_attempts(config.retry.max_attempts)
            .base_delay(config.retry.base_delay())
            .max_delay(config.retry.max_delay())
            .backoff_multiplier(config.retry.backoff_multiplier)
            .jitter_fraction(config.retry.jitter_fraction)
            .build()
            .map_err(config_error)?;
        let retry = RetryPolicy::new(retry_config).map_err(config_error)?;

        let queue =
            PriorityRequestQueue::with_clock(config.queue.queue_capacity, clock).map_err(config_error)?;
        let metrics =
            MetricsCollector::new(config.metrics.latency_sample_capacity).map_err(config_error)?;

        let worker_count = config.dispatch.worker_count;
        let shared = Arc::new(Shared {
            config,
            transport,
            queue,
            bucket,
            breaker,
            retry,
            metrics,
            clock,
            cancellation: CancellationToken::new(),
            retry_timers: TaskTracker::new(),
        });

        let workers = (0..worker_count)
            .map(|worker_id| runtime.spawn(worker::run(Arc::clone(&shared), worker_id)))
            .collect();

        info!(
            base_url = %shared.config.base_url,
            worker_count,
            queue_capacity = shared.queue.capacity(),
            "Dispatcher started"
        );

        Ok(Self { shared, workers: Mutex::new(workers) })
    }

    /// Queue `request` and return a handle to its eventual outcome
    ///
    /// A request without a deadline gets `now + dispatch.default_deadline`.
    ///
    /// # Errors
    /// `QueueFull` when the queue is at capacity, `Shutdown` after
    /// [`shutdown`](Self::shutdown).
    #[instrument(skip_all, fields(request_id = %request.id, path = %request.path, priority = request.priority))]
    pub fn submit(&self, request: ApiRequest) -> Result<ResponseHandle> {
        let shared = &self.shared;
        if shared.cancellation.is_cancelled() {
            return Err(TollgateError::Shutdown);
        }

        shared.metrics.record_submitted();
        let now = shared.clock.now();
        let deadline = request.deadline.unwrap_or_else(|| now + shared.config.dispatch.default_deadline());
        let request_id = request.id;

        let (reply, receiver) = oneshot::channel();
        match shared.queue.push(Job::new(request, deadline, now, reply)) {
            Ok(sequence) => {
                debug!(sequence, "Request queued");
                Ok(ResponseHandle::new(request_id, receiver))
            }
            Err(PushError::Full(_)) => {
                let capacity = shared.queue.capacity();
                shared.metrics.record_queue_rejection();
                shared.metrics.record_failed();
                warn!(capacity, "Request rejected, queue is full");
                Err(TollgateError::QueueFull { capacity })
            }
            Err(PushError::Closed(_)) => {
                shared.metrics.record_failed();
                Err(TollgateError::Shutdown)
            }
        }
    }

    /// Submit `request` and wait for its terminal outcome
    #[instrument(skip_all, fields(request_id = %request.id, method = %request.method, path = %request.path))]
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.submit(request)?.await
    }

    /// Point-in-time copy of every counter and the latency sample
    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.shared.breaker.state()
    }

    pub fn circuit_stats(&self) -> CircuitBreakerStats {
        self.shared.breaker.stats()
    }

    /// Requests waiting in the queue; excludes in-flight attempts and pending retries
    pub fn queue_len(&self) -> usize {
        self.shared.queue.len()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.cancellation.is_cancelled()
    }

    /// Stop accepting work and wind the worker pool down
    ///
    /// Workers finish the attempt they are currently sending. Pending retry
    /// timers are cancelled and every request that has not completed is
    /// answered with [`TollgateError::Shutdown`] before this returns, so
    /// [`metrics`](Self::metrics) already counts them. Calling this twice is
    /// a no-op.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        let workers = std::mem::take(&mut *self.workers.lock());
        if workers.is_empty() && self.shared.cancellation.is_cancelled() {
            return;
        }

        info!(queued = self.shared.queue.len(), "Dispatcher shutting down");
        self.shared.cancellation.cancel();
        self.shared.queue.close();

        for result in join_all(workers).await {
            if let Err(err) = result {
                error!(error = %err, "Dispatch worker panicked");
            }
        }

        self.shared.retry_timers.close();
        self.shared.retry_timers.wait().await;

        let abandoned = self.fail_queued();
        info!(abandoned, "Dispatcher stopped");
    }

    /// Answer everything still queued with `Shutdown`
    fn fail_queued(&self) -> usize {
        let jobs = self.shared.queue.drain();
        let abandoned = jobs.len();
        for job in jobs {
            self.shared.finish(job, Err(TollgateError::Shutdown));
        }
        abandoned
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        if self.shared.cancellation.is_cancelled() {
            return;
        }

        self.shared.cancellation.cancel();
        self.shared.queue.close();
        let abandoned = self.fail_queued();
        debug!(abandoned, "Dispatcher dropped without shutdown");
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("base_url", &self.shared.config.base_url)
            .field("queue", &self.shared.queue)
            .field("circuit", &self.shared.breaker.state())
            .finish_non_exhaustive()
    }
}
