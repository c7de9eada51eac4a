//! Worker pool internals
//!
//! Each worker repeatedly pops the most urgent job and drives one attempt
//! through the rate limiter, the circuit breaker and the transport. Failed
//! attempts that deserve a retry are parked in a timer task so the worker is
//! free for the next job immediately.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tollgate_common::{
    Acquisition, CircuitBreaker, Clock, Dequeued, MetricsCollector, PriorityRequestQueue,
    RetryPolicy, TokenBucket, TokioClock,
};
use tollgate_domain::{ApiResponse, ClientConfig, Result, TollgateError};
use tracing::{debug, info, instrument, warn};

use super::classify::{breaker_verdict, retry_class, BreakerVerdict};
use super::job::Job;
use crate::transport_ports::Transport;

/// Tokens debited from the bucket per attempt
const ATTEMPT_COST: f64 = 1.0;

/// State shared by the dispatcher facade, its workers and retry timers
pub(crate) struct Shared {
    pub(crate) config: ClientConfig,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) queue: PriorityRequestQueue<Job, TokioClock>,
    pub(crate) bucket: TokenBucket<TokioClock>,
    pub(crate) breaker: CircuitBreaker<TokioClock>,
    pub(crate) retry: RetryPolicy,
    pub(crate) metrics: MetricsCollector,
    pub(crate) clock: TokioClock,
    pub(crate) cancellation: CancellationToken,
    /// Pending retry timers, awaited by `Dispatcher::shutdown`
    pub(crate) retry_timers: TaskTracker,
}

impl Shared {
    /// Record the terminal outcome of an admitted job and answer its caller
    pub(crate) fn finish(&self, job: Job, outcome: Result<ApiResponse>) {
        let latency = self.clock.now().saturating_duration_since(job.submitted_at);
        self.metrics.record_latency(latency);

        let request_id = job.request.id;
        match &outcome {
            Ok(response) => {
                self.metrics.record_succeeded();
                debug!(%request_id, status = response.status, attempt = job.attempt, ?latency, "Request succeeded");
            }
            Err(TollgateError::Shutdown) => {
                self.metrics.record_failed();
                debug!(%request_id, "Request abandoned at shutdown");
            }
            Err(err) => {
                self.metrics.record_failed();
                if matches!(err, TollgateError::DeadlineExceeded) {
                    self.metrics.record_deadline_exceeded();
                }
                warn!(%request_id, error = %err, kind = %err.kind(), attempt = job.attempt, "Request failed");
            }
        }

        if !job.respond(outcome) {
            debug!(%request_id, "Caller dropped the response handle");
        }
    }

    /// A job popped after its deadline
    fn expire(&self, mut job: Job) {
        if let Some(last_error) = job.last_error.take() {
            debug!(
                request_id = %job.request.id,
                attempt = job.attempt,
                last_error = %last_error,
                "Pending retry ran past the deadline"
            );
        }
        self.finish(job, Err(TollgateError::DeadlineExceeded));
    }

    /// Drive one attempt of `job`
    ///
    /// The rate-limit token is taken before the breaker check, so a request
    /// rejected with `CircuitOpen` still spends its token.
    #[instrument(skip_all, fields(request_id = %job.request.id, path = %job.request.path, attempt = job.attempt))]
    async fn process(self: &Arc<Self>, job: Job) {
        if let Err(err) = self.wait_for_token(&job).await {
            return self.finish(job, Err(err));
        }

        let admission = match self.breaker.try_acquire() {
            Ok(admission) => admission,
            Err(rejection) => {
                self.metrics.record_circuit_rejection();
                debug!(state = %rejection.state, retry_in = ?rejection.retry_in, "Rejected by circuit breaker");
                return self.finish(job, Err(TollgateError::CircuitOpen));
            }
        };
        if let Some(transition) = admission.transition {
            self.metrics.record_circuit_transition(transition);
        }
        let permit = admission.permit;

        let remaining = job.deadline.saturating_duration_since(self.clock.now());
        if remaining.is_zero() {
            self.breaker.release(permit);
            return self.finish(job, Err(TollgateError::DeadlineExceeded));
        }

        let timeout = self.config.dispatch.request_timeout().min(remaining);
        self.metrics.record_sent();
        debug!(method = %job.request.method, ?timeout, "Sending request");

        let outcome = match tokio::time::timeout(timeout, self.transport.send(&job.request, timeout)).await {
            Ok(Ok(response)) => response.error_for_status(self.clock.system_time()),
            Ok(Err(err)) => Err(err.into()),
            Err(_) => Err(TollgateError::Timeout(timeout)),
        };

        let verdict = breaker_verdict(&outcome, self.config.circuit_breaker.count_rate_limit_as_failure);
        let transition = match verdict {
            BreakerVerdict::Success => self.breaker.record_success(permit),
            BreakerVerdict::Failure => self.breaker.record_failure(permit),
            BreakerVerdict::Neutral => {
                self.breaker.release(permit);
                None
            }
        };
        if let Some(transition) = transition {
            self.metrics.record_circuit_transition(transition);
        }

        match outcome {
            Ok(response) => self.finish(job, Ok(response)),
            Err(err) => self.retry_or_fail(job, err),
        }
    }

    /// Wait for a rate-limit token without crossing the job's deadline
    async fn wait_for_token(&self, job: &Job) -> Result<()> {
        let mut counted = false;
        loop {
            let wait = match self.bucket.try_acquire(ATTEMPT_COST) {
                Acquisition::Acquired => return Ok(()),
                Acquisition::Wait(wait) => wait,
            };

            let past_deadline = self.clock.now().checked_add(wait).map_or(true, |ready| ready > job.deadline);
            if past_deadline {
                debug!(?wait, "Rate-limit wait would cross the deadline");
                return Err(TollgateError::DeadlineExceeded);
            }

            if !counted {
                self.metrics.record_rate_limited_wait();
                counted = true;
            }
            debug!(?wait, "Waiting for rate-limit token");

            tokio::select! {
                () = self.cancellation.cancelled() => return Err(TollgateError::Shutdown),
                () = tokio::time::sleep(wait) => {}
            }
        }
    }

    fn retry_or_fail(self: &Arc<Self>, mut job: Job, err: TollgateError) {
        let Some(delay) = self.retry.next_delay(job.attempt, retry_class(&err)) else {
            return self.finish(job, Err(err));
        };

        let starts_in_time = self.clock.now().checked_add(delay).is_some_and(|start| start < job.deadline);
        if !starts_in_time {
            debug!(?delay, error = %err, "Retry could not start before the deadline");
            return self.finish(job, Err(TollgateError::DeadlineExceeded));
        }

        job.attempt += 1;
        self.metrics.record_retry();
        debug!(?delay, error = %err, next_attempt = job.attempt, "Scheduling retry");
        job.last_error = Some(err);
        self.schedule_retry(job, delay);
    }

    /// Park `job` in a timer task and re-insert it once `delay` has passed
    fn schedule_retry(self: &Arc<Self>, job: Job, delay: Duration) {
        let shared = Arc::clone(self);
        self.retry_timers.spawn(async move {
            tokio::select! {
                () = shared.cancellation.cancelled() => shared.finish(job, Err(TollgateError::Shutdown)),
                () = tokio::time::sleep(delay) => {
                    if let Err(rejected) = shared.queue.requeue(job) {
                        shared.finish(rejected.into_inner(), Err(TollgateError::Shutdown));
                    }
                }
            }
        });
    }
}

/// Worker loop; exits once the dispatcher is cancelled
pub(crate) async fn run(shared: Arc<Shared>, worker_id: usize) {
    let idle_poll = shared.config.dispatch.idle_poll();
    debug!(worker_id, "Dispatch worker started");

    loop {
        let next = tokio::select! {
            biased;
            () = shared.cancellation.cancelled() => break,
            next = shared.queue.pop(idle_poll) => next,
        };

        match next {
            Some(Dequeued::Ready(job)) => shared.process(job).await,
            Some(Dequeued::Expired(job)) => {
                debug!(worker_id, request_id = %job.request.id, "Dequeued request past its deadline");
                shared.expire(job);
            }
            None if shared.queue.is_closed() => break,
            None => {}
        }
    }

    info!(worker_id, "Dispatch worker stopped");
}
