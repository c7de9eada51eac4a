//! Scripted mock for the `Transport` port

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tollgate_core::{Transport, TransportError};
use tollgate_domain::{ApiRequest, ApiResponse};

pub type Outcome = Result<ApiResponse, TransportError>;

/// In-memory transport replaying a fixed script of outcomes.
///
/// Once the script is exhausted every call returns the fallback outcome
/// (`200 OK` unless configured otherwise). Records every call so tests can
/// assert on ordering and on the timeout each attempt was given.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Outcome>>,
    fallback: Outcome,
    latency: Duration,
    calls: AtomicUsize,
    paths: Mutex<Vec<String>>,
    timeouts: Mutex<Vec<Duration>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::always(Ok(ApiResponse::new(200)))
    }

    /// Every call returns `outcome`
    pub fn always(outcome: Outcome) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: outcome,
            latency: Duration::ZERO,
            calls: AtomicUsize::new(0),
            paths: Mutex::new(Vec::new()),
            timeouts: Mutex::new(Vec::new()),
        }
    }

    /// Append one scripted outcome
    pub fn then(self, outcome: Outcome) -> Self {
        self.script.lock().push_back(outcome);
        self
    }

    /// Sleep this long (on the tokio clock) before answering
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().clone()
    }

    pub fn timeouts(&self) -> Vec<Duration> {
        self.timeouts.lock().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &ApiRequest, timeout: Duration) -> Result<ApiResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.paths.lock().push(request.path.clone());
        self.timeouts.lock().push(timeout);

        let outcome = self.script.lock().pop_front().unwrap_or_else(|| self.fallback.clone());

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        outcome
    }
}
