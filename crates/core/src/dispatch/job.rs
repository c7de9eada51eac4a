use std::time::Instant;

use tokio::sync::oneshot;
use tollgate_common::QueueItem;
use tollgate_domain::{ApiRequest, ApiResponse, Result, TollgateError};

/// A request in flight through the dispatcher
///
/// Owned by the queue until popped, then by exactly one worker. While a retry
/// is pending the job is owned by its timer task.
pub(crate) struct Job {
    pub(crate) request: ApiRequest,
    /// Resolved absolute deadline
    pub(crate) deadline: Instant,
    /// Retries already performed
    pub(crate) attempt: u32,
    pub(crate) submitted_at: Instant,
    /// Error of the most recent attempt, logged if a scheduled retry expires
    /// in the queue
    pub(crate) last_error: Option<TollgateError>,
    reply: oneshot::Sender<Result<ApiResponse>>,
}

impl Job {
    pub(crate) fn new(
        request: ApiRequest,
        deadline: Instant,
        submitted_at: Instant,
        reply: oneshot::Sender<Result<ApiResponse>>,
    ) -> Self {
        Self { request, deadline, attempt: 0, submitted_at, last_error: None, reply }
    }

    /// Hand the terminal outcome back to the caller
    ///
    /// Returns `false` when the caller dropped its handle.
    pub(crate) fn respond(self, outcome: Result<ApiResponse>) -> bool {
        self.reply.send(outcome).is_ok()
    }
}

impl QueueItem for Job {
    fn priority(&self) -> u8 {
        self.request.priority
    }

    fn deadline(&self) -> Option<Instant> {
        Some(self.deadline)
    }
}
