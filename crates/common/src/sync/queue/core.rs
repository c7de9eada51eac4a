use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{debug, info};

use super::errors::PushError;
use super::types::{Dequeued, QueueEntry, QueueItem};
use crate::error::{ConfigError, ConfigResult};
use crate::time::{Clock, SystemClock};

struct QueueState<T> {
    heap: BinaryHeap<QueueEntry<T>>,
    sequence_counter: u64,
}

/// Bounded, priority-ordered holding area for pending work
///
/// Entries are ordered by `(priority, enqueue_sequence)` ascending: lower
/// priority values first, FIFO among equal priorities. Nothing prevents a
/// steady stream of urgent items from starving lower priorities.
///
/// ## Backpressure
///
/// [`push`](Self::push) rejects new work with [`PushError::Full`] once
/// `capacity` items are held. [`requeue`](Self::requeue) is reserved for work
/// that was already admitted (scheduled retries) and skips that check, so a
/// retry can never be lost to a burst of new submissions.
///
/// ## Thread Safety
///
/// All state sits behind one `parking_lot::Mutex`; waiting consumers park on a
/// tokio [`Notify`] instead of polling. Cloning is cheap and clones share the
/// same queue.
pub struct PriorityRequestQueue<T, C: Clock = SystemClock> {
    state: Arc<Mutex<QueueState<T>>>,
    capacity: usize,
    closed: Arc<AtomicBool>,
    notify: Arc<Notify>,
    clock: Arc<C>,
}

impl<T: QueueItem> PriorityRequestQueue<T, SystemClock> {
    /// Create a queue holding at most `capacity` entries
    pub fn new(capacity: usize) -> ConfigResult<Self> {
        Self::with_clock(capacity, SystemClock)
    }
}

impl<T: QueueItem, C: Clock> PriorityRequestQueue<T, C> {
    /// Create a queue with a custom clock for deadline checks
    pub fn with_clock(capacity: usize, clock: C) -> ConfigResult<Self> {
        if capacity == 0 {
            return Err(ConfigError::invalid("queue capacity must be greater than 0"));
        }

        Ok(Self {
            state: Arc::new(Mutex::new(QueueState {
                heap: BinaryHeap::with_capacity(capacity.min(4096)),
                sequence_counter: 0,
            })),
            capacity,
            closed: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
            clock: Arc::new(clock),
        })
    }

    /// Insert new work, returning its enqueue sequence
    pub fn push(&self, item: T) -> Result<u64, PushError<T>> {
        self.insert(item, true)
    }

    /// Re-insert work that was already admitted; exempt from the capacity
    /// bound but still rejected once the queue is closed
    pub fn requeue(&self, item: T) -> Result<u64, PushError<T>> {
        self.insert(item, false)
    }

    fn insert(&self, item: T, enforce_capacity: bool) -> Result<u64, PushError<T>> {
        if self.is_closed() {
            return Err(PushError::Closed(item));
        }

        let sequence = {
            let mut state = self.state.lock();
            if enforce_capacity && state.heap.len() >= self.capacity {
                debug!(capacity = self.capacity, "Queue full, rejecting push");
                return Err(PushError::Full(item));
            }

            let sequence = state.sequence_counter;
            state.sequence_counter += 1;
            let priority = item.priority();
            state.heap.push(QueueEntry { item, priority, sequence });
            debug!(priority, sequence, len = state.heap.len(), "Item enqueued");
            sequence
        };

        self.notify.notify_one();
        Ok(sequence)
    }

    /// Pop the next entry without waiting
    pub fn try_pop(&self) -> Option<Dequeued<T>> {
        let entry = self.state.lock().heap.pop()?;
        let expired = entry.item.deadline().is_some_and(|deadline| deadline <= self.clock.now());

        if expired {
            debug!(sequence = entry.sequence, "Dequeued expired item");
            Some(Dequeued::Expired(entry.item))
        } else {
            Some(Dequeued::Ready(entry.item))
        }
    }

    /// Wait up to `timeout` for the next entry
    ///
    /// Returns `None` when the timeout elapses or when the queue is closed and
    /// empty. Entries remaining in a closed queue are still handed out.
    pub async fn pop(&self, timeout: Duration) -> Option<Dequeued<T>> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            // Register interest before checking so a push in between is not missed.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(item) = self.try_pop() {
                return Some(item);
            }

            if self.is_closed() {
                return None;
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return None;
            }
        }
    }

    /// Remove every entry in priority order
    pub fn drain(&self) -> Vec<T> {
        let mut state = self.state.lock();
        let mut items = Vec::with_capacity(state.heap.len());
        while let Some(entry) = state.heap.pop() {
            items.push(entry.item);
        }
        items
    }

    /// Reject further insertions and wake every waiting consumer
    pub fn close(&self) {
        if !self.closed.swap(true, AtomicOrdering::AcqRel) {
            info!(remaining = self.len(), "Request queue closed");
        }
        self.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(AtomicOrdering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.state.lock().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T, C: Clock> Clone for PriorityRequestQueue<T, C> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            capacity: self.capacity,
            closed: Arc::clone(&self.closed),
            notify: Arc::clone(&self.notify),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<T, C: Clock> std::fmt::Debug for PriorityRequestQueue<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriorityRequestQueue")
            .field("len", &self.state.lock().heap.len())
            .field("capacity", &self.capacity)
            .field("closed", &self.closed.load(AtomicOrdering::Relaxed))
            .finish()
    }
}
