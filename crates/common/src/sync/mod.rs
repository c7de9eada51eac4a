//! Synchronization primitives for handing work between tasks
//!
//! ## Submodules
//!
//! - **`queue`**: bounded priority queue consumed by a pool of async workers
//!
//! The queue is generic over [`QueueItem`]; it only needs a priority and an
//! optional deadline from the items it holds.

pub mod queue;

pub use queue::{Dequeued, PriorityRequestQueue, PushError, QueueItem};
