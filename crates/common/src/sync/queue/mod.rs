// Bounded priority queue with FIFO tie-break and deadline-aware dequeue

mod core;
mod errors;
mod types;

pub use self::core::PriorityRequestQueue;
pub use self::errors::PushError;
pub use self::types::{Dequeued, QueueItem};
