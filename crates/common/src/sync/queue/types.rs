use std::cmp::Ordering;
use std::time::Instant;

/// Anything that can be held by a [`super::PriorityRequestQueue`]
pub trait QueueItem: Send + 'static {
    /// Scheduling priority; lower values are dequeued first
    fn priority(&self) -> u8;

    /// Absolute deadline after which the item is reported as expired
    fn deadline(&self) -> Option<Instant>;
}

/// Result of a successful pop
#[derive(Debug, PartialEq, Eq)]
pub enum Dequeued<T> {
    /// The item is within its deadline
    Ready(T),
    /// The item's deadline had already passed when it was popped
    Expired(T),
}

impl<T> Dequeued<T> {
    pub fn is_expired(&self) -> bool {
        matches!(self, Dequeued::Expired(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            Dequeued::Ready(item) | Dequeued::Expired(item) => item,
        }
    }
}

/// Heap entry ordered by `(priority, sequence)` ascending
pub(crate) struct QueueEntry<T> {
    pub(crate) item: T,
    pub(crate) priority: u8,
    pub(crate) sequence: u64,
}

impl<T> PartialEq for QueueEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.sequence == other.sequence
    }
}

impl<T> Eq for QueueEntry<T> {}

impl<T> PartialOrd for QueueEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for QueueEntry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so the std max-heap yields the smallest key first
        other.priority.cmp(&self.priority).then_with(|| other.sequence.cmp(&self.sequence))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BinaryHeap;

    use super::*;

    fn entry(priority: u8, sequence: u64) -> QueueEntry<()> {
        QueueEntry { item: (), priority, sequence }
    }

    #[test]
    fn test_entry_ordering_priority_then_sequence() {
        let mut heap = BinaryHeap::new();
        heap.push(entry(5, 0));
        heap.push(entry(1, 3));
        heap.push(entry(5, 1));
        heap.push(entry(1, 2));

        let order: Vec<(u8, u64)> =
            std::iter::from_fn(|| heap.pop().map(|e| (e.priority, e.sequence))).collect();
        assert_eq!(order, vec![(1, 2), (1, 3), (5, 0), (5, 1)]);
    }

    #[test]
    fn test_dequeued_into_inner() {
        assert_eq!(Dequeued::Ready(3).into_inner(), 3);
        assert!(Dequeued::Expired(3).is_expired());
    }
}
