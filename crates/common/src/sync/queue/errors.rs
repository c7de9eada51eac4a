use std::fmt;

use thiserror::Error;

/// Rejected insertion; the item is handed back to the caller
#[derive(Error, PartialEq, Eq)]
pub enum PushError<T> {
    /// The queue holds `capacity` items (backpressure)
    #[error("Queue is at maximum capacity")]
    Full(T),

    /// The queue was closed
    #[error("Queue is closed")]
    Closed(T),
}

impl<T> PushError<T> {
    /// Recover the rejected item
    pub fn into_inner(self) -> T {
        match self {
            PushError::Full(item) | PushError::Closed(item) => item,
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, PushError::Full(_))
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, PushError::Closed(_))
    }
}

// Items are usually not `Debug`; only the variant is shown.
impl<T> fmt::Debug for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PushError::Full(_) => f.write_str("Full(..)"),
            PushError::Closed(_) => f.write_str("Closed(..)"),
        }
    }
}
