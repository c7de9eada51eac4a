//! Time utilities and abstractions
//!
//! - **Clock abstractions**: real, tokio-driven and mock time
//!
//! ## Usage
//!
//! ```rust
//! use std::time::Duration;
//!
//! use tollgate_common::time::{Clock, MockClock};
//!
//! let clock = MockClock::new();
//! let before = clock.now();
//! clock.advance(Duration::from_secs(5));
//! assert!(clock.now() > before);
//! ```

pub mod clock;

#[cfg(feature = "runtime")]
pub use clock::TokioClock;
pub use clock::{Clock, MockClock, SystemClock};
