//! # Tollgate Core
//!
//! Dispatch logic for the outbound API client - no HTTP code.
//!
//! This crate contains:
//! - The [`Transport`] port every network adapter implements
//! - Outcome classification (retry class and circuit breaker accounting)
//! - The [`Dispatcher`] facade and its worker pool
//!
//! ## Architecture Principles
//! - Depends only on `tollgate-common` and `tollgate-domain`
//! - The network is reached exclusively through the `Transport` trait
//! - Time is read from the tokio clock so tests can run with paused time

pub mod dispatch;

// Infrastructure ports
pub mod transport_ports;

pub use dispatch::{Dispatcher, ResponseHandle};
pub use transport_ports::{Transport, TransportError};
