//! Transport port - the single seam between the dispatcher and the network
//!
//! The dispatcher never speaks HTTP itself. It hands each attempt to a
//! [`Transport`] together with the time budget left for that attempt and
//! classifies whatever comes back. Implementations must not retry on their
//! own; retries, rate limiting and circuit breaking all live in the
//! dispatcher.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tollgate_domain::{ApiRequest, ApiResponse, TollgateError};

/// Failure to obtain any response at all
///
/// A response with an error status is not a `TransportError`; it is returned
/// as `Ok(ApiResponse)` and classified by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection refused, reset, DNS failure, TLS failure and the like
    #[error("network error: {0}")]
    Network(String),

    /// No response within the allotted time
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl From<TransportError> for TollgateError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Network(message) => TollgateError::Network(message),
            TransportError::Timeout(elapsed) => TollgateError::Timeout(elapsed),
        }
    }
}

/// Port trait for sending one request attempt
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` and wait at most `timeout` for the complete response
    async fn send(&self, request: &ApiRequest, timeout: Duration)
        -> Result<ApiResponse, TransportError>;
}
