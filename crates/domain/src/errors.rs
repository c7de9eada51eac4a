//! Error taxonomy for outbound requests

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::impl_enum_str_conversions;

/// Main error type for Tollgate
///
/// Every terminal outcome handed back to a caller is one of these variants.
/// Transient variants (`Network`, `Timeout`, `Server`, `RateLimited`) are
/// retried internally before they ever reach the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "details")]
pub enum TollgateError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Client error {status}: {message}")]
    Client { status: u16, message: String },

    #[error("Rate limited by server (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Circuit breaker is open")]
    CircuitOpen,

    #[error("Request queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },

    #[error("Request deadline exceeded")]
    DeadlineExceeded,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Client is shut down")]
    Shutdown,
}

/// Fieldless discriminant of [`TollgateError`], for metrics labels and
/// matching without caring about payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    Timeout,
    Client,
    RateLimited,
    Server,
    CircuitOpen,
    QueueFull,
    DeadlineExceeded,
    Serialization,
    Config,
    Shutdown,
}

impl_enum_str_conversions!(ErrorKind {
    Network => "network",
    Timeout => "timeout",
    Client => "client",
    RateLimited => "rate_limited",
    Server => "server",
    CircuitOpen => "circuit_open",
    QueueFull => "queue_full",
    DeadlineExceeded => "deadline_exceeded",
    Serialization => "serialization",
    Config => "config",
    Shutdown => "shutdown",
});

impl TollgateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(_) => ErrorKind::Network,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Client { .. } => ErrorKind::Client,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::Server { .. } => ErrorKind::Server,
            Self::CircuitOpen => ErrorKind::CircuitOpen,
            Self::QueueFull { .. } => ErrorKind::QueueFull,
            Self::DeadlineExceeded => ErrorKind::DeadlineExceeded,
            Self::Serialization(_) => ErrorKind::Serialization,
            Self::Config(_) => ErrorKind::Config,
            Self::Shutdown => ErrorKind::Shutdown,
        }
    }

    /// Whether the failure is transient and worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Timeout(_) | Self::Server { .. } | Self::RateLimited { .. }
        )
    }

    /// HTTP status carried by the error, if it came from a response
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Client { status, .. } | Self::Server { status, .. } => Some(*status),
            Self::RateLimited { .. } => Some(crate::constants::STATUS_TOO_MANY_REQUESTS),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for TollgateError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias for Tollgate operations
pub type Result<T> = std::result::Result<T, TollgateError>;
