//! Shared error types for the generic primitives in this crate.
//!
//! Component constructors validate their configuration up front and report
//! problems as [`ConfigError`]. Runtime operations on the primitives never
//! fail with this type; they return component-specific results instead
//! (`Acquisition`, `PushError<T>`, `CircuitOpenRejection`).

use thiserror::Error;

/// Configuration validation error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A field holds a value outside its permitted range
    #[error("Invalid configuration: {message}")]
    Invalid {
        /// Human readable description of the offending field
        message: String,
    },
}

impl ConfigError {
    /// Build an [`ConfigError::Invalid`] from any message
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid { message: message.into() }
    }

    /// The validation message
    pub fn message(&self) -> &str {
        match self {
            Self::Invalid { message } => message,
        }
    }
}

/// Configuration result type
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::invalid("capacity must be greater than 0");
        assert_eq!(err.to_string(), "Invalid configuration: capacity must be greater than 0");
        assert_eq!(err.message(), "capacity must be greater than 0");
    }
}
