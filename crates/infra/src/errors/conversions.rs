//! Conversions from external infrastructure errors into domain errors.

use std::error::Error as StdError;
use std::time::Duration;

use reqwest::Error as HttpError;
use tollgate_core::TransportError;
use tollgate_domain::TollgateError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub TollgateError);

impl From<InfraError> for TollgateError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<TollgateError> for InfraError {
    fn from(value: TollgateError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoTollgateError {
    fn into_tollgate(self) -> TollgateError;
}

/// Render an error together with its source chain
///
/// reqwest's top-level message ("error sending request for url") hides the
/// useful part, which sits in the sources.
pub(crate) fn describe(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → TransportError */
/* -------------------------------------------------------------------------- */

/// Classify a failed send; only timeouts are distinguished
pub(crate) fn transport_error(err: &HttpError, timeout: Duration) -> TransportError {
    if err.is_timeout() {
        return TransportError::Timeout(timeout);
    }
    TransportError::Network(describe(err))
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → TollgateError (client construction) */
/* -------------------------------------------------------------------------- */

impl IntoTollgateError for HttpError {
    fn into_tollgate(self) -> TollgateError {
        if self.is_builder() {
            return TollgateError::Config(format!("invalid HTTP client settings: {}", describe(&self)));
        }
        TollgateError::Network(describe(&self))
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_tollgate())
    }
}

/* -------------------------------------------------------------------------- */
/* toml / serde_json / io → TollgateError::Config */
/* -------------------------------------------------------------------------- */

impl IntoTollgateError for toml::de::Error {
    fn into_tollgate(self) -> TollgateError {
        TollgateError::Config(format!("Invalid TOML format: {}", self.message()))
    }
}

impl From<toml::de::Error> for InfraError {
    fn from(value: toml::de::Error) -> Self {
        InfraError(value.into_tollgate())
    }
}

impl IntoTollgateError for serde_json::Error {
    fn into_tollgate(self) -> TollgateError {
        TollgateError::Config(format!("Invalid JSON format: {self}"))
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(value.into_tollgate())
    }
}

impl IntoTollgateError for std::io::Error {
    fn into_tollgate(self) -> TollgateError {
        TollgateError::Config(format!("Failed to read config file: {self}"))
    }
}

impl From<std::io::Error> for InfraError {
    fn from(value: std::io::Error) -> Self {
        InfraError(value.into_tollgate())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
