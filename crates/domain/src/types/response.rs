//! Inbound response model

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::constants::{
    MAX_ERROR_BODY_CHARS, MAX_RETRY_AFTER_SECS, RETRY_AFTER_HEADER, STATUS_TOO_MANY_REQUESTS,
};
use crate::errors::{Result, TollgateError};

/// A response received from the remote service
///
/// Header names are stored lowercase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: u16) -> Self {
        Self { status, ..Self::default() }
    }

    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }

    /// Body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body decoded as JSON
    ///
    /// # Errors
    /// Returns `TollgateError::Serialization` if the body is not valid JSON
    /// for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Delay requested by a `Retry-After` header
    ///
    /// Accepts delta-seconds (`120`) or an HTTP-date
    /// (`Wed, 21 Oct 2015 07:28:00 GMT`), measured from `now`. A date in the
    /// past yields zero. Unparseable values yield `None`. Hints are capped at
    /// `MAX_RETRY_AFTER_SECS`.
    pub fn retry_after(&self, now: SystemTime) -> Option<Duration> {
        let value = self.header(RETRY_AFTER_HEADER)?.trim();
        let cap = Duration::from_secs(MAX_RETRY_AFTER_SECS);

        if let Ok(seconds) = value.parse::<u64>() {
            return Some(Duration::from_secs(seconds.min(MAX_RETRY_AFTER_SECS)));
        }

        let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
        let now = DateTime::<Utc>::from(now);
        Some((at - now).to_std().unwrap_or(Duration::ZERO).min(cap))
    }

    /// Map a non-success status onto the error taxonomy
    ///
    /// - 429 becomes `RateLimited` carrying the `Retry-After` hint
    /// - other 4xx become `Client`
    /// - 5xx become `Server`
    ///
    /// Any other status is returned unchanged.
    pub fn error_for_status(self, now: SystemTime) -> Result<Self> {
        if self.status == STATUS_TOO_MANY_REQUESTS {
            return Err(TollgateError::RateLimited { retry_after: self.retry_after(now) });
        }

        if self.is_client_error() {
            return Err(TollgateError::Client { status: self.status, message: self.error_message() });
        }

        if self.is_server_error() {
            return Err(TollgateError::Server { status: self.status, message: self.error_message() });
        }

        Ok(self)
    }

    fn error_message(&self) -> String {
        let text = self.text();
        if text.chars().count() <= MAX_ERROR_BODY_CHARS {
            return text;
        }
        let mut truncated: String = text.chars().take(MAX_ERROR_BODY_CHARS).collect();
        truncated.push_str("...");
        truncated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(rfc2822: &str) -> SystemTime {
        DateTime::parse_from_rfc2822(rfc2822).unwrap().with_timezone(&Utc).into()
    }

    #[test]
    fn test_status_predicates() {
        assert!(ApiResponse::new(204).is_success());
        assert!(ApiResponse::new(404).is_client_error());
        assert!(ApiResponse::new(503).is_server_error());
        assert!(!ApiResponse::new(302).is_success());
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let response = ApiResponse::new(200).with_header("Content-Type", "text/plain");
        assert_eq!(response.header("content-type"), Some("text/plain"));
        assert_eq!(response.header("CONTENT-TYPE"), Some("text/plain"));
    }

    #[test]
    fn test_json_and_text() {
        let response = ApiResponse::new(200).with_body(br#"{"id":7}"#.to_vec());
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(response.text(), r#"{"id":7}"#);

        let bad = ApiResponse::new(200).with_body(b"not json".to_vec());
        let err = bad.json::<serde_json::Value>().unwrap_err();
        assert!(matches!(err, TollgateError::Serialization(_)));
    }

    #[test]
    fn test_retry_after_delta_seconds() {
        let response = ApiResponse::new(429).with_header("Retry-After", " 120 ");
        assert_eq!(response.retry_after(SystemTime::now()), Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_retry_after_http_date() {
        let response =
            ApiResponse::new(429).with_header("Retry-After", "Wed, 21 Oct 2015 07:28:30 GMT");
        let now = at("Wed, 21 Oct 2015 07:28:00 GMT");
        assert_eq!(response.retry_after(now), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_retry_after_past_date_is_zero() {
        let response =
            ApiResponse::new(429).with_header("Retry-After", "Wed, 21 Oct 2015 07:28:00 GMT");
        let now = at("Wed, 21 Oct 2015 08:00:00 GMT");
        assert_eq!(response.retry_after(now), Some(Duration::ZERO));
    }

    #[test]
    fn test_retry_after_is_capped() {
        let response = ApiResponse::new(429).with_header("Retry-After", u64::MAX.to_string());
        assert_eq!(
            response.retry_after(SystemTime::now()),
            Some(Duration::from_secs(MAX_RETRY_AFTER_SECS))
        );
    }

    #[test]
    fn test_retry_after_missing_or_garbage() {
        assert_eq!(ApiResponse::new(429).retry_after(SystemTime::now()), None);
        let response = ApiResponse::new(429).with_header("Retry-After", "soon");
        assert_eq!(response.retry_after(SystemTime::now()), None);
    }

    #[test]
    fn test_error_for_status_mapping() {
        let now = SystemTime::now();
        assert!(ApiResponse::new(200).error_for_status(now).is_ok());

        let limited = ApiResponse::new(429).with_header("retry-after", "2").error_for_status(now);
        assert_eq!(
            limited.unwrap_err(),
            TollgateError::RateLimited { retry_after: Some(Duration::from_secs(2)) }
        );

        let client = ApiResponse::new(404).with_body(b"missing".to_vec()).error_for_status(now);
        assert_eq!(
            client.unwrap_err(),
            TollgateError::Client { status: 404, message: "missing".into() }
        );

        let server = ApiResponse::new(503).error_for_status(now).unwrap_err();
        assert_eq!(server.kind(), crate::ErrorKind::Server);
    }

    #[test]
    fn test_long_error_bodies_are_truncated() {
        let body = "x".repeat(MAX_ERROR_BODY_CHARS + 10);
        let err = ApiResponse::new(500).with_body(body).error_for_status(SystemTime::now());
        match err.unwrap_err() {
            TollgateError::Server { message, .. } => {
                assert_eq!(message.chars().count(), MAX_ERROR_BODY_CHARS + 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
