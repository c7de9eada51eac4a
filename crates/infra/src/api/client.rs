//! API client over the resilient dispatcher
//!
//! Wires an [`HttpTransport`] (or any other [`Transport`]) into a
//! [`Dispatcher`] and adds typed JSON helpers on top.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tollgate_common::MetricsSnapshot;
use tollgate_core::{Dispatcher, ResponseHandle, Transport};
use tollgate_domain::{ApiRequest, ApiResponse, ClientConfig, Result, TollgateError};
use tracing::{debug, instrument};

use crate::http::HttpTransport;

/// Outbound API client with rate limiting, circuit breaking and retries
///
/// Every call goes through the dispatcher; the helpers only deal with
/// encoding and decoding. Non-2xx statuses arrive as `TollgateError`
/// variants, never as `Ok` responses.
pub struct ApiClient {
    dispatcher: Dispatcher,
}

impl ApiClient {
    /// Create a client that talks HTTP to `config.base_url`
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// Returns `TollgateError::Config` if the config is invalid or the HTTP
    /// client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::from_settings(config.base_url.clone(), &config.transport)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a client over a custom transport
    ///
    /// # Errors
    /// See [`Dispatcher::new`].
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        Ok(Self { dispatcher: Dispatcher::new(config, transport)? })
    }

    /// Send a request and wait for its final outcome
    #[instrument(skip_all, fields(method = %request.method, path = %request.path))]
    pub async fn request(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.dispatcher.execute(request).await
    }

    /// Enqueue a request without waiting for it
    ///
    /// # Errors
    /// Fails fast with `QueueFull` or `Shutdown`.
    pub fn submit(&self, request: ApiRequest) -> Result<ResponseHandle> {
        self.dispatcher.submit(request)
    }

    /// GET `path` and decode the JSON body
    ///
    /// An empty body (e.g. `204 No Content`) decodes as JSON `null`, so
    /// `Option<T>` and `()` work for endpoints without content.
    #[instrument(skip(self), fields(path = %path))]
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.request(ApiRequest::get(path).with_header("accept", "application/json")).await?;
        decode(&response)
    }

    /// POST `body` as JSON to `path` and decode the JSON response
    #[instrument(skip(self, body), fields(path = %path))]
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = ApiRequest::post(path).json_body(body)?.with_header("accept", "application/json");
        let response = self.request(request).await?;
        decode(&response)
    }

    /// Point-in-time metrics
    pub fn metrics(&self) -> MetricsSnapshot {
        self.dispatcher.metrics()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Stop accepting work, finish in-flight requests, fail queued ones
    pub async fn shutdown(&self) {
        self.dispatcher.shutdown().await;
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient").field("dispatcher", &self.dispatcher).finish()
    }
}

fn decode<T: DeserializeOwned>(response: &ApiResponse) -> Result<T> {
    if response.body.iter().all(u8::is_ascii_whitespace) {
        debug!(status = response.status, "empty response body, decoding as null");
        return serde_json::from_value(serde_json::Value::Null).map_err(|e| {
            TollgateError::Serialization(format!(
                "empty {} response cannot be decoded: {e}",
                response.status
            ))
        });
    }
    response.json()
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Widget {
        id: u32,
    }

    #[test]
    fn decode_json_body() {
        let response = ApiResponse::new(200).with_body(r#"{"id": 7}"#);
        assert_eq!(decode::<Widget>(&response).unwrap(), Widget { id: 7 });
    }

    #[test]
    fn decode_empty_body_as_null() {
        let response = ApiResponse::new(204);
        assert_eq!(decode::<Option<Widget>>(&response).unwrap(), None);
        decode::<()>(&response).unwrap();

        let err = decode::<Widget>(&response).unwrap_err();
        assert!(matches!(err, TollgateError::Serialization(ref msg) if msg.contains("204")));
    }

    #[test]
    fn decode_invalid_json_is_serialization_error() {
        let response = ApiResponse::new(200).with_body("not json");
        assert!(matches!(decode::<Widget>(&response), Err(TollgateError::Serialization(_))));
    }
}
