use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client as ReqwestClient;
use tollgate_core::{Transport, TransportError};
use tollgate_domain::constants::{DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_USER_AGENT};
use tollgate_domain::{ApiRequest, ApiResponse, Method, Result, TollgateError, TransportSettings};
use tracing::debug;

use crate::errors::conversions::transport_error;
use crate::errors::InfraError;

/// reqwest-backed implementation of the [`Transport`] port.
///
/// Resolves request paths against a base URL, applies the configured user
/// agent and default headers, and maps failures onto [`TransportError`]. It
/// never retries; that is the dispatcher's job.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: ReqwestClient,
    base_url: String,
}

impl HttpTransport {
    /// Start building a new HTTP transport.
    pub fn builder(base_url: impl Into<String>) -> HttpTransportBuilder {
        HttpTransportBuilder::new(base_url)
    }

    /// Build a transport from the `[transport]` config section.
    pub fn from_settings(base_url: impl Into<String>, settings: &TransportSettings) -> Result<Self> {
        Self::builder(base_url)
            .user_agent(settings.user_agent.clone())
            .connect_timeout(settings.connect_timeout())
            .default_headers(settings.default_headers.iter().map(|(k, v)| (k.clone(), v.clone())))
            .build()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a request path
    ///
    /// Paths that are already absolute URLs are used as-is.
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        if path.is_empty() {
            return self.base_url.clone();
        }
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
        Method::Head => reqwest::Method::HEAD,
        Method::Options => reqwest::Method::OPTIONS,
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest, timeout: Duration) -> std::result::Result<ApiResponse, TransportError> {
        let url = self.url_for(&request.path);
        let method = to_reqwest_method(request.method);
        debug!(request_id = %request.id, %method, %url, ?timeout, "sending HTTP request");

        let mut builder = self.client.request(method, &url).timeout(timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(|err| transport_error(&err, timeout))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value.to_str().ok().map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(|err| transport_error(&err, timeout))?.to_vec();

        debug!(request_id = %request.id, status, bytes = body.len(), "received HTTP response");
        Ok(ApiResponse { status, headers, body })
    }
}

/// Builder for [`HttpTransport`].
#[derive(Debug)]
pub struct HttpTransportBuilder {
    base_url: String,
    user_agent: String,
    connect_timeout: Duration,
    default_headers: Vec<(String, String)>,
}

impl HttpTransportBuilder {
    fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            default_headers: Vec::new(),
        }
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Header sent with every request unless the request sets it itself.
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    pub fn default_headers<I>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.default_headers.extend(headers);
        self
    }

    pub fn build(self) -> Result<HttpTransport> {
        let base_url = self.base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(TollgateError::Config(format!(
                "base_url must start with http:// or https://, got {:?}",
                self.base_url
            )));
        }

        let mut headers = HeaderMap::with_capacity(self.default_headers.len());
        for (name, value) in &self.default_headers {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|err| {
                TollgateError::Config(format!("invalid default header name {name:?}: {err}"))
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|err| {
                TollgateError::Config(format!("invalid value for default header {name:?}: {err}"))
            })?;
            headers.insert(header_name, header_value);
        }

        let client = ReqwestClient::builder()
            .user_agent(self.user_agent)
            .connect_timeout(self.connect_timeout)
            .default_headers(headers)
            .no_proxy()
            .build()
            .map_err(|err| TollgateError::from(InfraError::from(err)))?;

        Ok(HttpTransport { client, base_url })
    }
}
