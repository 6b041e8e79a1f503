//! HTTP Transport
//!
//! HTTP client interface and implementations for Keycloak requests.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::de::DeserializeOwned;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use crate::core::sync::lock;
use crate::error::{ConfigurationError, KeycloakError, KeycloakResult, NetworkError, ProtocolError};
use crate::types::{KeycloakConfig, DEFAULT_MAX_RESPONSE_SIZE, DEFAULT_TIMEOUT_MS};

/// HTTP request definition.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    /// Header names are lowercase.
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
    /// Per-request timeout overriding the transport default.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: [("accept".to_string(), "application/json".to_string())]
                .into_iter()
                .collect(),
            body: None,
            timeout: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    /// Set a header.
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Bearer authorization.
    pub fn bearer(self, access_token: &str) -> Self {
        self.header("authorization", format!("Bearer {}", access_token))
    }

    /// HTTP Basic authorization.
    pub fn basic_auth(self, username: &str, password: &str) -> Self {
        let credentials = STANDARD.encode(format!("{}:{}", username, password));
        self.header("authorization", format!("Basic {}", credentials))
    }

    /// `application/x-www-form-urlencoded` body.
    pub fn form(mut self, fields: &[(&str, String)]) -> Self {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields.iter().map(|(k, v)| (*k, v.as_str())))
            .finish();
        self.body = Some(body);
        self.header("content-type", "application/x-www-form-urlencoded")
    }

    /// JSON body.
    pub fn json<T: serde::Serialize>(mut self, value: &T) -> KeycloakResult<Self> {
        let body = serde_json::to_string(value).map_err(|e| ProtocolError::InvalidJson {
            message: e.to_string(),
        })?;
        self.body = Some(body);
        Ok(self.header("content-type", "application/json"))
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// HTTP method.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP response definition.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    /// Header names are lowercase.
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl HttpResponse {
    /// Response with a status and body.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        let status_text = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("")
            .to_string();

        Self {
            status,
            status_text,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Response carrying `value` as JSON.
    pub fn json<T: serde::Serialize>(status: u16, value: &T) -> Self {
        let mut response = Self::new(status, serde_json::to_string(value).unwrap_or_default());
        response
            .headers
            .insert("content-type".to_string(), "application/json".to_string());
        response
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Deserialize the body.
    pub fn parse_json<T: DeserializeOwned>(&self) -> KeycloakResult<T> {
        serde_json::from_str(&self.body).map_err(|e| {
            ProtocolError::InvalidJson {
                message: e.to_string(),
            }
            .into()
        })
    }
}

/// HTTP transport interface (for dependency injection).
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send an HTTP request.
    ///
    /// Non-2xx answers are returned as responses, not errors.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, KeycloakError>;
}

#[async_trait]
impl<T: HttpTransport + ?Sized> HttpTransport for std::sync::Arc<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, KeycloakError> {
        (**self).send(request).await
    }
}

/// Default reqwest-based HTTP transport.
///
/// Redirects are not followed: a 3xx answer is a protocol error.
pub struct ReqwestHttpTransport {
    client: reqwest::Client,
    default_timeout: Duration,
    max_response_size: usize,
}

impl ReqwestHttpTransport {
    /// Create a transport from client configuration (timeout, size cap,
    /// TLS verification and proxy).
    pub fn from_config(config: &KeycloakConfig) -> KeycloakResult<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::none())
            .danger_accept_invalid_certs(config.insecure_skip_verify);

        if let Some(proxy) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy.as_str()).map_err(|e| {
                ConfigurationError::InvalidProxy {
                    url: proxy.to_string(),
                    message: e.to_string(),
                }
            })?;
            builder = builder.proxy(proxy);
        } else {
            // Only the configured proxy applies, never HTTP_PROXY and friends.
            builder = builder.no_proxy();
        }

        let client = builder.build().map_err(|e| ConfigurationError::InvalidConfig {
            message: format!("cannot create HTTP client: {}", e),
        })?;

        Ok(Self {
            client,
            default_timeout: config.timeout,
            max_response_size: config.max_response_size,
        })
    }

    /// Create transport with custom options and no proxy.
    pub fn with_options(timeout: Duration, max_response_size: usize) -> KeycloakResult<Self> {
        Self::from_config(&KeycloakConfig {
            timeout,
            max_response_size,
            ..Default::default()
        })
    }

    fn map_send_error(error: reqwest::Error, timeout: Duration) -> KeycloakError {
        if error.is_timeout() {
            return NetworkError::Timeout { timeout }.into();
        }

        let mut message = error.to_string();
        let mut source = std::error::Error::source(&error);
        while let Some(cause) = source {
            message = format!("{}: {}", message, cause);
            source = cause.source();
        }

        let lowered = message.to_ascii_lowercase();
        if lowered.contains("certificate") || lowered.contains("tls") {
            NetworkError::TlsError { message }.into()
        } else {
            NetworkError::ConnectionFailed { message }.into()
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestHttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, KeycloakError> {
        let timeout = request.timeout.unwrap_or(self.default_timeout);

        let mut req_builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
            HttpMethod::Put => self.client.put(&request.url),
            HttpMethod::Patch => self.client.patch(&request.url),
            HttpMethod::Delete => self.client.delete(&request.url),
        };

        for (key, value) in &request.headers {
            req_builder = req_builder.header(key, value);
        }

        if let Some(body) = request.body {
            req_builder = req_builder.body(body);
        }

        let mut response = req_builder
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Self::map_send_error(e, timeout))?;

        let status = response.status().as_u16();
        let status_text = response
            .status()
            .canonical_reason()
            .unwrap_or("")
            .to_string();

        if (300..400).contains(&status) {
            let location = response
                .headers()
                .get("location")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();
            return Err(ProtocolError::UnexpectedRedirect { location }.into());
        }

        let headers = response
            .headers()
            .iter()
            .filter_map(|(key, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (key.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        if let Some(len) = response.content_length() {
            if len as usize > self.max_response_size {
                return Err(ProtocolError::ResponseTooLarge { size: len as usize }.into());
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Self::map_send_error(e, timeout))?
        {
            body.extend_from_slice(&chunk);
            if body.len() > self.max_response_size {
                return Err(ProtocolError::ResponseTooLarge { size: body.len() }.into());
            }
        }

        let body = String::from_utf8(body).map_err(|e| ProtocolError::InvalidResponse {
            message: format!("response body is not valid UTF-8: {}", e.utf8_error()),
        })?;

        Ok(HttpResponse {
            status,
            status_text,
            headers,
            body,
        })
    }
}

enum MockReply {
    Response(HttpResponse),
    ConnectionFailure(String),
}

/// Mock HTTP transport for testing.
///
/// Replies are served in the order they were queued; once the queue is
/// drained the default response (if any) is returned.
#[derive(Default)]
pub struct MockHttpTransport {
    replies: Mutex<VecDeque<MockReply>>,
    request_history: Mutex<Vec<HttpRequest>>,
    default_response: Mutex<Option<HttpResponse>>,
}

impl MockHttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response to return.
    pub fn queue_response(&self, response: HttpResponse) -> &Self {
        lock(&self.replies).push_back(MockReply::Response(response));
        self
    }

    /// Queue a JSON response.
    pub fn queue_json_response<T: serde::Serialize>(&self, status: u16, body: &T) -> &Self {
        self.queue_response(HttpResponse::json(status, body))
    }

    /// Queue a connection failure.
    pub fn queue_connection_failure(&self, message: impl Into<String>) -> &Self {
        lock(&self.replies).push_back(MockReply::ConnectionFailure(message.into()));
        self
    }

    /// Set default response when queue is empty.
    pub fn set_default_response(&self, response: HttpResponse) -> &Self {
        *lock(&self.default_response) = Some(response);
        self
    }

    /// Get request history.
    pub fn get_requests(&self) -> Vec<HttpRequest> {
        lock(&self.request_history).clone()
    }

    /// Get last request.
    pub fn get_last_request(&self) -> Option<HttpRequest> {
        lock(&self.request_history).last().cloned()
    }

    /// Number of requests received.
    pub fn request_count(&self) -> usize {
        lock(&self.request_history).len()
    }

    /// Clear request history.
    pub fn clear_history(&self) {
        lock(&self.request_history).clear();
    }
}

#[async_trait]
impl HttpTransport for MockHttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, KeycloakError> {
        lock(&self.request_history).push(request);

        let reply = lock(&self.replies).pop_front();
        match reply {
            Some(MockReply::Response(response)) => Ok(response),
            Some(MockReply::ConnectionFailure(message)) => {
                Err(NetworkError::ConnectionFailed { message }.into())
            }
            None => lock(&self.default_response).clone().ok_or_else(|| {
                NetworkError::ConnectionFailed {
                    message: "No mock response available".to_string(),
                }
                .into()
            }),
        }
    }
}

/// Create production HTTP transport with default settings.
pub fn create_transport(timeout: Option<Duration>) -> KeycloakResult<ReqwestHttpTransport> {
    ReqwestHttpTransport::with_options(
        timeout.unwrap_or(Duration::from_millis(DEFAULT_TIMEOUT_MS)),
        DEFAULT_MAX_RESPONSE_SIZE,
    )
}

/// Create mock HTTP transport for testing.
pub fn create_mock_transport() -> MockHttpTransport {
    MockHttpTransport::new()
}
