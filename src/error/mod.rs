//! Keycloak Error Types
//!
//! Error hierarchy for token acquisition, decoding and transport.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Root error type for the Keycloak integration.
#[derive(Error, Debug)]
pub enum KeycloakError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("{0}")]
    Api(ApiError),

    #[error("{0}")]
    AlreadyExists(ApiError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl KeycloakError {
    /// Get error code for telemetry.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "KEYCLOAK_CONFIG",
            Self::Network(_) => "KEYCLOAK_NETWORK",
            Self::Api(_) => "KEYCLOAK_API",
            Self::AlreadyExists(_) => "KEYCLOAK_ALREADY_EXISTS",
            Self::Decode(_) => "KEYCLOAK_DECODE",
            Self::Protocol(_) => "KEYCLOAK_PROTOCOL",
        }
    }

    /// Check if the error class is transient.
    ///
    /// This is a hint for callers; the transport only retries what its
    /// configured retry conditions match.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_retryable(),
            Self::Api(e) => matches!(e.status, 502..=504),
            _ => false,
        }
    }

    /// Check whether the provider reported an "already exists" conflict.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }

    /// Provider error, if the request was rejected by the provider.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(e) | Self::AlreadyExists(e) => Some(e),
            _ => None,
        }
    }

    /// HTTP status of a provider rejection.
    pub fn status(&self) -> Option<u16> {
        self.api_error().map(|e| e.status)
    }
}

/// Configuration error.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Missing required field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Invalid proxy URL {url}: {message}")]
    InvalidProxy { url: String, message: String },

    #[error("Cannot load settings from {path}: {message}")]
    SettingsUnreadable { path: String, message: String },
}

/// Network/transport error.
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Request timeout after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("TLS error: {message}")]
    TlsError { message: String },
}

impl NetworkError {
    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::TlsError { .. })
    }
}

/// Request rejected by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// HTTP status code.
    pub status: u16,
    /// Canonical reason phrase for the status.
    pub status_text: String,
    /// Provider message, or the status text when the body carried none.
    pub message: String,
    /// OAuth2 error code (`invalid_grant`, `unauthorized_client`, ...).
    pub error: Option<String>,
    /// Admin API `errorMessage`, kept verbatim.
    pub error_message: Option<String>,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(status: u16, status_text: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            message: message.into(),
            error: None,
            error_message: None,
        }
    }

    /// Attach the OAuth2 error code.
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Check the OAuth2 error code.
    pub fn is_error(&self, code: &str) -> bool {
        self.error.as_deref() == Some(code)
    }

    /// Message retry conditions match against: `errorMessage`, then the
    /// `error` code, then the display message.
    pub fn retry_message(&self) -> &str {
        self.error_message
            .as_deref()
            .or(self.error.as_deref())
            .unwrap_or(&self.message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() || self.message == self.status_text {
            write!(f, "{} {}", self.status, self.status_text)
        } else {
            write!(f, "{} {}: {}", self.status, self.status_text, self.message)
        }
    }
}

impl std::error::Error for ApiError {}

/// Token decoding/verification error.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Malformed token: {message}")]
    Malformed { message: String },

    #[error("Token signature verification failed")]
    InvalidSignature,

    #[error("Token expired")]
    Expired,

    #[error("Token not yet valid")]
    NotYetValid,

    #[error("No signing key found for kid {kid:?}")]
    KeyNotFound { kid: Option<String> },

    #[error("Unsupported signing key: {message}")]
    UnsupportedKey { message: String },

    #[error("Invalid claims: {message}")]
    InvalidClaims { message: String },
}

impl From<jsonwebtoken::errors::Error> for DecodeError {
    fn from(error: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match error.kind() {
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::ImmatureSignature => Self::NotYetValid,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                Self::UnsupportedKey {
                    message: error.to_string(),
                }
            }
            ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidEcdsaKey | ErrorKind::InvalidKeyFormat => {
                Self::UnsupportedKey {
                    message: error.to_string(),
                }
            }
            ErrorKind::Json(_) | ErrorKind::MissingRequiredClaim(_) => Self::InvalidClaims {
                message: error.to_string(),
            },
            _ => Self::Malformed {
                message: error.to_string(),
            },
        }
    }
}

/// Protocol/response parsing error.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Unexpected redirect to: {location}")]
    UnexpectedRedirect { location: String },

    #[error("Response too large: {size} bytes")]
    ResponseTooLarge { size: usize },

    #[error("Invalid JSON: {message}")]
    InvalidJson { message: String },
}

/// Result type for Keycloak operations.
pub type KeycloakResult<T> = Result<T, KeycloakError>;

/// Error body returned by the provider.
///
/// Keycloak answers either with the OAuth2 shape (`error`,
/// `error_description`) or with the admin API shape (`errorMessage`).
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default, rename = "errorMessage")]
    pub error_message: Option<String>,
}

impl ErrorResponse {
    /// First non-empty message field, in preference order.
    pub fn message(&self) -> Option<&str> {
        [&self.error_description, &self.error, &self.error_message]
            .into_iter()
            .filter_map(|field| field.as_deref())
            .find(|message| !message.is_empty())
    }
}

/// Parse error response from HTTP body.
pub fn parse_error_response(body: &str) -> Option<ErrorResponse> {
    serde_json::from_str(body).ok()
}

/// Create error from HTTP response.
///
/// Never fails: a missing or malformed body falls back to the status text.
pub fn create_error_from_response(status: u16, status_text: &str, body: &str) -> KeycloakError {
    let status_text = if status_text.is_empty() {
        canonical_reason(status)
    } else {
        status_text.to_string()
    };

    let parsed = parse_error_response(body).unwrap_or_default();
    let message = parsed
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| status_text.clone());

    let mut error = ApiError::new(status, status_text, message);
    error.error = parsed.error.filter(|code| !code.is_empty());
    error.error_message = parsed.error_message.filter(|message| !message.is_empty());
    if status == 409 {
        KeycloakError::AlreadyExists(error)
    } else {
        KeycloakError::Api(error)
    }
}

fn canonical_reason(status: u16) -> String {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown Status")
        .to_string()
}
