//! Configuration Builder
//!
//! Fluent builder for Keycloak configuration. All validation happens in
//! [`KeycloakConfigBuilder::build`], before any request is issued.

use std::time::Duration;
use url::Url;

use crate::error::{ConfigurationError, KeycloakError};
use crate::types::{
    ClientAuthMethod, KeycloakConfig, DEFAULT_ADMIN_CLIENT_ID, DEFAULT_BASE_PATH,
    DEFAULT_MAX_RESPONSE_SIZE, DEFAULT_TIMEOUT_MS,
};

/// Keycloak configuration builder.
#[derive(Debug)]
pub struct KeycloakConfigBuilder {
    base_url: Option<String>,
    base_path: String,
    admin_client_id: String,
    auth_method: ClientAuthMethod,
    timeout: Duration,
    max_response_size: usize,
    proxy: Option<String>,
    insecure_skip_verify: bool,
}

impl Default for KeycloakConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl KeycloakConfigBuilder {
    pub fn new() -> Self {
        Self {
            base_url: None,
            base_path: DEFAULT_BASE_PATH.to_string(),
            admin_client_id: DEFAULT_ADMIN_CLIENT_ID.to_string(),
            auth_method: ClientAuthMethod::default(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
            proxy: None,
            insecure_skip_verify: false,
        }
    }

    /// Set provider base URL (the `hostname` of a settings file).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set path prefix; empty for providers without the legacy `/auth`.
    pub fn base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    /// Set client used for admin logins.
    pub fn admin_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.admin_client_id = client_id.into();
        self
    }

    /// Set client authentication method.
    pub fn auth_method(mut self, method: ClientAuthMethod) -> Self {
        self.auth_method = method;
        self
    }

    /// Set request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_response_size(mut self, bytes: usize) -> Self {
        self.max_response_size = bytes;
        self
    }

    /// Route every request through an HTTP(S) proxy.
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Skip TLS certificate validation.
    pub fn insecure_skip_verify(mut self, skip: bool) -> Self {
        self.insecure_skip_verify = skip;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> Result<KeycloakConfig, KeycloakError> {
        let base_url = self
            .base_url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| ConfigurationError::MissingRequired {
                field: "base_url".to_string(),
            })?;

        let parsed = Url::parse(base_url.trim()).map_err(|e| ConfigurationError::InvalidUrl {
            url: base_url.clone(),
            message: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.cannot_be_a_base() {
            return Err(ConfigurationError::InvalidUrl {
                url: base_url,
                message: "expected an http or https URL".to_string(),
            }
            .into());
        }

        let proxy = match self.proxy.filter(|p| !p.trim().is_empty()) {
            Some(proxy) => Some(parse_proxy(&proxy)?),
            None => None,
        };

        if self.admin_client_id.is_empty() {
            return Err(ConfigurationError::MissingRequired {
                field: "admin_client_id".to_string(),
            }
            .into());
        }

        if self.timeout.is_zero() {
            return Err(ConfigurationError::InvalidConfig {
                message: "timeout must be greater than zero".to_string(),
            }
            .into());
        }

        Ok(KeycloakConfig {
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            base_path: self.base_path,
            admin_client_id: self.admin_client_id,
            auth_method: self.auth_method,
            timeout: self.timeout,
            max_response_size: self.max_response_size,
            proxy,
            insecure_skip_verify: self.insecure_skip_verify,
        })
    }
}

fn parse_proxy(proxy: &str) -> Result<Url, ConfigurationError> {
    let url = Url::parse(proxy.trim()).map_err(|e| ConfigurationError::InvalidProxy {
        url: proxy.to_string(),
        message: e.to_string(),
    })?;

    if url.host_str().is_none() {
        return Err(ConfigurationError::InvalidProxy {
            url: proxy.to_string(),
            message: "proxy URL has no host".to_string(),
        });
    }

    Ok(url)
}

/// Create a new Keycloak configuration builder.
pub fn keycloak_config() -> KeycloakConfigBuilder {
    KeycloakConfigBuilder::new()
}
