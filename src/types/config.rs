//! Configuration Types
//!
//! Provider connection settings and endpoint layout.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::core::HttpRequest;
use crate::error::{ConfigurationError, KeycloakResult};

/// Keycloak client configuration.
#[derive(Clone, Debug)]
pub struct KeycloakConfig {
    /// Scheme, host and port of the provider, e.g. `https://sso.example.com`.
    pub base_url: String,
    /// Path prefix in front of `realms/` and `admin/` (legacy `/auth`).
    pub base_path: String,
    /// Client used by [`login_admin`](crate::KeycloakClient::login_admin).
    pub admin_client_id: String,
    /// How client credentials are sent to the token endpoint.
    pub auth_method: ClientAuthMethod,
    /// HTTP timeout.
    pub timeout: Duration,
    /// Upper bound on a response body.
    pub max_response_size: usize,
    /// HTTP(S) proxy for all requests.
    pub proxy: Option<Url>,
    /// Disable TLS certificate validation. Test environments only.
    pub insecure_skip_verify: bool,
}

impl Default for KeycloakConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            base_path: DEFAULT_BASE_PATH.to_string(),
            admin_client_id: DEFAULT_ADMIN_CLIENT_ID.to_string(),
            auth_method: ClientAuthMethod::default(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
            proxy: None,
            insecure_skip_verify: false,
        }
    }
}

impl KeycloakConfig {
    /// Token endpoint of a realm.
    pub fn token_endpoint(&self, realm: &str) -> KeycloakResult<String> {
        self.realm_endpoint(realm, &["protocol", "openid-connect", "token"])
    }

    /// Introspection endpoint of a realm.
    pub fn introspection_endpoint(&self, realm: &str) -> KeycloakResult<String> {
        self.realm_endpoint(realm, &["protocol", "openid-connect", "token", "introspect"])
    }

    /// Logout endpoint of a realm.
    pub fn logout_endpoint(&self, realm: &str) -> KeycloakResult<String> {
        self.realm_endpoint(realm, &["protocol", "openid-connect", "logout"])
    }

    /// Published signing keys of a realm.
    pub fn certs_endpoint(&self, realm: &str) -> KeycloakResult<String> {
        self.realm_endpoint(realm, &["protocol", "openid-connect", "certs"])
    }

    /// Userinfo endpoint of a realm.
    pub fn userinfo_endpoint(&self, realm: &str) -> KeycloakResult<String> {
        self.realm_endpoint(realm, &["protocol", "openid-connect", "userinfo"])
    }

    /// Realm document carrying the issuer's public key.
    pub fn issuer_endpoint(&self, realm: &str) -> KeycloakResult<String> {
        self.realm_endpoint(realm, &[])
    }

    /// OIDC discovery document of a realm.
    pub fn discovery_endpoint(&self, realm: &str) -> KeycloakResult<String> {
        self.realm_endpoint(realm, &[".well-known", "openid-configuration"])
    }

    /// `{base}/realms/{realm}/{path..}`
    pub fn realm_endpoint(&self, realm: &str, path: &[&str]) -> KeycloakResult<String> {
        self.build_url(["realms", realm].iter().chain(path.iter()).copied())
    }

    /// `{base}/admin/{path..}`
    pub fn admin_endpoint(&self, path: &[&str]) -> KeycloakResult<String> {
        self.build_url(std::iter::once("admin").chain(path.iter().copied()))
    }

    fn build_url<'a>(&self, segments: impl Iterator<Item = &'a str>) -> KeycloakResult<String> {
        let mut url = Url::parse(&self.base_url).map_err(|e| ConfigurationError::InvalidUrl {
            url: self.base_url.clone(),
            message: e.to_string(),
        })?;

        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ConfigurationError::InvalidUrl {
                    url: self.base_url.clone(),
                    message: "URL cannot be a base".to_string(),
                })?;
            path.pop_if_empty();
            path.extend(self.base_path.split('/').filter(|s| !s.is_empty()));
            path.extend(segments);
        }

        Ok(url.to_string())
    }
}

/// Client authentication method.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
    /// client_id and client_secret in request body.
    #[default]
    ClientSecretPost,
    /// HTTP Basic Authentication header.
    ClientSecretBasic,
    /// Public client: only client_id is sent.
    None,
}

impl ClientAuthMethod {
    /// Attach client credentials to a form request.
    ///
    /// `client_id` always goes into the form, Keycloak needs it to pick the
    /// client even when the secret travels in the Basic header.
    pub fn apply(
        &self,
        request: HttpRequest,
        form: &mut Vec<(&'static str, String)>,
        client_id: &str,
        client_secret: Option<&str>,
    ) -> HttpRequest {
        form.push(("client_id", client_id.to_string()));

        let secret = client_secret.filter(|s| !s.is_empty());
        match (self, secret) {
            (Self::ClientSecretPost, Some(secret)) => {
                form.push(("client_secret", secret.to_string()));
                request
            }
            (Self::ClientSecretBasic, Some(secret)) => request.basic_auth(client_id, secret),
            _ => request,
        }
    }
}

/// Grant type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrantType {
    #[serde(rename = "client_credentials")]
    ClientCredentials,
    #[serde(rename = "password")]
    Password,
    #[serde(rename = "refresh_token")]
    RefreshToken,
    #[serde(rename = "urn:ietf:params:oauth:grant-type:uma-ticket")]
    UmaTicket,
    #[serde(rename = "urn:ietf:params:oauth:grant-type:token-exchange")]
    TokenExchange,
}

impl GrantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClientCredentials => "client_credentials",
            Self::Password => "password",
            Self::RefreshToken => "refresh_token",
            Self::UmaTicket => "urn:ietf:params:oauth:grant-type:uma-ticket",
            Self::TokenExchange => "urn:ietf:params:oauth:grant-type:token-exchange",
        }
    }
}

/// Default configuration values.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_BASE_PATH: &str = "/auth";
pub const DEFAULT_ADMIN_CLIENT_ID: &str = "admin-cli";
pub const DEFAULT_TIMEOUT_MS: u64 = 30000;
pub const DEFAULT_MAX_RESPONSE_SIZE: usize = 8 * 1024 * 1024;
