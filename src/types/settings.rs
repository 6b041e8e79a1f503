//! Provider Settings
//!
//! JSON settings file describing a provider deployment and the two
//! principals used against it:
//!
//! ```json
//! {
//!   "hostname": "http://localhost:8080",
//!   "proxy": "http://localhost:3128",
//!   "admin": { "username": "admin", "password": "secret", "realm": "master" },
//!   "application": {
//!     "username": "client-user", "password": "secret", "realm": "demo",
//!     "client_id": "app", "client_secret": "secret"
//!   }
//! }
//! ```

use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::builders::keycloak_config;
use crate::error::{ConfigurationError, KeycloakResult};
use crate::types::KeycloakConfig;

/// Environment variable naming the settings file.
pub const SETTINGS_ENV_VAR: &str = "KEYCLOAK_CONFIG";

/// Settings file used when [`SETTINGS_ENV_VAR`] is unset.
pub const DEFAULT_SETTINGS_PATH: &str = "testdata/config.json";

const DEFAULT_APPLICATION_USERNAME: &str = "test_user";

/// Provider deployment settings.
#[derive(Clone, Debug, Deserialize)]
pub struct ProviderSettings {
    pub hostname: String,
    #[serde(default)]
    pub proxy: Option<String>,
    /// Path prefix, `/auth` when absent.
    #[serde(default)]
    pub base_path: Option<String>,
    #[serde(default)]
    pub insecure_skip_verify: bool,
    pub admin: AdminPrincipal,
    pub application: ApplicationPrincipal,
}

/// Administrator account.
#[derive(Clone, Debug, Deserialize)]
pub struct AdminPrincipal {
    pub username: String,
    pub password: SecretString,
    pub realm: String,
}

/// Application client plus an end user of that client.
#[derive(Clone, Debug, Deserialize)]
pub struct ApplicationPrincipal {
    #[serde(default)]
    pub username: String,
    #[serde(default = "empty_secret")]
    pub password: SecretString,
    pub realm: String,
    pub client_id: String,
    #[serde(default = "empty_secret")]
    pub client_secret: SecretString,
}

fn empty_secret() -> SecretString {
    SecretString::new(String::new())
}

impl ProviderSettings {
    /// Parse settings from JSON.
    pub fn from_json_str(json: &str) -> KeycloakResult<Self> {
        Self::parse(json, "<inline>")
    }

    /// Load settings from a file.
    pub fn from_file(path: impl AsRef<Path>) -> KeycloakResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ConfigurationError::SettingsUnreadable {
                path: path.display().to_string(),
                message: e.to_string(),
            }
        })?;

        Self::parse(&raw, &path.display().to_string())
    }

    /// Load settings from the file named by `KEYCLOAK_CONFIG`, falling back to
    /// `testdata/config.json`.
    pub fn from_env() -> KeycloakResult<Self> {
        Self::from_file(Self::path_from_env())
    }

    /// Settings path selected by the environment.
    pub fn path_from_env() -> PathBuf {
        std::env::var_os(SETTINGS_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_PATH))
    }

    /// Build the client configuration, validating hostname and proxy.
    pub fn to_config(&self) -> KeycloakResult<KeycloakConfig> {
        let mut builder = keycloak_config()
            .base_url(self.hostname.clone())
            .insecure_skip_verify(self.insecure_skip_verify);

        if let Some(proxy) = &self.proxy {
            builder = builder.proxy(proxy.clone());
        }
        if let Some(base_path) = &self.base_path {
            builder = builder.base_path(base_path.clone());
        }

        builder.build()
    }

    fn parse(json: &str, origin: &str) -> KeycloakResult<Self> {
        let mut settings: ProviderSettings =
            serde_json::from_str(json).map_err(|e| ConfigurationError::SettingsUnreadable {
                path: origin.to_string(),
                message: e.to_string(),
            })?;

        if settings.application.username.is_empty() {
            settings.application.username = DEFAULT_APPLICATION_USERNAME.to_string();
        }

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        let required = [
            ("hostname", &self.hostname),
            ("admin.username", &self.admin.username),
            ("admin.realm", &self.admin.realm),
            ("application.realm", &self.application.realm),
            ("application.client_id", &self.application.client_id),
        ];

        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigurationError::MissingRequired {
                    field: field.to_string(),
                });
            }
        }

        Ok(())
    }
}
