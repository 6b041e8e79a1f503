//! Session Control
//!
//! Admin-side operations on a running provider: cache invalidation and a few
//! read-only admin documents. Every call is authorized by an admin access
//! token obtained through a grant flow.
//!
//! Cache clears are sent exactly once. A failed clear is reported to the
//! caller and never retried.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::core::sync::lock;
use crate::core::HttpRequest;
use crate::error::{KeycloakError, KeycloakResult};
use crate::flows::grant::require;
use crate::resilience::ResilientTransport;
use crate::telemetry::{LogContext, Logger};
use crate::types::{KeycloakConfig, RealmInfo, ServerInfo};

/// Provider-side cache of a realm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RealmCache {
    Realm,
    User,
    Keys,
}

impl RealmCache {
    /// Admin path segment clearing this cache.
    pub fn as_str(&self) -> &'static str {
        match self {
            RealmCache::Realm => "clear-realm-cache",
            RealmCache::User => "clear-user-cache",
            RealmCache::Keys => "clear-keys-cache",
        }
    }
}

impl fmt::Display for RealmCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session control interface.
#[async_trait]
pub trait SessionControl: Send + Sync {
    /// Clear one of the provider's caches for `realm`.
    async fn clear_cache(&self, cache: RealmCache, access_token: &str, realm: &str)
        -> KeycloakResult<()>;

    /// Server information document.
    async fn get_server_info(&self, access_token: &str) -> KeycloakResult<ServerInfo>;

    /// Admin representation of `realm`.
    async fn get_realm(&self, access_token: &str, realm: &str) -> KeycloakResult<RealmInfo>;

    async fn clear_realm_cache(&self, access_token: &str, realm: &str) -> KeycloakResult<()> {
        self.clear_cache(RealmCache::Realm, access_token, realm).await
    }

    async fn clear_user_cache(&self, access_token: &str, realm: &str) -> KeycloakResult<()> {
        self.clear_cache(RealmCache::User, access_token, realm).await
    }

    async fn clear_keys_cache(&self, access_token: &str, realm: &str) -> KeycloakResult<()> {
        self.clear_cache(RealmCache::Keys, access_token, realm).await
    }
}

/// Default session control.
pub struct DefaultSessionControl {
    config: Arc<KeycloakConfig>,
    transport: Arc<ResilientTransport>,
    logger: Arc<dyn Logger>,
}

impl DefaultSessionControl {
    pub fn new(
        config: Arc<KeycloakConfig>,
        transport: Arc<ResilientTransport>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            config,
            transport,
            logger,
        }
    }
}

#[async_trait]
impl SessionControl for DefaultSessionControl {
    async fn clear_cache(
        &self,
        cache: RealmCache,
        access_token: &str,
        realm: &str,
    ) -> KeycloakResult<()> {
        require("realm", realm)?;
        require("access_token", access_token)?;

        let context = LogContext::new()
            .operation(cache.as_str())
            .realm(realm);

        let url = self
            .config
            .admin_endpoint(&["realms", realm, cache.as_str()])?;
        let request = HttpRequest::post(url).bearer(access_token);

        match self.transport.execute_once(request).await {
            Ok(_) => {
                self.logger.info("cache cleared", &context);
                Ok(())
            }
            Err(e) => {
                self.logger
                    .warn("cache clear failed", &context.extra("error", &e));
                Err(e)
            }
        }
    }

    async fn get_server_info(&self, access_token: &str) -> KeycloakResult<ServerInfo> {
        let url = self.config.admin_endpoint(&["serverinfo"])?;
        self.transport
            .execute(HttpRequest::get(url).bearer(access_token))
            .await?
            .parse_json()
    }

    async fn get_realm(&self, access_token: &str, realm: &str) -> KeycloakResult<RealmInfo> {
        require("realm", realm)?;
        let url = self.config.admin_endpoint(&["realms", realm])?;
        self.transport
            .execute(HttpRequest::get(url).bearer(access_token))
            .await?
            .parse_json()
    }
}

/// Mock session control for testing.
#[derive(Default)]
pub struct MockSessionControl {
    errors: Mutex<VecDeque<KeycloakError>>,
    server_info: Mutex<Option<ServerInfo>>,
    realms: Mutex<HashMap<String, RealmInfo>>,
    cleared: Mutex<Vec<(RealmCache, String)>>,
}

impl MockSessionControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next call with `error`.
    pub fn queue_error(&self, error: KeycloakError) -> &Self {
        lock(&self.errors).push_back(error);
        self
    }

    pub fn set_server_info(&self, info: ServerInfo) -> &Self {
        *lock(&self.server_info) = Some(info);
        self
    }

    pub fn set_realm(&self, realm: &str, info: RealmInfo) -> &Self {
        lock(&self.realms).insert(realm.to_string(), info);
        self
    }

    /// Caches cleared so far, in order.
    pub fn get_cleared_caches(&self) -> Vec<(RealmCache, String)> {
        lock(&self.cleared).clone()
    }

    fn next_error(&self) -> KeycloakResult<()> {
        match lock(&self.errors).pop_front() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SessionControl for MockSessionControl {
    async fn clear_cache(
        &self,
        cache: RealmCache,
        _access_token: &str,
        realm: &str,
    ) -> KeycloakResult<()> {
        self.next_error()?;
        lock(&self.cleared).push((cache, realm.to_string()));
        Ok(())
    }

    async fn get_server_info(&self, _access_token: &str) -> KeycloakResult<ServerInfo> {
        self.next_error()?;
        Ok(lock(&self.server_info).clone().unwrap_or_default())
    }

    async fn get_realm(&self, _access_token: &str, realm: &str) -> KeycloakResult<RealmInfo> {
        self.next_error()?;
        Ok(lock(&self.realms).get(realm).cloned().unwrap_or_else(|| RealmInfo {
            realm: Some(realm.to_string()),
            ..Default::default()
        }))
    }
}

/// Create mock session control for testing.
pub fn create_mock_session_control() -> MockSessionControl {
    MockSessionControl::new()
}
