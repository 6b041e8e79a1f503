//! Realm Metadata
//!
//! Uncached reads of a realm's published documents: signing keys, issuer
//! document, OIDC discovery document and userinfo.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::core::sync::lock;
use crate::core::HttpRequest;
use crate::error::{ApiError, KeycloakError, KeycloakResult};
use crate::resilience::ResilientTransport;
use crate::types::{CertResponse, IssuerResponse, KeycloakConfig, OidcDiscoveryDocument, UserInfo};

/// Realm metadata client interface (for dependency injection).
#[async_trait]
pub trait RealmMetadataClient: Send + Sync {
    /// Published signing keys of the realm.
    async fn get_certs(&self, realm: &str) -> KeycloakResult<CertResponse>;

    /// Realm issuer document.
    async fn get_issuer(&self, realm: &str) -> KeycloakResult<IssuerResponse>;

    /// OIDC discovery document.
    async fn get_openid_configuration(&self, realm: &str) -> KeycloakResult<OidcDiscoveryDocument>;

    /// Claims of the user owning `access_token`.
    async fn get_user_info(&self, access_token: &str, realm: &str) -> KeycloakResult<UserInfo>;
}

/// Default realm metadata client.
pub struct DefaultRealmMetadataClient {
    config: Arc<KeycloakConfig>,
    transport: Arc<ResilientTransport>,
}

impl DefaultRealmMetadataClient {
    pub fn new(config: Arc<KeycloakConfig>, transport: Arc<ResilientTransport>) -> Self {
        Self { config, transport }
    }
}

#[async_trait]
impl RealmMetadataClient for DefaultRealmMetadataClient {
    async fn get_certs(&self, realm: &str) -> KeycloakResult<CertResponse> {
        let url = self.config.certs_endpoint(realm)?;
        self.transport
            .execute(HttpRequest::get(url))
            .await?
            .parse_json()
    }

    async fn get_issuer(&self, realm: &str) -> KeycloakResult<IssuerResponse> {
        let url = self.config.issuer_endpoint(realm)?;
        self.transport
            .execute(HttpRequest::get(url))
            .await?
            .parse_json()
    }

    async fn get_openid_configuration(&self, realm: &str) -> KeycloakResult<OidcDiscoveryDocument> {
        let url = self.config.discovery_endpoint(realm)?;
        self.transport
            .execute(HttpRequest::get(url))
            .await?
            .parse_json()
    }

    async fn get_user_info(&self, access_token: &str, realm: &str) -> KeycloakResult<UserInfo> {
        let url = self.config.userinfo_endpoint(realm)?;
        self.transport
            .execute(HttpRequest::get(url).bearer(access_token))
            .await?
            .parse_json()
    }
}

/// Mock realm metadata client for testing.
///
/// Realms without a registered document answer `404 Not Found`.
#[derive(Default)]
pub struct MockRealmMetadataClient {
    certs: Mutex<HashMap<String, CertResponse>>,
    issuers: Mutex<HashMap<String, IssuerResponse>>,
    discovery: Mutex<HashMap<String, OidcDiscoveryDocument>>,
    user_info: Mutex<HashMap<String, UserInfo>>,
    fetch_history: Mutex<Vec<String>>,
}

fn realm_not_found() -> KeycloakError {
    KeycloakError::Api(ApiError::new(404, "Not Found", "Realm does not exist"))
}

impl MockRealmMetadataClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_certs(&self, realm: &str, certs: CertResponse) -> &Self {
        lock(&self.certs).insert(realm.to_string(), certs);
        self
    }

    pub fn set_issuer(&self, realm: &str, issuer: IssuerResponse) -> &Self {
        lock(&self.issuers).insert(realm.to_string(), issuer);
        self
    }

    pub fn set_openid_configuration(&self, realm: &str, document: OidcDiscoveryDocument) -> &Self {
        lock(&self.discovery).insert(realm.to_string(), document);
        self
    }

    pub fn set_user_info(&self, realm: &str, user_info: UserInfo) -> &Self {
        lock(&self.user_info).insert(realm.to_string(), user_info);
        self
    }

    /// Documents requested so far, as `kind:realm`.
    pub fn get_fetch_history(&self) -> Vec<String> {
        lock(&self.fetch_history).clone()
    }

    fn record(&self, kind: &str, realm: &str) {
        lock(&self.fetch_history).push(format!("{}:{}", kind, realm));
    }
}

#[async_trait]
impl RealmMetadataClient for MockRealmMetadataClient {
    async fn get_certs(&self, realm: &str) -> KeycloakResult<CertResponse> {
        self.record("certs", realm);
        lock(&self.certs).get(realm).cloned().ok_or_else(realm_not_found)
    }

    async fn get_issuer(&self, realm: &str) -> KeycloakResult<IssuerResponse> {
        self.record("issuer", realm);
        lock(&self.issuers).get(realm).cloned().ok_or_else(realm_not_found)
    }

    async fn get_openid_configuration(&self, realm: &str) -> KeycloakResult<OidcDiscoveryDocument> {
        self.record("openid-configuration", realm);
        lock(&self.discovery).get(realm).cloned().ok_or_else(realm_not_found)
    }

    async fn get_user_info(&self, _access_token: &str, realm: &str) -> KeycloakResult<UserInfo> {
        self.record("userinfo", realm);
        lock(&self.user_info).get(realm).cloned().ok_or_else(realm_not_found)
    }
}

/// Create mock realm metadata client for testing.
pub fn create_mock_metadata_client() -> MockRealmMetadataClient {
    MockRealmMetadataClient::new()
}
