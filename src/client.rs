//! Keycloak Client
//!
//! High-level client combining the grant flows, introspection, decoding,
//! realm metadata and session control over one resilient transport.

use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::admin::{DefaultSessionControl, SessionControl};
use crate::core::{DefaultRealmMetadataClient, HttpTransport, RealmMetadataClient, ReqwestHttpTransport};
use crate::error::KeycloakResult;
use crate::flows::{GrantFlow, GrantFlowExecutor};
use crate::resilience::{FaultInjectingTransport, FaultInjector, ResilientTransport, RetryPolicy};
use crate::telemetry::{Logger, TracingLogger};
use crate::token::{Claims, DecodedToken, DefaultTokenIntrospector, TokenDecoder, TokenIntrospector};
use crate::types::{
    CertResponse, IntrospectionResult, IssuerResponse, KeycloakConfig, OidcDiscoveryDocument,
    RealmInfo, ServerInfo, Token, TokenOptions, TokenTypeHint, UserInfo,
};

/// Keycloak client.
///
/// Every operation is an independent request; the client holds no tokens.
pub struct KeycloakClient {
    config: Arc<KeycloakConfig>,
    transport: Arc<ResilientTransport>,
    grants: GrantFlowExecutor,
    introspector: DefaultTokenIntrospector,
    metadata: Arc<DefaultRealmMetadataClient>,
    decoder: TokenDecoder,
    session: DefaultSessionControl,
    faults: Option<FaultInjector>,
}

impl KeycloakClient {
    /// Create a client over the reqwest transport, without retry conditions.
    pub fn new(config: KeycloakConfig) -> KeycloakResult<Self> {
        let transport = ReqwestHttpTransport::from_config(&config)?;
        Ok(Self::with_components(
            config,
            Arc::new(transport),
            RetryPolicy::default(),
            Arc::new(TracingLogger),
        ))
    }

    /// Create a client with custom implementations.
    pub fn with_components(
        config: KeycloakConfig,
        transport: Arc<dyn HttpTransport>,
        retry_policy: RetryPolicy,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self::assemble(config, transport, retry_policy, logger, None)
    }

    /// Create a client whose transport consults `injector` before every
    /// attempt, retries included.
    pub fn with_fault_injection(
        config: KeycloakConfig,
        transport: Arc<dyn HttpTransport>,
        retry_policy: RetryPolicy,
        logger: Arc<dyn Logger>,
        injector: FaultInjector,
    ) -> Self {
        let wrapped = Arc::new(FaultInjectingTransport::new(transport, injector.clone()));
        Self::assemble(config, wrapped, retry_policy, logger, Some(injector))
    }

    fn assemble(
        config: KeycloakConfig,
        transport: Arc<dyn HttpTransport>,
        retry_policy: RetryPolicy,
        logger: Arc<dyn Logger>,
        faults: Option<FaultInjector>,
    ) -> Self {
        let config = Arc::new(config);
        let transport = Arc::new(ResilientTransport::with_logger(
            transport,
            retry_policy,
            logger.clone(),
        ));
        let metadata = Arc::new(DefaultRealmMetadataClient::new(
            config.clone(),
            transport.clone(),
        ));

        Self {
            grants: GrantFlowExecutor::new(config.clone(), transport.clone(), logger.clone()),
            introspector: DefaultTokenIntrospector::new(
                config.clone(),
                transport.clone(),
                logger.clone(),
            ),
            decoder: TokenDecoder::new(metadata.clone()),
            session: DefaultSessionControl::new(config.clone(), transport.clone(), logger),
            metadata,
            transport,
            config,
            faults,
        }
    }

    /// Get the client configuration.
    pub fn config(&self) -> &KeycloakConfig {
        &self.config
    }

    /// Shared transport for collaborators issuing their own API calls.
    pub fn transport(&self) -> Arc<ResilientTransport> {
        self.transport.clone()
    }

    /// Fault injector, when built with [`KeycloakClient::with_fault_injection`].
    pub fn fault_injector(&self) -> Option<&FaultInjector> {
        self.faults.as_ref()
    }

    /// Grant flows as a trait object.
    pub fn grant_flow(&self) -> &dyn GrantFlow {
        &self.grants
    }

    // ========== Grants ==========

    pub async fn get_token(&self, realm: &str, options: TokenOptions) -> KeycloakResult<Token> {
        self.grants.get_token(realm, options).await
    }

    pub async fn login_client(
        &self,
        client_id: &str,
        client_secret: &str,
        realm: &str,
    ) -> KeycloakResult<Token> {
        self.grants.login_client(client_id, client_secret, realm).await
    }

    pub async fn login(
        &self,
        client_id: &str,
        client_secret: &str,
        realm: &str,
        username: &str,
        password: &str,
    ) -> KeycloakResult<Token> {
        self.grants
            .login(client_id, client_secret, realm, username, password)
            .await
    }

    pub async fn login_admin(
        &self,
        username: &str,
        password: &str,
        realm: &str,
    ) -> KeycloakResult<Token> {
        self.grants.login_admin(username, password, realm).await
    }

    pub async fn refresh_token(
        &self,
        refresh_token: &str,
        client_id: &str,
        client_secret: &str,
        realm: &str,
    ) -> KeycloakResult<Token> {
        self.grants
            .refresh_token(refresh_token, client_id, client_secret, realm)
            .await
    }

    pub async fn logout(
        &self,
        client_id: &str,
        client_secret: &str,
        realm: &str,
        refresh_token: &str,
    ) -> KeycloakResult<()> {
        self.grants
            .logout(client_id, client_secret, realm, refresh_token)
            .await
    }

    pub async fn request_permission(
        &self,
        client_id: &str,
        client_secret: &str,
        realm: &str,
        username: &str,
        password: &str,
        permissions: &[&str],
    ) -> KeycloakResult<Token> {
        self.grants
            .request_permission(client_id, client_secret, realm, username, password, permissions)
            .await
    }

    // ========== Introspection ==========

    pub async fn retrospect_token(
        &self,
        token: &str,
        client_id: &str,
        client_secret: &str,
        realm: &str,
    ) -> KeycloakResult<IntrospectionResult> {
        self.introspector
            .retrospect_token(token, client_id, client_secret, realm)
            .await
    }

    pub async fn introspect(
        &self,
        token: &str,
        hint: Option<TokenTypeHint>,
        client_id: &str,
        client_secret: &str,
        realm: &str,
    ) -> KeycloakResult<IntrospectionResult> {
        self.introspector
            .introspect(token, hint, client_id, client_secret, realm)
            .await
    }

    // ========== Decoding ==========

    pub async fn decode_access_token(
        &self,
        token: &str,
        realm: &str,
    ) -> KeycloakResult<DecodedToken<Claims>> {
        self.decoder.decode_access_token(token, realm).await
    }

    pub async fn decode_access_token_custom_claims<C: DeserializeOwned>(
        &self,
        token: &str,
        realm: &str,
    ) -> KeycloakResult<DecodedToken<C>> {
        self.decoder
            .decode_access_token_custom_claims(token, realm)
            .await
    }

    // ========== Realm Metadata ==========

    pub async fn get_certs(&self, realm: &str) -> KeycloakResult<CertResponse> {
        self.metadata.get_certs(realm).await
    }

    pub async fn get_issuer(&self, realm: &str) -> KeycloakResult<IssuerResponse> {
        self.metadata.get_issuer(realm).await
    }

    pub async fn get_openid_configuration(
        &self,
        realm: &str,
    ) -> KeycloakResult<OidcDiscoveryDocument> {
        self.metadata.get_openid_configuration(realm).await
    }

    pub async fn get_user_info(&self, access_token: &str, realm: &str) -> KeycloakResult<UserInfo> {
        self.metadata.get_user_info(access_token, realm).await
    }

    // ========== Session Control ==========

    pub async fn clear_realm_cache(&self, access_token: &str, realm: &str) -> KeycloakResult<()> {
        self.session.clear_realm_cache(access_token, realm).await
    }

    pub async fn clear_user_cache(&self, access_token: &str, realm: &str) -> KeycloakResult<()> {
        self.session.clear_user_cache(access_token, realm).await
    }

    pub async fn clear_keys_cache(&self, access_token: &str, realm: &str) -> KeycloakResult<()> {
        self.session.clear_keys_cache(access_token, realm).await
    }

    pub async fn get_server_info(&self, access_token: &str) -> KeycloakResult<ServerInfo> {
        self.session.get_server_info(access_token).await
    }

    pub async fn get_realm(&self, access_token: &str, realm: &str) -> KeycloakResult<RealmInfo> {
        self.session.get_realm(access_token, realm).await
    }
}

/// Create a Keycloak client with default implementations.
pub fn keycloak_client(config: KeycloakConfig) -> KeycloakResult<KeycloakClient> {
    KeycloakClient::new(config)
}
