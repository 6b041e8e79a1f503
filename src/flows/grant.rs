//! Grant Flows
//!
//! Token acquisition against a realm's token endpoint: client credentials,
//! resource-owner password, refresh token and the generalized grant every
//! other flow is built on.
//!
//! Each call is one independent request. Nothing is cached between calls and
//! a failed call never yields a token.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::core::sync::lock;
use crate::core::HttpRequest;
use crate::error::{ConfigurationError, KeycloakError, KeycloakResult};
use crate::resilience::ResilientTransport;
use crate::telemetry::{LogContext, Logger};
use crate::types::{GrantType, KeycloakConfig, Token, TokenOptions};

/// Grant flow interface.
#[async_trait]
pub trait GrantFlow: Send + Sync {
    /// Generalized grant.
    async fn get_token(&self, realm: &str, options: TokenOptions) -> KeycloakResult<Token>;

    /// Client credentials grant.
    async fn login_client(
        &self,
        client_id: &str,
        client_secret: &str,
        realm: &str,
    ) -> KeycloakResult<Token>;

    /// Resource-owner password grant.
    async fn login(
        &self,
        client_id: &str,
        client_secret: &str,
        realm: &str,
        username: &str,
        password: &str,
    ) -> KeycloakResult<Token>;

    /// Password grant against the admin client.
    async fn login_admin(&self, username: &str, password: &str, realm: &str)
        -> KeycloakResult<Token>;

    /// Refresh token grant.
    async fn refresh_token(
        &self,
        refresh_token: &str,
        client_id: &str,
        client_secret: &str,
        realm: &str,
    ) -> KeycloakResult<Token>;

    /// Revoke a refresh token.
    async fn logout(
        &self,
        client_id: &str,
        client_secret: &str,
        realm: &str,
        refresh_token: &str,
    ) -> KeycloakResult<()>;

    /// Requesting party token for the given permissions.
    async fn request_permission(
        &self,
        client_id: &str,
        client_secret: &str,
        realm: &str,
        username: &str,
        password: &str,
        permissions: &[&str],
    ) -> KeycloakResult<Token>;
}

/// Grant flow executor sending through the resilient transport.
pub struct GrantFlowExecutor {
    pub(crate) config: Arc<KeycloakConfig>,
    pub(crate) transport: Arc<ResilientTransport>,
    pub(crate) logger: Arc<dyn Logger>,
}

pub(crate) fn require(field: &str, value: &str) -> Result<(), ConfigurationError> {
    if value.trim().is_empty() {
        return Err(ConfigurationError::MissingRequired {
            field: field.to_string(),
        });
    }
    Ok(())
}

impl GrantFlowExecutor {
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

    /// Grant type of options that do not name one.
    fn infer_grant_type(options: &TokenOptions) -> GrantType {
        if options.refresh_token.is_some() {
            GrantType::RefreshToken
        } else if options.username.is_some() {
            GrantType::Password
        } else if options.ticket.is_some() || !options.permissions.is_empty() {
            GrantType::UmaTicket
        } else {
            GrantType::ClientCredentials
        }
    }

    /// Post a grant to the token endpoint, optionally authenticated by a
    /// bearer token instead of client credentials only.
    pub(crate) async fn request_token(
        &self,
        operation: &str,
        realm: &str,
        mut options: TokenOptions,
        bearer: Option<&str>,
    ) -> KeycloakResult<Token> {
        require("realm", realm)?;
        let client_id = options.client_id.clone().unwrap_or_default();
        require("client_id", &client_id)?;

        let grant_type = options
            .grant_type
            .unwrap_or_else(|| Self::infer_grant_type(&options));
        options.grant_type = Some(grant_type);

        let context = LogContext::new()
            .operation(operation)
            .realm(realm)
            .client_id(&client_id)
            .extra("grant_type", grant_type.as_str());
        self.logger.info("requesting token", &context);

        let mut form = options.grant_fields();
        let mut request = HttpRequest::post(self.config.token_endpoint(realm)?);
        request = self.config.auth_method.apply(
            request,
            &mut form,
            &client_id,
            options.client_secret.as_ref().map(|s| s.expose_secret().as_str()),
        );
        if let Some(bearer) = bearer {
            request = request.bearer(bearer);
        }

        let response = self.transport.execute(request.form(&form)).await?;
        let token = Token::from_response_body(&response.body)?;

        self.logger.debug(
            "token issued",
            &context
                .extra("expires_in", token.expires_in)
                .extra("offline", token.is_offline()),
        );
        Ok(token)
    }
}

#[async_trait]
impl GrantFlow for GrantFlowExecutor {
    async fn get_token(&self, realm: &str, options: TokenOptions) -> KeycloakResult<Token> {
        self.request_token("get_token", realm, options, None).await
    }

    async fn login_client(
        &self,
        client_id: &str,
        client_secret: &str,
        realm: &str,
    ) -> KeycloakResult<Token> {
        let options = TokenOptions::new()
            .grant_type(GrantType::ClientCredentials)
            .client_id(client_id)
            .client_secret(client_secret);
        self.request_token("login_client", realm, options, None).await
    }

    async fn login(
        &self,
        client_id: &str,
        client_secret: &str,
        realm: &str,
        username: &str,
        password: &str,
    ) -> KeycloakResult<Token> {
        require("username", username)?;
        let options = TokenOptions::new()
            .grant_type(GrantType::Password)
            .client_id(client_id)
            .client_secret(client_secret)
            .username(username)
            .password(password);
        self.request_token("login", realm, options, None).await
    }

    async fn login_admin(
        &self,
        username: &str,
        password: &str,
        realm: &str,
    ) -> KeycloakResult<Token> {
        require("username", username)?;
        let options = TokenOptions::new()
            .grant_type(GrantType::Password)
            .client_id(self.config.admin_client_id.clone())
            .username(username)
            .password(password);
        self.request_token("login_admin", realm, options, None).await
    }

    async fn refresh_token(
        &self,
        refresh_token: &str,
        client_id: &str,
        client_secret: &str,
        realm: &str,
    ) -> KeycloakResult<Token> {
        require("refresh_token", refresh_token)?;
        let options = TokenOptions::new()
            .grant_type(GrantType::RefreshToken)
            .client_id(client_id)
            .client_secret(client_secret)
            .refresh_token(refresh_token);
        self.request_token("refresh_token", realm, options, None).await
    }

    async fn logout(
        &self,
        client_id: &str,
        client_secret: &str,
        realm: &str,
        refresh_token: &str,
    ) -> KeycloakResult<()> {
        self.revoke_refresh_token(client_id, client_secret, realm, refresh_token)
            .await
    }

    async fn request_permission(
        &self,
        client_id: &str,
        client_secret: &str,
        realm: &str,
        username: &str,
        password: &str,
        permissions: &[&str],
    ) -> KeycloakResult<Token> {
        self.exchange_permission_ticket(
            client_id,
            client_secret,
            realm,
            username,
            password,
            permissions,
        )
        .await
    }
}

/// Recorded [`MockGrantFlow`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantCall {
    pub operation: String,
    pub realm: String,
    pub client_id: String,
}

/// Mock grant flow for testing.
///
/// Queued outcomes are returned in order; afterwards every call succeeds
/// with a fixed mock token.
#[derive(Default)]
pub struct MockGrantFlow {
    outcomes: Mutex<VecDeque<KeycloakResult<Token>>>,
    calls: Mutex<Vec<GrantCall>>,
}

impl MockGrantFlow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a token.
    pub fn queue_token(&self, token: Token) -> &Self {
        lock(&self.outcomes).push_back(Ok(token));
        self
    }

    /// Queue an error.
    pub fn queue_error(&self, error: KeycloakError) -> &Self {
        lock(&self.outcomes).push_back(Err(error));
        self
    }

    pub fn get_calls(&self) -> Vec<GrantCall> {
        lock(&self.calls).clone()
    }

    /// Token returned once the queue is drained.
    pub fn mock_token() -> Token {
        Token {
            access_token: "mock-access-token".to_string(),
            id_token: None,
            expires_in: 300,
            refresh_expires_in: 1800,
            refresh_token: Some("mock-refresh-token".to_string()),
            token_type: "Bearer".to_string(),
            not_before_policy: 0,
            session_state: None,
            scope: Some("profile email".to_string()),
        }
    }

    fn next(&self, operation: &str, realm: &str, client_id: &str) -> KeycloakResult<Token> {
        lock(&self.calls).push(GrantCall {
            operation: operation.to_string(),
            realm: realm.to_string(),
            client_id: client_id.to_string(),
        });

        lock(&self.outcomes)
            .pop_front()
            .unwrap_or_else(|| Ok(Self::mock_token()))
    }
}

#[async_trait]
impl GrantFlow for MockGrantFlow {
    async fn get_token(&self, realm: &str, options: TokenOptions) -> KeycloakResult<Token> {
        let client_id = options.client_id.unwrap_or_default();
        self.next("get_token", realm, &client_id)
    }

    async fn login_client(&self, client_id: &str, _: &str, realm: &str) -> KeycloakResult<Token> {
        self.next("login_client", realm, client_id)
    }

    async fn login(
        &self,
        client_id: &str,
        _client_secret: &str,
        realm: &str,
        _username: &str,
        _password: &str,
    ) -> KeycloakResult<Token> {
        self.next("login", realm, client_id)
    }

    async fn login_admin(&self, _: &str, _: &str, realm: &str) -> KeycloakResult<Token> {
        self.next("login_admin", realm, "admin-cli")
    }

    async fn refresh_token(
        &self,
        _refresh_token: &str,
        client_id: &str,
        _client_secret: &str,
        realm: &str,
    ) -> KeycloakResult<Token> {
        self.next("refresh_token", realm, client_id)
    }

    async fn logout(
        &self,
        client_id: &str,
        _client_secret: &str,
        realm: &str,
        _refresh_token: &str,
    ) -> KeycloakResult<()> {
        self.next("logout", realm, client_id).map(|_| ())
    }

    async fn request_permission(
        &self,
        client_id: &str,
        _client_secret: &str,
        realm: &str,
        _username: &str,
        _password: &str,
        _permissions: &[&str],
    ) -> KeycloakResult<Token> {
        self.next("request_permission", realm, client_id)
    }
}

/// Create mock grant flow for testing.
pub fn create_mock_grant_flow() -> MockGrantFlow {
    MockGrantFlow::new()
}
