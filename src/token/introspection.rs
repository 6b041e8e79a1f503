//! Token Introspection
//!
//! RFC 7662 token introspection against a realm's introspection endpoint.
//! An unknown, expired or forged token is a regular `active: false` answer,
//! never an error.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::core::sync::lock;
use crate::core::HttpRequest;
use crate::error::{KeycloakError, KeycloakResult};
use crate::flows::grant::require;
use crate::resilience::ResilientTransport;
use crate::telemetry::{LogContext, Logger};
use crate::types::{IntrospectionResult, KeycloakConfig, TokenTypeHint};

/// Token introspection interface.
#[async_trait]
pub trait TokenIntrospector: Send + Sync {
    /// Introspect a token with an explicit type hint.
    async fn introspect(
        &self,
        token: &str,
        hint: Option<TokenTypeHint>,
        client_id: &str,
        client_secret: &str,
        realm: &str,
    ) -> KeycloakResult<IntrospectionResult>;

    /// Introspect a token as a requesting party token.
    async fn retrospect_token(
        &self,
        token: &str,
        client_id: &str,
        client_secret: &str,
        realm: &str,
    ) -> KeycloakResult<IntrospectionResult> {
        self.introspect(
            token,
            Some(TokenTypeHint::RequestingPartyToken),
            client_id,
            client_secret,
            realm,
        )
        .await
    }

    /// Check if a token is active.
    async fn is_token_active(
        &self,
        token: &str,
        client_id: &str,
        client_secret: &str,
        realm: &str,
    ) -> KeycloakResult<bool> {
        Ok(self
            .retrospect_token(token, client_id, client_secret, realm)
            .await?
            .active)
    }
}

/// Default token introspector implementation.
pub struct DefaultTokenIntrospector {
    config: Arc<KeycloakConfig>,
    transport: Arc<ResilientTransport>,
    logger: Arc<dyn Logger>,
}

impl DefaultTokenIntrospector {
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
impl TokenIntrospector for DefaultTokenIntrospector {
    async fn introspect(
        &self,
        token: &str,
        hint: Option<TokenTypeHint>,
        client_id: &str,
        client_secret: &str,
        realm: &str,
    ) -> KeycloakResult<IntrospectionResult> {
        require("realm", realm)?;
        require("client_id", client_id)?;

        let mut form = Vec::new();
        if let Some(hint) = hint {
            form.push(("token_type_hint", hint.as_str().to_string()));
        }
        form.push(("token", token.to_string()));

        let request = self.config.auth_method.apply(
            HttpRequest::post(self.config.introspection_endpoint(realm)?),
            &mut form,
            client_id,
            Some(client_secret),
        );

        let result: IntrospectionResult = self
            .transport
            .execute(request.form(&form))
            .await?
            .parse_json()?;

        self.logger.debug(
            "token introspected",
            &LogContext::new()
                .operation("retrospect_token")
                .realm(realm)
                .client_id(client_id)
                .extra("active", result.active),
        );

        Ok(result)
    }
}

/// Mock token introspector for testing.
///
/// Answers queued results in order, then `active: false`.
#[derive(Default)]
pub struct MockTokenIntrospector {
    outcomes: Mutex<VecDeque<KeycloakResult<IntrospectionResult>>>,
    introspected: Mutex<Vec<String>>,
}

impl MockTokenIntrospector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_result(&self, result: IntrospectionResult) -> &Self {
        lock(&self.outcomes).push_back(Ok(result));
        self
    }

    pub fn queue_error(&self, error: KeycloakError) -> &Self {
        lock(&self.outcomes).push_back(Err(error));
        self
    }

    /// Tokens introspected so far.
    pub fn get_introspected_tokens(&self) -> Vec<String> {
        lock(&self.introspected).clone()
    }
}

#[async_trait]
impl TokenIntrospector for MockTokenIntrospector {
    async fn introspect(
        &self,
        token: &str,
        _hint: Option<TokenTypeHint>,
        _client_id: &str,
        _client_secret: &str,
        _realm: &str,
    ) -> KeycloakResult<IntrospectionResult> {
        lock(&self.introspected).push(token.to_string());
        lock(&self.outcomes)
            .pop_front()
            .unwrap_or_else(|| Ok(IntrospectionResult::inactive()))
    }
}

/// Create mock token introspector for testing.
pub fn create_mock_token_introspector() -> MockTokenIntrospector {
    MockTokenIntrospector::new()
}
