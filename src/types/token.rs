//! Token Types
//!
//! Token issued by the provider and the options of a generalized grant.

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::GrantType;
use crate::error::{KeycloakResult, ProtocolError};

/// Token issued by the realm's token endpoint.
///
/// Always carries a non-empty `access_token`. A `refresh_expires_in` of zero
/// marks an offline grant whose refresh token does not expire with the
/// session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    /// Access token lifetime in seconds.
    #[serde(default)]
    pub expires_in: i64,
    /// Refresh token lifetime in seconds, 0 for offline tokens.
    #[serde(default)]
    pub refresh_expires_in: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default, rename = "not-before-policy")]
    pub not_before_policy: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl Token {
    /// Parse a token endpoint response body.
    ///
    /// A body without a usable `access_token` is a protocol error, never a
    /// token.
    pub fn from_response_body(body: &str) -> KeycloakResult<Self> {
        let mut token: Token =
            serde_json::from_str(body).map_err(|e| ProtocolError::InvalidJson {
                message: e.to_string(),
            })?;

        if token.access_token.is_empty() {
            return Err(ProtocolError::MissingField {
                field: "access_token".to_string(),
            }
            .into());
        }

        // Keycloak sends empty strings for absent optional tokens.
        for field in [
            &mut token.refresh_token,
            &mut token.id_token,
            &mut token.session_state,
            &mut token.scope,
        ] {
            if field.as_deref() == Some("") {
                *field = None;
            }
        }

        Ok(token)
    }

    /// Offline grant: the refresh token does not expire with the session.
    pub fn is_offline(&self) -> bool {
        self.refresh_expires_in == 0
    }

    /// `Authorization` header value for this token.
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }

    /// Granted scopes.
    pub fn scopes(&self) -> Vec<String> {
        self.scope
            .as_ref()
            .map(|s| s.split_whitespace().map(String::from).collect())
            .unwrap_or_default()
    }

    /// Access token expiry for a token received at `issued_at`.
    pub fn expires_at(&self, issued_at: DateTime<Utc>) -> DateTime<Utc> {
        issued_at + Duration::seconds(self.expires_in)
    }

    /// Refresh token expiry, `None` for offline tokens.
    pub fn refresh_expires_at(&self, issued_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.is_offline() {
            None
        } else {
            Some(issued_at + Duration::seconds(self.refresh_expires_in))
        }
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"[REDACTED]")
            .field("id_token", &self.id_token.as_ref().map(|_| "[REDACTED]"))
            .field("expires_in", &self.expires_in)
            .field("refresh_expires_in", &self.refresh_expires_in)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Options of a generalized grant.
///
/// Unset options are omitted from the request.
#[derive(Clone, Debug, Default)]
pub struct TokenOptions {
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
    pub grant_type: Option<GrantType>,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub refresh_token: Option<SecretString>,
    pub scopes: Vec<String>,
    pub response_types: Vec<String>,
    pub permissions: Vec<String>,
    pub audience: Option<String>,
    pub ticket: Option<String>,
    pub totp: Option<String>,
}

impl TokenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(SecretString::new(client_secret.into()));
        self
    }

    pub fn grant_type(mut self, grant_type: GrantType) -> Self {
        self.grant_type = Some(grant_type);
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretString::new(password.into()));
        self
    }

    pub fn refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(SecretString::new(refresh_token.into()));
        self
    }

    /// Add a requested scope.
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scopes.push(scope.into());
        self
    }

    pub fn scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes.extend(scopes.into_iter().map(Into::into));
        self
    }

    pub fn response_types<I, S>(mut self, response_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.response_types
            .extend(response_types.into_iter().map(Into::into));
        self
    }

    /// Add a requested permission, `resource#scope` form.
    pub fn permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.push(permission.into());
        self
    }

    pub fn audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    pub fn ticket(mut self, ticket: impl Into<String>) -> Self {
        self.ticket = Some(ticket.into());
        self
    }

    pub fn totp(mut self, totp: impl Into<String>) -> Self {
        self.totp = Some(totp.into());
        self
    }

    /// Grant fields other than client authentication, in request order.
    pub(crate) fn grant_fields(&self) -> Vec<(&'static str, String)> {
        let mut form = Vec::new();

        if let Some(grant_type) = self.grant_type {
            form.push(("grant_type", grant_type.as_str().to_string()));
        }
        if let Some(username) = &self.username {
            form.push(("username", username.clone()));
        }
        if let Some(password) = &self.password {
            form.push(("password", password.expose_secret().clone()));
        }
        if let Some(refresh_token) = &self.refresh_token {
            form.push(("refresh_token", refresh_token.expose_secret().clone()));
        }
        if !self.scopes.is_empty() {
            form.push(("scope", self.scopes.join(" ")));
        }
        if !self.response_types.is_empty() {
            form.push(("response_type", self.response_types.join(" ")));
        }
        if let Some(audience) = &self.audience {
            form.push(("audience", audience.clone()));
        }
        if let Some(ticket) = &self.ticket {
            form.push(("ticket", ticket.clone()));
        }
        for permission in &self.permissions {
            form.push(("permission", permission.clone()));
        }
        if let Some(totp) = &self.totp {
            form.push(("totp", totp.clone()));
        }

        form
    }
}
