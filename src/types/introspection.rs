//! Introspection Types
//!
//! Types for token introspection (RFC 7662) as answered by Keycloak,
//! including the UMA `permissions` claim of requesting party tokens.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Token type hint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenTypeHint {
    AccessToken,
    RefreshToken,
    RequestingPartyToken,
}

impl TokenTypeHint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessToken => "access_token",
            Self::RefreshToken => "refresh_token",
            Self::RequestingPartyToken => "requesting_party_token",
        }
    }
}

/// `aud` claim: a single audience or a list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Multiple(Vec<String>),
}

impl Audience {
    pub fn contains(&self, audience: &str) -> bool {
        match self {
            Self::Single(a) => a == audience,
            Self::Multiple(list) => list.iter().any(|a| a == audience),
        }
    }
}

/// Permission granted by a requesting party token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePermission {
    /// Resource ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rsid: Option<String>,
    /// Resource name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rsname: Option<String>,
    /// Granted scopes on the resource.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
}

/// Introspection result.
///
/// `active == false` is a regular answer for expired, revoked or forged
/// tokens; in that case every other field is usually absent.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IntrospectionResult {
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Expiration timestamp (Unix seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// Issued-at timestamp (Unix seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Not-before timestamp (Unix seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    /// UMA permissions of a requesting party token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<ResourcePermission>>,
    /// Every other claim.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl IntrospectionResult {
    /// Result reported for a token the provider does not recognize.
    pub fn inactive() -> Self {
        Self {
            active: false,
            scope: None,
            client_id: None,
            username: None,
            token_type: None,
            exp: None,
            iat: None,
            nbf: None,
            sub: None,
            aud: None,
            iss: None,
            jti: None,
            permissions: None,
            extra: HashMap::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Remaining lifetime in seconds.
    pub fn remaining_lifetime(&self) -> Option<i64> {
        self.exp
            .map(|exp| (exp - chrono::Utc::now().timestamp()).max(0))
    }

    /// Get scopes as vector.
    pub fn scopes(&self) -> Vec<String> {
        self.scope
            .as_ref()
            .map(|s| s.split_whitespace().map(String::from).collect())
            .unwrap_or_default()
    }

    /// Check whether the token grants `scope` on the resource named `rsname`.
    pub fn has_permission(&self, rsname: &str, scope: Option<&str>) -> bool {
        self.permissions.iter().flatten().any(|p| {
            p.rsname.as_deref() == Some(rsname)
                && scope.map_or(true, |s| p.scopes.iter().any(|granted| granted == s))
        })
    }
}
