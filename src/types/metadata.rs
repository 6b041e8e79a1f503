//! Realm Metadata Types
//!
//! Published signing keys, issuer document, OIDC discovery document and the
//! administrative metadata documents. Only the fields this crate reads are
//! typed; everything else lands in a flattened `extra` map.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// JSON Web Key Set published at `.../protocol/openid-connect/certs`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CertResponse {
    #[serde(default)]
    pub keys: Vec<CertKey>,
}

impl CertResponse {
    /// Key with the given `kid`.
    pub fn find(&self, kid: &str) -> Option<&CertKey> {
        self.keys.iter().find(|k| k.kid.as_deref() == Some(kid))
    }

    /// Keys usable for signature verification.
    pub fn signing_keys(&self) -> impl Iterator<Item = &CertKey> {
        self.keys.iter().filter(|k| k.is_signing_key())
    }
}

/// Single JSON Web Key.
///
/// Every member is optional: encryption keys (`RSA-OAEP`) must parse too.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    #[serde(default)]
    pub kty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    #[serde(default, rename = "use", skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
    /// RSA modulus.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    /// RSA exponent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x5c: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x5t: Option<String>,
    #[serde(default, rename = "x5t#S256", skip_serializing_if = "Option::is_none")]
    pub x5t_s256: Option<String>,
    /// EC curve.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    /// Symmetric key material (base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k: Option<String>,
}

impl CertKey {
    /// Keys without `use` are treated as signing keys.
    pub fn is_signing_key(&self) -> bool {
        self.key_use.as_deref().map_or(true, |u| u == "sig")
    }
}

/// Realm document from `GET /realms/{realm}`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct IssuerResponse {
    #[serde(default)]
    pub realm: Option<String>,
    /// Base64 DER public key of the realm's active RSA key.
    #[serde(default)]
    pub public_key: Option<String>,
    #[serde(default, rename = "token-service")]
    pub token_service: Option<String>,
    #[serde(default, rename = "account-service")]
    pub account_service: Option<String>,
    #[serde(default, rename = "tokens-not-before")]
    pub tokens_not_before: Option<i64>,
}

/// OIDC discovery document.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OidcDiscoveryDocument {
    pub issuer: String,
    #[serde(default)]
    pub authorization_endpoint: Option<String>,
    pub token_endpoint: String,
    #[serde(default)]
    pub introspection_endpoint: Option<String>,
    #[serde(default)]
    pub userinfo_endpoint: Option<String>,
    #[serde(default)]
    pub end_session_endpoint: Option<String>,
    #[serde(default)]
    pub jwks_uri: Option<String>,
    #[serde(default)]
    pub revocation_endpoint: Option<String>,
    #[serde(default)]
    pub grant_types_supported: Vec<String>,
    #[serde(default)]
    pub response_types_supported: Vec<String>,
    #[serde(default)]
    pub scopes_supported: Vec<String>,
    #[serde(default)]
    pub id_token_signing_alg_values_supported: Vec<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl OidcDiscoveryDocument {
    pub fn supports_grant(&self, grant_type: &str) -> bool {
        self.grant_types_supported.iter().any(|g| g == grant_type)
    }
}

/// Userinfo claims.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: Option<bool>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Server information from `GET /admin/serverinfo`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    #[serde(default)]
    pub system_info: Option<SystemInfo>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl ServerInfo {
    /// Provider version, when reported.
    pub fn version(&self) -> Option<&str> {
        self.system_info.as_ref()?.version.as_deref()
    }
}

/// `systemInfo` member of [`ServerInfo`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub server_time: Option<String>,
    #[serde(default)]
    pub uptime: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Realm representation from `GET /admin/realms/{realm}`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealmInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub realm: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}
