//! Integration tests using WireMock
//!
//! These tests drive the client through the real reqwest transport against a
//! mock provider, covering the full request/response cycle including form
//! encoding, client authentication, retries and fault injection.

mod admin;
mod grants;
mod resilience;
mod tokens;

use std::sync::Arc;

use keycloak_integration::{
    keycloak_config, InMemoryLogger, KeycloakClient, KeycloakConfig, ReqwestHttpTransport,
    RetryPolicy,
};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const REALM: &str = "demo";
pub const CLIENT_ID: &str = "app";
pub const CLIENT_SECRET: &str = "app-secret";

/// Path of a realm's OIDC endpoint under the default base path.
pub fn oidc_path(endpoint: &str) -> String {
    format!("/auth/realms/{}/protocol/openid-connect/{}", REALM, endpoint)
}

pub fn config_for(server: &MockServer) -> KeycloakConfig {
    keycloak_config()
        .base_url(server.uri())
        .build()
        .expect("valid config")
}

/// Client over the reqwest transport with the given retry policy.
pub fn client_for(server: &MockServer, policy: RetryPolicy) -> (KeycloakClient, Arc<InMemoryLogger>) {
    let config = config_for(server);
    let transport = ReqwestHttpTransport::from_config(&config).expect("transport");
    let logger = Arc::new(InMemoryLogger::new());
    let client = KeycloakClient::with_components(config, Arc::new(transport), policy, logger.clone());
    (client, logger)
}

pub fn token_body(access_token: &str) -> serde_json::Value {
    json!({
        "access_token": access_token,
        "expires_in": 300,
        "refresh_expires_in": 1800,
        "refresh_token": "refresh-1",
        "token_type": "Bearer",
        "not-before-policy": 0,
        "session_state": "b1f6d0e2",
        "scope": "profile email"
    })
}

/// Token endpoint answering every request with a fresh token.
pub async fn mount_token_endpoint(server: &MockServer, access_token: &str) {
    Mock::given(method("POST"))
        .and(path(oidc_path("token")))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body(access_token)))
        .mount(server)
        .await;
}

pub fn realm_not_found() -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_json(json!({"error": "Realm does not exist"}))
}

/// Form body of the `index`th request received by `server`.
pub async fn request_body(server: &MockServer, index: usize) -> String {
    let requests = server.received_requests().await.expect("recording enabled");
    String::from_utf8(requests[index].body.clone()).expect("utf-8 body")
}
