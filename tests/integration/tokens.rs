//! Integration tests for introspection and token decoding

use super::*;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use keycloak_integration::{DecodeError, KeycloakError, ProtocolError, TokenDecoder};
use serde::Deserialize;
use wiremock::matchers::{body_string_contains, method, path};

const SIGNING_SECRET: &[u8] = b"integration-realm-hmac-signing-key";

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn sign(claims: serde_json::Value) -> String {
    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some("realm-hs256".to_string());
    encode(&header, &claims, &EncodingKey::from_secret(SIGNING_SECRET)).unwrap()
}

async fn mount_certs(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(oidc_path("certs")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "keys": [
                {
                    "kid": "realm-rsa-enc",
                    "kty": "RSA",
                    "alg": "RSA-OAEP",
                    "use": "enc",
                    "n": "sXchw",
                    "e": "AQAB"
                },
                {
                    "kid": "realm-hs256",
                    "kty": "oct",
                    "alg": "HS256",
                    "use": "sig",
                    "k": URL_SAFE_NO_PAD.encode(SIGNING_SECRET)
                }
            ]
        })))
        .mount(server)
        .await;
}

#[derive(Debug, Deserialize)]
struct AccessClaims {
    preferred_username: String,
    azp: String,
    #[serde(default)]
    realm_access: Option<serde_json::Value>,
}

#[tokio::test]
async fn test_client_token_is_active() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, "fresh-token").await;
    Mock::given(method("POST"))
        .and(path(oidc_path("token/introspect")))
        .and(body_string_contains("token_type_hint=requesting_party_token"))
        .and(body_string_contains("token=fresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "active": true,
            "client_id": "app",
            "token_type": "Bearer",
            "exp": now() + 300,
            "aud": ["account", "app"],
            "permissions": [{"rsid": "r1", "rsname": "Default Resource", "scopes": ["view"]}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client_for(&server, RetryPolicy::none());
    let token = client
        .login_client(CLIENT_ID, CLIENT_SECRET, REALM)
        .await
        .unwrap();
    let result = client
        .retrospect_token(&token.access_token, CLIENT_ID, CLIENT_SECRET, REALM)
        .await
        .unwrap();

    assert!(result.active);
    assert_eq!(result.client_id.as_deref(), Some("app"));
    assert!(result.aud.as_ref().unwrap().contains("app"));
    assert!(result.has_permission("Default Resource", Some("view")));
}

#[tokio::test]
async fn test_garbage_token_is_inactive() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(oidc_path("token/introspect")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"active": false})))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client_for(&server, RetryPolicy::none());
    let result = client
        .retrospect_token("not-a-token", CLIENT_ID, CLIENT_SECRET, REALM)
        .await
        .unwrap();
    assert!(!result.active);
}

#[tokio::test]
async fn test_decode_access_token() {
    let server = MockServer::start().await;
    mount_certs(&server).await;

    let token = sign(json!({
        "sub": "3f0c",
        "preferred_username": "alice",
        "azp": "app",
        "aud": "account",
        "exp": now() + 300,
        "iat": now(),
        "realm_access": {"roles": ["offline_access"]}
    }));

    let (client, _) = client_for(&server, RetryPolicy::none());
    let decoded = client.decode_access_token(&token, REALM).await.unwrap();
    assert_eq!(decoded.claims["preferred_username"], "alice");
    assert_eq!(decoded.header.kid.as_deref(), Some("realm-hs256"));

    let typed = client
        .decode_access_token_custom_claims::<AccessClaims>(&token, REALM)
        .await
        .unwrap();
    assert_eq!(typed.claims.preferred_username, "alice");
    assert_eq!(typed.claims.azp, "app");
    assert!(typed.claims.realm_access.is_some());
}

#[tokio::test]
async fn test_tampered_signature_is_decode_error() {
    let server = MockServer::start().await;
    mount_certs(&server).await;

    let token = sign(json!({"preferred_username": "alice", "azp": "app", "exp": now() + 300}));
    let forged_claims = URL_SAFE_NO_PAD.encode(
        json!({"preferred_username": "admin", "azp": "app", "exp": now() + 300}).to_string(),
    );
    let parts: Vec<&str> = token.split('.').collect();
    let tampered = format!("{}.{}.{}", parts[0], forged_claims, parts[2]);

    let (client, _) = client_for(&server, RetryPolicy::none());
    let err = client.decode_access_token(&tampered, REALM).await.unwrap_err();
    assert!(matches!(err, KeycloakError::Decode(DecodeError::InvalidSignature)));
}

#[tokio::test]
async fn test_expired_token_is_decode_error() {
    let server = MockServer::start().await;
    mount_certs(&server).await;

    let token = sign(json!({"preferred_username": "alice", "azp": "app", "exp": now() - 3600}));

    let (client, _) = client_for(&server, RetryPolicy::none());
    let err = client.decode_access_token(&token, REALM).await.unwrap_err();
    assert!(matches!(err, KeycloakError::Decode(DecodeError::Expired)));
}

#[tokio::test]
async fn test_malformed_token_never_fetches_certs() {
    let server = MockServer::start().await;
    mount_certs(&server).await;

    let (client, _) = client_for(&server, RetryPolicy::none());
    let err = client.decode_access_token("abc.def", REALM).await.unwrap_err();
    assert!(matches!(err, KeycloakError::Decode(DecodeError::Malformed { .. })));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_decode_with_cached_certs() {
    let server = MockServer::start().await;
    mount_certs(&server).await;

    let (client, _) = client_for(&server, RetryPolicy::none());
    let certs = client.get_certs(REALM).await.unwrap();
    assert_eq!(certs.signing_keys().count(), 1);

    for user in ["alice", "bob"] {
        let token = sign(json!({"preferred_username": user, "azp": "app", "exp": now() + 300}));
        let decoded = TokenDecoder::decode_with_certs::<AccessClaims>(&token, &certs).unwrap();
        assert_eq!(decoded.claims.preferred_username, user);
    }
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_non_utf8_certs_body_is_rejected() {
    let server = MockServer::start().await;
    let mut body = br#"{"keys":[{"kid":"k1","kty":"oct","k":""#.to_vec();
    body.extend_from_slice(&[0xff, 0xfe, 0xfd]);
    body.extend_from_slice(br#""}]}"#);
    Mock::given(method("GET"))
        .and(path(oidc_path("certs")))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client_for(&server, RetryPolicy::none());
    let err = client.get_certs(REALM).await.unwrap_err();
    assert!(matches!(
        err,
        KeycloakError::Protocol(ProtocolError::InvalidResponse { .. })
    ));
}

#[tokio::test]
async fn test_issuer_and_discovery() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/realms/demo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "realm": "demo",
            "public_key": "MIIBIjANBgkqhkiG9w0BAQEFAAOCAQ8AMIIBCgKCAQEA",
            "token-service": format!("{}/auth/realms/demo/protocol/openid-connect", server.uri()),
            "account-service": format!("{}/auth/realms/demo/account", server.uri()),
            "tokens-not-before": 0
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/realms/demo/.well-known/openid-configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issuer": format!("{}/auth/realms/demo", server.uri()),
            "token_endpoint": format!("{}/auth/realms/demo/protocol/openid-connect/token", server.uri()),
            "grant_types_supported": ["password", "client_credentials", "urn:ietf:params:oauth:grant-type:uma-ticket"]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/realms/missing"))
        .respond_with(realm_not_found())
        .mount(&server)
        .await;

    let (client, _) = client_for(&server, RetryPolicy::none());
    let issuer = client.get_issuer(REALM).await.unwrap();
    assert_eq!(issuer.realm.as_deref(), Some("demo"));

    let discovery = client.get_openid_configuration(REALM).await.unwrap();
    assert!(discovery.supports_grant("urn:ietf:params:oauth:grant-type:uma-ticket"));

    let err = client.get_issuer("missing").await.unwrap_err();
    assert_eq!(err.to_string(), "404 Not Found: Realm does not exist");
}
