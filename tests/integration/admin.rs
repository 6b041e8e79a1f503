//! Integration tests for session control and collaborator calls

use super::*;
use keycloak_integration::{HttpRequest, KeycloakError, StatusCondition};
use std::time::Duration;
use wiremock::matchers::{header, method, path};

#[tokio::test]
async fn test_clear_realm_cache() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, "admin-token").await;
    Mock::given(method("POST"))
        .and(path("/auth/admin/realms/demo/clear-realm-cache"))
        .and(header("authorization", "Bearer admin-token"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let (client, logger) = client_for(&server, RetryPolicy::none());
    let admin = client.login_admin("admin", "admin", "master").await.unwrap();
    client
        .clear_realm_cache(&admin.access_token, REALM)
        .await
        .unwrap();
    assert_eq!(logger.count_containing("cache cleared"), 1);
}

#[tokio::test]
async fn test_failed_cache_clear_is_sent_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/admin/realms/demo/clear-user-cache"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let policy = RetryPolicy::new()
        .with_condition(StatusCondition::gateway_errors())
        .with_backoff(Duration::ZERO, Duration::ZERO);
    let (client, _) = client_for(&server, policy);

    let err = client
        .clear_user_cache("admin-token", REALM)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "503 Service Unavailable");
}

#[tokio::test]
async fn test_server_info_and_realm() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/admin/serverinfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "systemInfo": {"version": "21.1.2", "uptime": "0 days, 1 hour"},
            "memoryInfo": {"used": 1024}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/admin/realms/demo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "d3m0",
            "realm": "demo",
            "displayName": "Demo",
            "enabled": true,
            "sslRequired": "external"
        })))
        .mount(&server)
        .await;

    let (client, _) = client_for(&server, RetryPolicy::none());
    let info = client.get_server_info("admin-token").await.unwrap();
    assert_eq!(info.version(), Some("21.1.2"));
    assert!(info.extra.contains_key("memoryInfo"));

    let realm = client.get_realm("admin-token", REALM).await.unwrap();
    assert_eq!(realm.display_name.as_deref(), Some("Demo"));
    assert_eq!(realm.extra["sslRequired"], "external");
}

#[tokio::test]
async fn test_conflict_is_already_exists() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/admin/realms/demo/users"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "errorMessage": "User exists with same username"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client_for(&server, RetryPolicy::none());
    let config = client.config();
    let request = HttpRequest::post(config.admin_endpoint(&["realms", REALM, "users"]).unwrap())
        .bearer("admin-token")
        .json(&json!({"username": "alice", "enabled": true}))
        .unwrap();

    let err = client.transport().execute(request).await.unwrap_err();
    assert!(err.is_already_exists());
    assert!(matches!(err, KeycloakError::AlreadyExists(_)));
    assert_eq!(err.to_string(), "409 Conflict: User exists with same username");
}

#[tokio::test]
async fn test_collaborator_shares_retry_policy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/admin/realms/demo/clients"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/admin/realms/demo/clients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"clientId": "app"}])))
        .mount(&server)
        .await;

    let policy = RetryPolicy::new()
        .with_condition(StatusCondition::gateway_errors())
        .with_backoff(Duration::ZERO, Duration::ZERO);
    let (client, _) = client_for(&server, policy);

    let url = client
        .config()
        .admin_endpoint(&["realms", REALM, "clients"])
        .unwrap();
    let clients: Vec<serde_json::Value> = client
        .transport()
        .execute(HttpRequest::get(url).bearer("admin-token"))
        .await
        .unwrap()
        .parse_json()
        .unwrap();

    assert_eq!(clients[0]["clientId"], "app");
    assert_eq!(client.transport().stats().retries, 1);
}
