//! Integration tests for retry conditions and fault injection

use super::*;
use async_trait::async_trait;
use keycloak_integration::{
    ErrorMessageCondition, FaultInjector, HttpRequest, HttpResponse, HttpTransport, KeycloakError,
    LogLevel, NetworkError, NetworkErrorCondition, ResilientTransport, StatusCondition,
};
use mockall::mock;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

mock! {
    pub Transport {}

    #[async_trait]
    impl HttpTransport for Transport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, KeycloakError>;
    }
}

fn zero_backoff(policy: RetryPolicy) -> RetryPolicy {
    policy.with_backoff(Duration::ZERO, Duration::ZERO)
}

fn cached_scope_error() -> ResponseTemplate {
    ResponseTemplate::new(500).set_body_json(json!({
        "error": "unknown_error",
        "errorMessage": "Cached clientScope not found: 8c2f"
    }))
}

fn fault_client(server: &MockServer, policy: RetryPolicy, injector: FaultInjector) -> KeycloakClient {
    let config = config_for(server);
    let transport = ReqwestHttpTransport::from_config(&config).unwrap();
    KeycloakClient::with_fault_injection(
        config,
        Arc::new(transport),
        policy,
        Arc::new(InMemoryLogger::new()),
        injector,
    )
}

#[tokio::test]
async fn test_matching_condition_retries_until_exhausted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(oidc_path("token")))
        .respond_with(cached_scope_error())
        .expect(3)
        .mount(&server)
        .await;

    let policy = zero_backoff(
        RetryPolicy::new()
            .with_condition(ErrorMessageCondition::cached_client_scope_not_found())
            .with_max_retries(2),
    );
    let (client, logger) = client_for(&server, policy);

    let err = client
        .login_client(CLIENT_ID, CLIENT_SECRET, REALM)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert_eq!(logger.get_entries_by_level(LogLevel::Warn).len(), 2);
    assert_eq!(logger.get_entries_by_level(LogLevel::Error).len(), 1);

    let stats = client.transport().stats();
    assert_eq!(stats.total_attempts, 3);
    assert_eq!(stats.retries, 2);
    assert_eq!(stats.failed_requests, 1);
}

#[tokio::test]
async fn test_retry_recovers_after_transient_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(oidc_path("token")))
        .respond_with(cached_scope_error())
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_token_endpoint(&server, "recovered").await;

    let policy = zero_backoff(
        RetryPolicy::new().with_condition(ErrorMessageCondition::cached_client_scope_not_found()),
    );
    let (client, _) = client_for(&server, policy);

    let token = client
        .login_client(CLIENT_ID, CLIENT_SECRET, REALM)
        .await
        .unwrap();
    assert_eq!(token.access_token, "recovered");
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_non_matching_failure_returns_immediately() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(oidc_path("token")))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "unauthorized_client",
            "error_description": "Invalid client secret"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let policy = zero_backoff(
        RetryPolicy::new()
            .with_condition(ErrorMessageCondition::cached_client_scope_not_found())
            .with_condition(StatusCondition::gateway_errors()),
    );
    let (client, _) = client_for(&server, policy);

    let err = client
        .login_client(CLIENT_ID, "wrong", REALM)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "401 Unauthorized: Invalid client secret");
}

#[tokio::test]
async fn test_fail_first_request() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, "token").await;

    let client = fault_client(&server, RetryPolicy::none(), FaultInjector::failing(1, 0));

    let err = client
        .login_client(CLIENT_ID, CLIENT_SECRET, REALM)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        KeycloakError::Network(NetworkError::ConnectionFailed { ref message })
            if message.starts_with("an error for request: POST http://")
    ));
    assert!(client
        .login_client(CLIENT_ID, CLIENT_SECRET, REALM)
        .await
        .is_ok());

    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_skip_then_fail() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, "token").await;

    let client = fault_client(&server, RetryPolicy::none(), FaultInjector::new());
    client.fault_injector().unwrap().fail_requests(1, 1);

    assert_ok!(client.login_client(CLIENT_ID, CLIENT_SECRET, REALM).await);
    assert_err!(client.login_client(CLIENT_ID, CLIENT_SECRET, REALM).await);
    assert_ok!(client.login_client(CLIENT_ID, CLIENT_SECRET, REALM).await);

    assert_eq!(server.received_requests().await.unwrap().len(), 2);
    assert_eq!(client.fault_injector().unwrap().injected_failures(), 1);
}

#[tokio::test]
async fn test_injected_failures_are_retried() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, "token").await;

    let policy = zero_backoff(RetryPolicy::new().with_condition(NetworkErrorCondition));
    let client = fault_client(&server, policy, FaultInjector::failing(3, 0));

    let token = client
        .login_client(CLIENT_ID, CLIENT_SECRET, REALM)
        .await
        .unwrap();
    assert_eq!(token.access_token, "token");
    assert_eq!(client.transport().stats().retries, 3);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_custom_error_factory() {
    let server = MockServer::start().await;
    let injector = FaultInjector::new();
    injector.fail_requests_with(1, 0, |_: &HttpRequest| {
        KeycloakError::Network(NetworkError::Timeout {
            timeout: Duration::from_secs(1),
        })
    });

    let client = fault_client(&server, RetryPolicy::none(), injector);
    let err = client.get_certs(REALM).await.unwrap_err();
    assert!(matches!(err, KeycloakError::Network(NetworkError::Timeout { .. })));
}

#[tokio::test]
async fn test_closure_condition_with_mockall_transport() {
    let mut transport = MockTransport::new();
    let mut seq = mockall::Sequence::new();
    transport
        .expect_send()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(HttpResponse::new(429, r#"{"error":"slow_down"}"#)));
    transport
        .expect_send()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(HttpResponse::new(200, r#"{"keys":[]}"#)));

    let policy = zero_backoff(RetryPolicy::new().with_condition(
        |response: Option<&HttpResponse>, _: Option<&KeycloakError>| {
            response.map_or(false, |r| r.status == 429)
        },
    ));
    let resilient = ResilientTransport::new(Arc::new(transport), policy);

    let response = resilient
        .execute(HttpRequest::get("http://kc/auth/realms/demo/protocol/openid-connect/certs"))
        .await
        .unwrap();
    assert_eq!(response.body, r#"{"keys":[]}"#);
    assert_eq!(resilient.stats().retries, 1);
}

#[tokio::test]
async fn test_execute_once_ignores_conditions() {
    let mut transport = MockTransport::new();
    transport
        .expect_send()
        .times(1)
        .returning(|_| Ok(HttpResponse::new(503, "")));

    let policy = zero_backoff(RetryPolicy::new().with_condition(StatusCondition::gateway_errors()));
    let resilient = ResilientTransport::new(Arc::new(transport), policy);

    let err = resilient
        .execute_once(HttpRequest::post("http://kc/auth/admin/realms/demo/clear-realm-cache"))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(503));
}
