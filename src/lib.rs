//! Keycloak Integration Module
//!
//! Authentication and resilient transport core for Keycloak administrative
//! clients.
//!
//! # Features
//!
//! - Client Credentials Grant (RFC 6749 Section 4.4)
//! - Resource Owner Password Grant (RFC 6749 Section 4.3)
//! - Token Refresh (RFC 6749 Section 6) and logout
//! - UMA Ticket Exchange for requesting party tokens
//! - Token Introspection (RFC 7662)
//! - Local JWT verification against the realm's published keys
//! - Retry conditions and deterministic fault injection on every request
//!
//! # Example
//!
//! ```rust,ignore
//! use keycloak_integration::{keycloak_config, KeycloakClient, RetryPolicy, NetworkErrorCondition};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = keycloak_config()
//!         .base_url("https://sso.example.com")
//!         .proxy("http://proxy.internal:3128")
//!         .build()?;
//!
//!     let client = KeycloakClient::new(config)?;
//!
//!     let token = client.login_client("my-service", "my-secret", "my-realm").await?;
//!     let claims = client.decode_access_token(&token.access_token, "my-realm").await?;
//!     println!("issued for {:?}", claims.claims.get("azp"));
//!
//!     // Collaborators send their own API calls through the same transport.
//!     let transport = client.transport();
//!     println!("attempts so far: {}", transport.stats().total_attempts);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `types`: configuration, tokens, introspection results and realm metadata
//! - `error`: error hierarchy and provider error mapping
//! - `core`: HTTP transport seam, realm metadata client, one-time setup
//! - `resilience`: retry policy, fault injection and the resilient transport
//! - `flows`: grant flows, UMA permission exchange and logout
//! - `token`: introspection and JWT decoding
//! - `admin`: cache control and admin documents
//! - `builders`: fluent configuration builder
//! - `telemetry`: structured logging
//! - `client`: high-level client combining all of the above

pub mod admin;
pub mod builders;
pub mod client;
pub mod core;
pub mod error;
pub mod flows;
pub mod resilience;
pub mod telemetry;
pub mod token;
pub mod types;

// Re-export main client
pub use client::{keycloak_client, KeycloakClient};

// Re-export builders
pub use builders::{keycloak_config, KeycloakConfigBuilder};

// Re-export errors
pub use error::{
    create_error_from_response, parse_error_response, ApiError, ConfigurationError, DecodeError,
    ErrorResponse, KeycloakError, KeycloakResult, NetworkError, ProtocolError,
};

// Re-export types
pub use types::{
    // Config
    ClientAuthMethod, GrantType, KeycloakConfig,
    // Settings
    AdminPrincipal, ApplicationPrincipal, ProviderSettings,
    // Token
    Token, TokenOptions,
    // Introspection
    Audience, IntrospectionResult, ResourcePermission, TokenTypeHint,
    // Metadata
    CertKey, CertResponse, IssuerResponse, OidcDiscoveryDocument, RealmInfo, ServerInfo,
    SystemInfo, UserInfo,
};

// Re-export core components
pub use core::{
    // Transport
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, MockHttpTransport,
    ReqwestHttpTransport,
    // Metadata
    DefaultRealmMetadataClient, MockRealmMetadataClient, RealmMetadataClient,
    // Setup
    SharedSetup,
};

// Re-export flows
pub use flows::{GrantCall, GrantFlow, GrantFlowExecutor, MockGrantFlow};

// Re-export token handling
pub use token::{
    // Introspection
    DefaultTokenIntrospector, MockTokenIntrospector, TokenIntrospector,
    // Decoding
    Claims, DecodedToken, TokenDecoder,
};

// Re-export admin
pub use admin::{DefaultSessionControl, MockSessionControl, RealmCache, SessionControl};

// Re-export resilience
pub use resilience::{
    // Retry
    ErrorMessageCondition, MessageMatch, NetworkErrorCondition, RetryCondition, RetryPolicy,
    StatusCondition, CACHED_CLIENT_SCOPE_NOT_FOUND,
    // Fault injection
    FaultInjectingTransport, FaultInjector,
    // Transport
    ResilientTransport, RetryStats,
};

// Re-export telemetry
pub use telemetry::{InMemoryLogger, LogContext, LogEntry, LogLevel, Logger, NoOpLogger, TracingLogger};
