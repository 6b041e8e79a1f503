//! Builders
//!
//! Fluent builder for Keycloak configuration.

pub mod config;

pub use config::{keycloak_config, KeycloakConfigBuilder};
