//! Keycloak Types
//!
//! Configuration, tokens, introspection results and realm metadata.

pub mod config;
pub mod introspection;
pub mod metadata;
pub mod settings;
pub mod token;

pub use config::*;
pub use introspection::*;
pub use metadata::*;
pub use settings::*;
pub use token::*;
