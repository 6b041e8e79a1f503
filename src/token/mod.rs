//! Token Handling
//!
//! Server-side introspection and local JWT decoding.

pub mod decoder;
pub mod introspection;

// Token Introspection
pub use introspection::{
    create_mock_token_introspector, DefaultTokenIntrospector, MockTokenIntrospector,
    TokenIntrospector,
};

// Token Decoding
pub use decoder::{Claims, DecodedToken, TokenDecoder};
