//! Resilience
//!
//! Retry and fault injection for requests sent to the provider.
//!
//! - **Retry**: ordered retry conditions with an exponential backoff schedule
//! - **Fault injection**: deterministic skip-then-fail request failures
//! - **Resilient transport**: the retry loop every operation sends through

pub mod fault;
pub mod retry;
pub mod transport;

pub use fault::{default_injected_error, ErrorFactory, FaultInjectingTransport, FaultInjector};
pub use retry::{
    ErrorMessageCondition, MessageMatch, NetworkErrorCondition, RetryCondition, RetryPolicy,
    StatusCondition, CACHED_CLIENT_SCOPE_NOT_FOUND, DEFAULT_MAX_RETRIES,
};
pub use transport::{ResilientTransport, RetryStats};
