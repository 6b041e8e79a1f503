//! Retry Policy
//!
//! Ordered retry conditions plus an exponential backoff schedule with jitter.
//! A failed attempt is retried only when one of the registered conditions
//! matches it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::core::HttpResponse;
use crate::error::KeycloakError;

/// Message of the transient error Keycloak reports while a freshly created
/// client scope is not yet in its cache.
pub const CACHED_CLIENT_SCOPE_NOT_FOUND: &str = "Cached clientScope not found";

/// Predicate deciding whether a failed attempt is retried.
///
/// `response` is the raw non-2xx response when there was one; `error` is the
/// error the attempt would otherwise fail with.
pub trait RetryCondition: Send + Sync {
    fn should_retry(&self, response: Option<&HttpResponse>, error: Option<&KeycloakError>)
        -> bool;
}

impl<F> RetryCondition for F
where
    F: Fn(Option<&HttpResponse>, Option<&KeycloakError>) -> bool + Send + Sync,
{
    fn should_retry(
        &self,
        response: Option<&HttpResponse>,
        error: Option<&KeycloakError>,
    ) -> bool {
        self(response, error)
    }
}

/// How an [`ErrorMessageCondition`] compares messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageMatch {
    Prefix,
    Contains,
}

/// Retries provider errors whose message matches a pattern.
///
/// The admin API `errorMessage` is matched first, then the `error` code.
#[derive(Debug, Clone)]
pub struct ErrorMessageCondition {
    pattern: String,
    mode: MessageMatch,
}

impl ErrorMessageCondition {
    /// Match messages starting with `pattern`.
    pub fn prefix(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            mode: MessageMatch::Prefix,
        }
    }

    /// Match messages containing `pattern`.
    pub fn contains(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            mode: MessageMatch::Contains,
        }
    }

    /// Keycloak's "Cached clientScope not found" race after scope creation.
    pub fn cached_client_scope_not_found() -> Self {
        Self::prefix(CACHED_CLIENT_SCOPE_NOT_FOUND)
    }

    fn matches(&self, message: &str) -> bool {
        match self.mode {
            MessageMatch::Prefix => message.starts_with(&self.pattern),
            MessageMatch::Contains => message.contains(&self.pattern),
        }
    }
}

impl RetryCondition for ErrorMessageCondition {
    fn should_retry(
        &self,
        _response: Option<&HttpResponse>,
        error: Option<&KeycloakError>,
    ) -> bool {
        error
            .and_then(KeycloakError::api_error)
            .map_or(false, |e| self.matches(e.retry_message()))
    }
}

/// Retries transport failures (connection refused, reset, timeout).
///
/// TLS failures are not retried.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkErrorCondition;

impl RetryCondition for NetworkErrorCondition {
    fn should_retry(
        &self,
        _response: Option<&HttpResponse>,
        error: Option<&KeycloakError>,
    ) -> bool {
        matches!(error, Some(KeycloakError::Network(e)) if e.is_retryable())
    }
}

/// Retries responses with one of the given HTTP statuses.
#[derive(Debug, Clone)]
pub struct StatusCondition {
    statuses: Vec<u16>,
}

impl StatusCondition {
    pub fn new(statuses: impl IntoIterator<Item = u16>) -> Self {
        Self {
            statuses: statuses.into_iter().collect(),
        }
    }

    /// 502, 503 and 504.
    pub fn gateway_errors() -> Self {
        Self::new([502, 503, 504])
    }
}

impl RetryCondition for StatusCondition {
    fn should_retry(
        &self,
        response: Option<&HttpResponse>,
        _error: Option<&KeycloakError>,
    ) -> bool {
        response.map_or(false, |r| self.statuses.contains(&r.status))
    }
}

/// Retry policy.
///
/// Without conditions nothing is retried.
#[derive(Clone)]
pub struct RetryPolicy {
    conditions: Vec<Arc<dyn RetryCondition>>,
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Backoff multiplier.
    pub multiplier: f64,
    /// Jitter factor (0.0-1.0).
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            conditions: Vec::new(),
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            jitter: 0.1,
        }
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("conditions", &self.conditions.len())
            .field("max_retries", &self.max_retries)
            .field("initial_delay", &self.initial_delay)
            .field("max_delay", &self.max_delay)
            .field("multiplier", &self.multiplier)
            .field("jitter", &self.jitter)
            .finish()
    }
}

/// Default number of retries once a condition is registered.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Register a condition; conditions are evaluated in registration order.
    pub fn with_condition(mut self, condition: impl RetryCondition + 'static) -> Self {
        self.conditions.push(Arc::new(condition));
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the backoff schedule. Zero delays retry immediately.
    pub fn with_backoff(mut self, initial_delay: Duration, max_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self.max_delay = max_delay;
        self
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    pub fn condition_count(&self) -> usize {
        self.conditions.len()
    }

    /// Index of the first condition matching a failed attempt.
    pub fn matching_condition(
        &self,
        response: Option<&HttpResponse>,
        error: Option<&KeycloakError>,
    ) -> Option<usize> {
        self.conditions
            .iter()
            .position(|c| c.should_retry(response, error))
    }

    /// Delay before retry number `retry` (0-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        if self.initial_delay.is_zero() {
            return Duration::ZERO;
        }

        let base_delay =
            self.initial_delay.as_millis() as f64 * self.multiplier.powi(retry as i32);
        let capped_delay = base_delay.min(self.max_delay.as_millis() as f64);

        let jitter_range = capped_delay * self.jitter;
        let jitter = (rand::random::<f64>() - 0.5) * 2.0 * jitter_range;
        let final_delay = (capped_delay + jitter).max(0.0);

        Duration::from_millis(final_delay as u64)
    }
}
