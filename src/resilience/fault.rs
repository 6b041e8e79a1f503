//! Fault Injection
//!
//! Deterministic request failures for testing. A [`FaultInjector`] is
//! consulted once per attempted send: first `skip_count` requests pass, then
//! the next `remaining_failures` requests fail without reaching the network.

use async_trait::async_trait;
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::core::sync::lock;
use crate::core::{HttpRequest, HttpResponse, HttpTransport};
use crate::error::{KeycloakError, NetworkError};

/// Builds the error returned for an injected failure.
pub type ErrorFactory = Arc<dyn Fn(&HttpRequest) -> KeycloakError + Send + Sync>;

#[derive(Default)]
struct FaultState {
    remaining_failures: u32,
    skip_count: u32,
    error_factory: Option<ErrorFactory>,
    injected: u64,
}

/// Shared, re-armable fault injector.
#[derive(Clone, Default)]
pub struct FaultInjector {
    state: Arc<Mutex<FaultState>>,
}

impl fmt::Debug for FaultInjector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("FaultInjector")
            .field("remaining_failures", &state.remaining_failures)
            .field("skip_count", &state.skip_count)
            .field("custom_error", &state.error_factory.is_some())
            .field("injected", &state.injected)
            .finish()
    }
}

impl FaultInjector {
    /// Injector that lets every request through until armed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Injector failing `fail` requests after letting `skip` pass.
    pub fn failing(fail: u32, skip: u32) -> Self {
        let injector = Self::new();
        injector.fail_requests(fail, skip);
        injector
    }

    /// Re-arm: let the next `skip` requests pass, then fail `fail` requests.
    pub fn fail_requests(&self, fail: u32, skip: u32) {
        let mut state = lock(&self.state);
        state.remaining_failures = fail;
        state.skip_count = skip;
    }

    /// Re-arm with a caller-supplied error.
    pub fn fail_requests_with<F>(&self, fail: u32, skip: u32, factory: F)
    where
        F: Fn(&HttpRequest) -> KeycloakError + Send + Sync + 'static,
    {
        let mut state = lock(&self.state);
        state.remaining_failures = fail;
        state.skip_count = skip;
        state.error_factory = Some(Arc::new(factory));
    }

    /// Disarm and drop any custom error.
    pub fn reset(&self) {
        let mut state = lock(&self.state);
        state.remaining_failures = 0;
        state.skip_count = 0;
        state.error_factory = None;
    }

    pub fn remaining_failures(&self) -> u32 {
        lock(&self.state).remaining_failures
    }

    pub fn skip_count(&self) -> u32 {
        lock(&self.state).skip_count
    }

    /// Failures injected since creation.
    pub fn injected_failures(&self) -> u64 {
        lock(&self.state).injected
    }

    /// Advance the state machine for one attempted send.
    ///
    /// Returns the error to fail the request with, or `None` to let it pass.
    pub fn on_request(&self, request: &HttpRequest) -> Option<KeycloakError> {
        let mut state = lock(&self.state);

        if state.skip_count > 0 {
            state.skip_count -= 1;
            return None;
        }

        if state.remaining_failures == 0 {
            return None;
        }

        state.remaining_failures -= 1;
        state.injected += 1;

        let error = match &state.error_factory {
            Some(factory) => factory(request),
            None => default_injected_error(request),
        };
        Some(error)
    }
}

/// Error used when no factory is configured; shaped like a real transport
/// failure.
pub fn default_injected_error(request: &HttpRequest) -> KeycloakError {
    NetworkError::ConnectionFailed {
        message: format!("an error for request: {} {}", request.method, request.url),
    }
    .into()
}

/// Transport decorator consulting a [`FaultInjector`] before every send.
pub struct FaultInjectingTransport<T> {
    inner: T,
    injector: FaultInjector,
}

impl<T: HttpTransport> FaultInjectingTransport<T> {
    pub fn new(inner: T, injector: FaultInjector) -> Self {
        Self { inner, injector }
    }

    pub fn injector(&self) -> &FaultInjector {
        &self.injector
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

#[async_trait]
impl<T: HttpTransport> HttpTransport for FaultInjectingTransport<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, KeycloakError> {
        if let Some(error) = self.injector.on_request(&request) {
            tracing::debug!(
                method = request.method.as_str(),
                url = %request.url,
                "injected request failure"
            );
            return Err(error);
        }

        self.inner.send(request).await
    }
}
