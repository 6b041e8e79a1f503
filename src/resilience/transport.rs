//! Resilient Transport
//!
//! Sends requests through an inner [`HttpTransport`], turns non-2xx answers
//! into errors and retries the failures a [`RetryPolicy`] condition matches.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::core::{HttpRequest, HttpResponse, HttpTransport};
use crate::error::{create_error_from_response, KeycloakError, KeycloakResult};
use crate::resilience::RetryPolicy;
use crate::telemetry::{LogContext, Logger, TracingLogger};

/// Retry statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryStats {
    /// Attempts sent, including retries.
    pub total_attempts: u64,
    /// Retries performed.
    pub retries: u64,
    /// Requests that finally failed.
    pub failed_requests: u64,
}

#[derive(Default)]
struct StatCounters {
    total_attempts: AtomicU64,
    retries: AtomicU64,
    failed_requests: AtomicU64,
}

/// Transport applying the retry policy.
pub struct ResilientTransport {
    inner: Arc<dyn HttpTransport>,
    policy: RetryPolicy,
    logger: Arc<dyn Logger>,
    stats: StatCounters,
}

impl ResilientTransport {
    /// Wrap `inner` with `policy`, logging through `tracing`.
    pub fn new(inner: Arc<dyn HttpTransport>, policy: RetryPolicy) -> Self {
        Self::with_logger(inner, policy, Arc::new(TracingLogger))
    }

    pub fn with_logger(
        inner: Arc<dyn HttpTransport>,
        policy: RetryPolicy,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            inner,
            policy,
            logger,
            stats: StatCounters::default(),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Underlying transport, for collaborators issuing raw requests.
    pub fn inner(&self) -> Arc<dyn HttpTransport> {
        self.inner.clone()
    }

    pub fn stats(&self) -> RetryStats {
        RetryStats {
            total_attempts: self.stats.total_attempts.load(Ordering::Relaxed),
            retries: self.stats.retries.load(Ordering::Relaxed),
            failed_requests: self.stats.failed_requests.load(Ordering::Relaxed),
        }
    }

    /// Send with retries. Returns only 2xx responses.
    pub async fn execute(&self, request: HttpRequest) -> KeycloakResult<HttpResponse> {
        let context = LogContext::new()
            .operation("http_request")
            .extra("method", request.method)
            .extra("url", &request.url);

        let mut retry = 0u32;
        loop {
            let attempt = retry + 1;
            self.logger
                .debug("sending request", &context.clone().extra("attempt", attempt));

            let (response, error) = match self.attempt(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(failure) => failure,
            };

            let matched = self.policy.matching_condition(response.as_ref(), Some(&error));
            match matched {
                Some(condition) if retry < self.policy.max_retries => {
                    let delay = self.policy.delay_for(retry);
                    self.logger.warn(
                        "retrying request",
                        &context
                            .clone()
                            .extra("attempt", attempt)
                            .extra("condition", condition)
                            .extra("delay_ms", delay.as_millis())
                            .extra("error", &error),
                    );
                    self.stats.retries.fetch_add(1, Ordering::Relaxed);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    retry += 1;
                }
                _ => {
                    self.fail(&context, attempt, &error);
                    return Err(error);
                }
            }
        }
    }

    /// Send once, without retry evaluation. Returns only 2xx responses.
    pub async fn execute_once(&self, request: HttpRequest) -> KeycloakResult<HttpResponse> {
        let context = LogContext::new()
            .operation("http_request")
            .extra("method", request.method)
            .extra("url", &request.url);

        self.logger
            .debug("sending request", &context.clone().extra("attempt", 1));

        self.attempt(request).await.map_err(|(_, error)| {
            self.fail(&context, 1, &error);
            error
        })
    }

    /// One attempt. A non-2xx response is kept next to its error so retry
    /// conditions can inspect both.
    async fn attempt(
        &self,
        request: HttpRequest,
    ) -> Result<HttpResponse, (Option<HttpResponse>, KeycloakError)> {
        self.stats.total_attempts.fetch_add(1, Ordering::Relaxed);

        match self.inner.send(request).await {
            Ok(response) if response.is_success() => Ok(response),
            Ok(response) => {
                let error = create_error_from_response(
                    response.status,
                    &response.status_text,
                    &response.body,
                );
                Err((Some(response), error))
            }
            Err(error) => Err((None, error)),
        }
    }

    fn fail(&self, context: &LogContext, attempt: u32, error: &KeycloakError) {
        self.stats.failed_requests.fetch_add(1, Ordering::Relaxed);
        self.logger.error(
            "request failed",
            &context
                .clone()
                .extra("attempts", attempt)
                .extra("error_code", error.error_code())
                .extra("error", error),
        );
    }
}
