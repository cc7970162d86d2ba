use crate::classify::RawFailure;
use crate::error::HttpRequestError;
use crate::policy::{PolicyOverrides, RetryEvent, RetryObserver, RetryPolicy};
use crate::request::{RequestDescriptor, Response};
use crate::resilience::registry::BreakerRegistry;
use crate::transport::Transport;
use crate::{Error, Result};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use super::execution::AttemptOutcome;
use super::policy::{Decision, PolicyEngine};
use super::types::{AttemptRecord, AttemptResult, CallStats, CancelHandle};

/// Correlation header sent on every attempt of a logical call.
pub const REQUEST_ID_HEADER: &str = "x-outbound-request-id";

/// Resilient outbound client.
///
/// Runs one logical call as a bounded sequence of attempts: each attempt gets its
/// own deadline, failures are classified, retryable ones are retried after an
/// exponential backoff, and the caller sees either the response or exactly one
/// terminal [`Error`].
///
/// When built with a [`BreakerRegistry`], every logical call is routed through
/// the breaker of its destination, which records one outcome per call.
pub struct ResilientClient {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) defaults: RetryPolicy,
    pub(crate) breakers: Option<Arc<BreakerRegistry>>,
}

impl ResilientClient {
    pub fn builder() -> super::builder::ResilientClientBuilder {
        super::builder::ResilientClientBuilder::new()
    }

    /// Client-level policy that per-call overrides are merged onto.
    pub fn defaults(&self) -> &RetryPolicy {
        &self.defaults
    }

    pub fn breakers(&self) -> Option<&Arc<BreakerRegistry>> {
        self.breakers.as_ref()
    }

    /// Execute `request`, retrying per the merged policy.
    pub async fn request(
        &self,
        request: RequestDescriptor,
        overrides: PolicyOverrides,
    ) -> Result<Response> {
        Ok(self.request_with_stats(request, overrides).await?.0)
    }

    /// Like [`request`](Self::request), also returning per-call stats (attempts, history, request id).
    pub async fn request_with_stats(
        &self,
        request: RequestDescriptor,
        overrides: PolicyOverrides,
    ) -> Result<(Response, CallStats)> {
        self.run(request, overrides, &CancelHandle::new()).await
    }

    /// Like [`request`](Self::request), but abortable through `cancel`.
    ///
    /// Cancelling aborts the in-flight attempt or pending backoff and resolves to
    /// [`Error::Cancelled`]. Breakers never count a cancelled call.
    pub async fn request_cancellable(
        &self,
        request: RequestDescriptor,
        overrides: PolicyOverrides,
        cancel: &CancelHandle,
    ) -> Result<Response> {
        Ok(self.run(request, overrides, cancel).await?.0)
    }

    async fn run(
        &self,
        request: RequestDescriptor,
        overrides: PolicyOverrides,
        cancel: &CancelHandle,
    ) -> Result<(Response, CallStats)> {
        let policy = self.defaults.merged(&overrides);
        policy.validate()?;

        let (request, client_request_id) = match request.header(REQUEST_ID_HEADER) {
            Some(id) => {
                let id = id.to_string();
                (request, id)
            }
            None => {
                let id = Uuid::new_v4().to_string();
                (request.with_header(REQUEST_ID_HEADER, id.clone()), id)
            }
        };

        match &self.breakers {
            Some(registry) => {
                let breaker = registry.breaker_for(&request.destination());
                breaker
                    .call(|| self.attempt_loop(&request, &policy, &client_request_id, cancel))
                    .await
            }
            None => {
                self.attempt_loop(&request, &policy, &client_request_id, cancel)
                    .await
            }
        }
    }

    /// The retry loop for one logical call.
    async fn attempt_loop(
        &self,
        request: &RequestDescriptor,
        policy: &RetryPolicy,
        client_request_id: &str,
        cancel: &CancelHandle,
    ) -> Result<(Response, CallStats)> {
        let engine = PolicyEngine::new(policy);
        let deadline = request.timeout().unwrap_or(policy.timeout);
        let destination = request.destination();
        let started = Instant::now();
        let mut history: Vec<AttemptRecord> = Vec::new();
        let mut attempt: u32 = 0;

        if cancel.is_cancelled() {
            return Err(Error::Cancelled { attempts: 0 });
        }

        loop {
            attempt = attempt.saturating_add(1);
            let (outcome, elapsed) = self.execute_once(request, deadline, attempt, cancel).await;

            let raw = match outcome {
                AttemptOutcome::Success(resp) => {
                    history.push(AttemptRecord {
                        attempt,
                        elapsed,
                        result: AttemptResult::Succeeded {
                            status: resp.status(),
                        },
                        backoff: None,
                    });
                    let stats = CallStats {
                        destination,
                        attempts: attempt,
                        retry_count: attempt - 1,
                        duration_ms: started.elapsed().as_millis(),
                        client_request_id: client_request_id.to_string(),
                        history,
                    };
                    info!(
                        http_status = resp.status(),
                        attempts = stats.attempts,
                        destination = stats.destination.as_str(),
                        client_request_id,
                        duration_ms = stats.duration_ms as u64,
                        "outbound request succeeded"
                    );
                    return Ok((resp, stats));
                }
                AttemptOutcome::Cancelled => {
                    info!(
                        attempts = attempt,
                        destination = destination.as_str(),
                        client_request_id,
                        "outbound request cancelled during attempt"
                    );
                    return Err(Error::Cancelled { attempts: attempt });
                }
                AttemptOutcome::Failed(raw) => raw,
            };

            let failure = engine.describe(&raw, elapsed, deadline);
            history.push(AttemptRecord {
                attempt,
                elapsed,
                result: AttemptResult::Failed(failure.classification.clone()),
                backoff: None,
            });

            let delay = match engine.decide(attempt, &failure) {
                Decision::Retry { delay } => delay,
                Decision::Fail { exhausted } => {
                    let c = &failure.classification;
                    info!(
                        attempts = attempt,
                        retries_exhausted = exhausted,
                        http_status = c.status_code.unwrap_or(0),
                        is_timeout = c.is_timeout,
                        is_network_error = c.is_network_error,
                        destination = destination.as_str(),
                        client_request_id,
                        duration_ms = started.elapsed().as_millis() as u64,
                        "outbound request failed"
                    );
                    let cause = match raw {
                        RawFailure::Transport(e) => Some(e),
                        _ => None,
                    };
                    return Err(Error::Request(HttpRequestError {
                        status_code: c.status_code,
                        is_timeout: c.is_timeout,
                        is_network_error: c.is_network_error,
                        kind: c.kind(),
                        message: failure.message,
                        attempts: attempt,
                        retries_exhausted: exhausted,
                        response_body: failure.response_body,
                        client_request_id: client_request_id.to_string(),
                        history,
                        cause,
                    }));
                }
            };

            if let Some(last) = history.last_mut() {
                last.backoff = Some(delay);
            }
            warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                http_status = failure.classification.status_code.unwrap_or(0),
                is_timeout = failure.classification.is_timeout,
                is_network_error = failure.classification.is_network_error,
                destination = destination.as_str(),
                "outbound attempt failed, retrying"
            );

            if let Some(observer) = &policy.on_retry {
                let event = RetryEvent {
                    attempt,
                    delay,
                    failure,
                    destination: destination.clone(),
                    client_request_id: client_request_id.to_string(),
                };
                notify(observer.as_ref(), &event);
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(
                        attempts = attempt,
                        destination = destination.as_str(),
                        client_request_id,
                        "outbound request cancelled during backoff"
                    );
                    return Err(Error::Cancelled { attempts: attempt });
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

/// onRetry is best-effort: a panicking observer must not break the call.
fn notify(observer: &dyn RetryObserver, event: &RetryEvent) {
    if catch_unwind(AssertUnwindSafe(|| observer.on_retry(event))).is_err() {
        warn!(
            attempt = event.attempt,
            destination = event.destination.as_str(),
            "retry observer panicked; ignoring"
        );
    }
}
