//! Single-attempt execution: one transport call under a deadline, raced against cancellation.
//!
//! Retry/backoff decisions live in the caller's loop (`core.rs`).

use crate::classify::RawFailure;
use crate::request::{RequestDescriptor, Response};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use super::core::ResilientClient;
use super::types::CancelHandle;

/// What one attempt produced, before classification.
pub(crate) enum AttemptOutcome {
    Success(Response),
    Failed(RawFailure),
    Cancelled,
}

impl ResilientClient {
    /// Run exactly one attempt. Returns the outcome and the time it took.
    ///
    /// A non-2xx response is a failure here; the transport only errors for
    /// exchanges that never completed.
    pub(crate) async fn execute_once(
        &self,
        request: &RequestDescriptor,
        deadline: Duration,
        attempt: u32,
        cancel: &CancelHandle,
    ) -> (AttemptOutcome, Duration) {
        let start = Instant::now();
        debug!(
            attempt,
            method = request.method().as_str(),
            destination = request.destination().as_str(),
            deadline_ms = deadline.as_millis() as u64,
            "outbound attempt started"
        );

        let send = tokio::time::timeout(deadline, self.transport.send(request, deadline));
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => AttemptOutcome::Cancelled,
            res = send => match res {
                Err(_elapsed) => AttemptOutcome::Failed(RawFailure::DeadlineExceeded),
                Ok(Err(e)) => AttemptOutcome::Failed(RawFailure::Transport(e)),
                Ok(Ok(resp)) if resp.is_success() => AttemptOutcome::Success(resp),
                Ok(Ok(resp)) => AttemptOutcome::Failed(RawFailure::Status(resp)),
            },
        };
        (outcome, start.elapsed())
    }
}
