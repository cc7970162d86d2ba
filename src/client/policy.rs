use crate::backoff::BackoffCalculator;
use crate::classify::{AttemptFailure, ErrorClassifier, RawFailure};
use crate::policy::RetryPolicy;
use std::time::Duration;

/// Internal decision for how to proceed after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Decision {
    Retry { delay: Duration },
    Fail { exhausted: bool },
}

/// Internal policy engine: classification plus retry/backoff decisions for one call.
///
/// Important constraints:
/// - Keep this internal (no public API commitments yet).
/// - Prefer deterministic, explainable behavior over clever heuristics.
pub(crate) struct PolicyEngine<'a> {
    policy: &'a RetryPolicy,
    classifier: ErrorClassifier,
}

impl<'a> PolicyEngine<'a> {
    pub fn new(policy: &'a RetryPolicy) -> Self {
        Self {
            policy,
            classifier: ErrorClassifier::new(policy.retryable_error_codes.iter().cloned()),
        }
    }

    pub fn describe(&self, raw: &RawFailure, elapsed: Duration, timeout: Duration) -> AttemptFailure {
        self.classifier.describe(raw, elapsed, timeout)
    }

    /// 4xx statuses are never retried by default, even if listed.
    fn status_retryable(&self, status: u16) -> bool {
        !(400..500).contains(&status) && self.policy.retryable_status_codes.contains(&status)
    }

    pub fn is_retryable(&self, failure: &AttemptFailure) -> bool {
        if let Some(predicate) = &self.policy.should_retry {
            return predicate.should_retry(failure);
        }
        let c = &failure.classification;
        c.is_network_error
            || c.is_timeout
            || c.status_code.map(|s| self.status_retryable(s)).unwrap_or(false)
    }

    /// Decide what to do after attempt `attempt` (1-based) failed.
    ///
    /// The backoff is computed only when another attempt will actually follow.
    pub fn decide(&self, attempt: u32, failure: &AttemptFailure) -> Decision {
        if !self.is_retryable(failure) {
            return Decision::Fail { exhausted: false };
        }
        if attempt >= self.policy.max_attempts() {
            return Decision::Fail { exhausted: true };
        }
        Decision::Retry {
            delay: BackoffCalculator::new(self.policy).delay(attempt),
        }
    }
}
