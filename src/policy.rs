//! Retry policy configuration and the caller-supplied seams it carries.
//!
//! A [`RetryPolicy`] is the full configuration of one logical call. Clients hold a
//! default policy; each request may pass [`PolicyOverrides`] that are merged on top.
//!
//! Hooks are plain single-method traits ([`RetryPredicate`], [`RetryObserver`],
//! [`RandomSource`]) with blanket impls for closures, so both styles work:
//!
//! ```rust
//! use outbound_resilience::{AttemptFailure, RetryEvent, RetryPolicy};
//!
//! let policy = RetryPolicy::default()
//!     .with_max_retries(4)
//!     // Retry 429 explicitly; 4xx are never retried by default.
//!     .with_should_retry(|f: &AttemptFailure| {
//!         f.classification.status_code == Some(429) || f.classification.is_transient()
//!     })
//!     .with_on_retry(|e: &RetryEvent| {
//!         tracing::info!(attempt = e.attempt, "partner inventory sync retrying");
//!     });
//! assert_eq!(policy.max_attempts(), 5);
//! ```

use crate::classify::AttemptFailure;
use crate::transport::TransportErrorCode;
use crate::{Error, ErrorContext, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Decides whether a failed attempt may be retried. Overrides the default classification.
pub trait RetryPredicate: Send + Sync {
    fn should_retry(&self, failure: &AttemptFailure) -> bool;
}

impl<F> RetryPredicate for F
where
    F: Fn(&AttemptFailure) -> bool + Send + Sync,
{
    fn should_retry(&self, failure: &AttemptFailure) -> bool {
        self(failure)
    }
}

/// Emitted once per scheduled retry, before the backoff sleep starts.
#[derive(Debug, Clone)]
pub struct RetryEvent {
    /// Ordinal of the attempt that just failed (1-based).
    pub attempt: u32,
    /// Backoff that will be slept before the next attempt.
    pub delay: Duration,
    pub failure: AttemptFailure,
    pub destination: String,
    pub client_request_id: String,
}

/// Observer notified before each retry. Best-effort: panics are caught and logged.
pub trait RetryObserver: Send + Sync {
    fn on_retry(&self, event: &RetryEvent);
}

impl<F> RetryObserver for F
where
    F: Fn(&RetryEvent) + Send + Sync,
{
    fn on_retry(&self, event: &RetryEvent) {
        self(event)
    }
}

/// Observer that forwards every [`RetryEvent`] onto an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<RetryEvent>,
}

impl ChannelObserver {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RetryEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl RetryObserver for ChannelObserver {
    fn on_retry(&self, event: &RetryEvent) {
        // A dropped receiver just means nobody is listening any more.
        let _ = self.tx.send(event.clone());
    }
}

/// Source of uniform samples in `[0, 1)` used for jitter.
pub trait RandomSource: Send + Sync {
    fn next_unit(&self) -> f64;
}

/// Thread-local RNG; the default.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_unit(&self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }
}

/// Seeded RNG for reproducible backoff timing.
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_unit(&self) -> f64 {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        rng.gen::<f64>()
    }
}

/// Full retry configuration for one logical call.
#[derive(Clone)]
pub struct RetryPolicy {
    /// Deadline of each individual attempt.
    pub timeout: Duration,
    /// Retries beyond the first attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub jitter: bool,
    pub retryable_status_codes: HashSet<u16>,
    pub retryable_error_codes: HashSet<TransportErrorCode>,
    pub should_retry: Option<Arc<dyn RetryPredicate>>,
    pub on_retry: Option<Arc<dyn RetryObserver>>,
    pub random: Arc<dyn RandomSource>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(30_000),
            max_retries: 3,
            base_delay: Duration::from_millis(1_000),
            max_delay: Duration::from_millis(30_000),
            backoff_multiplier: 2.0,
            jitter: true,
            retryable_status_codes: [500, 502, 503, 504].into_iter().collect(),
            retryable_error_codes: TransportErrorCode::NETWORK.iter().cloned().collect(),
            should_retry: None,
            on_retry: None,
            random: Arc::new(ThreadRandom),
        }
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("backoff_multiplier", &self.backoff_multiplier)
            .field("jitter", &self.jitter)
            .field("retryable_status_codes", &self.retryable_status_codes)
            .field("retryable_error_codes", &self.retryable_error_codes)
            .field("should_retry", &self.should_retry.as_ref().map(|_| "<predicate>"))
            .field("on_retry", &self.on_retry.as_ref().map(|_| "<observer>"))
            .finish()
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total attempts this policy allows (`max_retries + 1`).
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    pub fn with_jitter(mut self, enable: bool) -> Self {
        self.jitter = enable;
        self
    }

    pub fn with_retryable_status_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.retryable_status_codes = codes.into_iter().collect();
        self
    }

    pub fn with_retryable_error_codes(
        mut self,
        codes: impl IntoIterator<Item = TransportErrorCode>,
    ) -> Self {
        self.retryable_error_codes = codes.into_iter().collect();
        self
    }

    pub fn with_should_retry(mut self, predicate: impl RetryPredicate + 'static) -> Self {
        self.should_retry = Some(Arc::new(predicate));
        self
    }

    pub fn with_on_retry(mut self, observer: impl RetryObserver + 'static) -> Self {
        self.on_retry = Some(Arc::new(observer));
        self
    }

    pub fn with_random(mut self, random: impl RandomSource + 'static) -> Self {
        self.random = Arc::new(random);
        self
    }

    /// Reject configurations the backoff calculator cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(invalid("policy.timeout", "timeout must be greater than zero", None));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(invalid(
                "policy.backoff_multiplier",
                "backoff multiplier must be a finite number >= 1.0",
                Some(self.backoff_multiplier.to_string()),
            ));
        }
        if self.base_delay > self.max_delay {
            return Err(invalid(
                "policy.base_delay",
                "base delay must not exceed max delay",
                Some(format!(
                    "base_delay={}ms max_delay={}ms",
                    self.base_delay.as_millis(),
                    self.max_delay.as_millis()
                )),
            ));
        }
        Ok(())
    }

    /// Apply per-call overrides on top of this policy (override wins).
    pub fn merged(&self, overrides: &PolicyOverrides) -> RetryPolicy {
        let mut p = self.clone();
        if let Some(v) = overrides.timeout {
            p.timeout = v;
        }
        if let Some(v) = overrides.max_retries {
            p.max_retries = v;
        }
        if let Some(v) = overrides.base_delay {
            p.base_delay = v;
        }
        if let Some(v) = overrides.max_delay {
            p.max_delay = v;
        }
        if let Some(v) = overrides.backoff_multiplier {
            p.backoff_multiplier = v;
        }
        if let Some(v) = overrides.jitter {
            p.jitter = v;
        }
        if let Some(v) = &overrides.retryable_status_codes {
            p.retryable_status_codes = v.clone();
        }
        if let Some(v) = &overrides.retryable_error_codes {
            p.retryable_error_codes = v.clone();
        }
        if let Some(v) = &overrides.should_retry {
            p.should_retry = Some(v.clone());
        }
        if let Some(v) = &overrides.on_retry {
            p.on_retry = Some(v.clone());
        }
        if let Some(v) = &overrides.random {
            p.random = v.clone();
        }
        p
    }
}

fn invalid(field: &str, msg: &str, details: Option<String>) -> Error {
    let mut ctx = ErrorContext::new()
        .with_field_path(field)
        .with_source("policy_validator");
    if let Some(d) = details {
        ctx = ctx.with_details(d);
    }
    Error::configuration_with_context(msg, ctx)
}

/// Partial policy supplied per request; unset fields keep the client default.
#[derive(Clone, Default)]
pub struct PolicyOverrides {
    pub timeout: Option<Duration>,
    pub max_retries: Option<u32>,
    pub base_delay: Option<Duration>,
    pub max_delay: Option<Duration>,
    pub backoff_multiplier: Option<f64>,
    pub jitter: Option<bool>,
    pub retryable_status_codes: Option<HashSet<u16>>,
    pub retryable_error_codes: Option<HashSet<TransportErrorCode>>,
    pub should_retry: Option<Arc<dyn RetryPredicate>>,
    pub on_retry: Option<Arc<dyn RetryObserver>>,
    pub random: Option<Arc<dyn RandomSource>>,
}

impl fmt::Debug for PolicyOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyOverrides")
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("backoff_multiplier", &self.backoff_multiplier)
            .field("jitter", &self.jitter)
            .field("retryable_status_codes", &self.retryable_status_codes)
            .field("retryable_error_codes", &self.retryable_error_codes)
            .field("should_retry", &self.should_retry.is_some())
            .field("on_retry", &self.on_retry.is_some())
            .finish()
    }
}

impl PolicyOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = Some(delay);
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = Some(delay);
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = Some(multiplier);
        self
    }

    pub fn with_jitter(mut self, enable: bool) -> Self {
        self.jitter = Some(enable);
        self
    }

    pub fn with_retryable_status_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.retryable_status_codes = Some(codes.into_iter().collect());
        self
    }

    pub fn with_retryable_error_codes(
        mut self,
        codes: impl IntoIterator<Item = TransportErrorCode>,
    ) -> Self {
        self.retryable_error_codes = Some(codes.into_iter().collect());
        self
    }

    pub fn with_should_retry(mut self, predicate: impl RetryPredicate + 'static) -> Self {
        self.should_retry = Some(Arc::new(predicate));
        self
    }

    pub fn with_on_retry(mut self, observer: impl RetryObserver + 'static) -> Self {
        self.on_retry = Some(Arc::new(observer));
        self
    }

    pub fn with_random(mut self, random: impl RandomSource + 'static) -> Self {
        self.random = Some(Arc::new(random));
        self
    }
}
