use crate::{Error, Result};
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerSnapshot {
    pub destination: String,
    pub state: CircuitState,
    pub failure_threshold: u32,
    pub reset_timeout_ms: u64,
    pub failure_count: u32,
    /// Remaining open time in ms, if currently open.
    pub open_remaining_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub reset_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_millis(60_000),
        }
    }
}

impl CircuitBreakerConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the failure threshold (values below 1 behave as 1)
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Set how long the circuit stays open before admitting a probe
    pub fn with_reset_timeout(mut self, timeout: Duration) -> Self {
        self.reset_timeout = timeout;
        self
    }
}

#[derive(Debug)]
struct State {
    state: CircuitState,
    failure_count: u32,
    last_failure: Option<Instant>,
    probe_in_flight: bool,
}

/// Per-destination circuit breaker.
///
/// - CLOSED counts consecutive logical failures and opens at the threshold
/// - OPEN rejects immediately until `reset_timeout` has passed since the last failure
/// - HALF_OPEN admits exactly one probe; concurrent callers are rejected until it resolves
pub struct CircuitBreaker {
    destination: String,
    cfg: CircuitBreakerConfig,
    state: Mutex<State>,
}

/// Releases the half-open probe slot if the probe never reported an outcome
/// (for example because its future was dropped).
struct ProbeGuard<'a> {
    breaker: &'a CircuitBreaker,
    armed: bool,
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.breaker.lock().probe_in_flight = false;
        }
    }
}

impl CircuitBreaker {
    pub fn new(destination: impl Into<String>, cfg: CircuitBreakerConfig) -> Self {
        Self {
            destination: destination.into(),
            cfg,
            state: Mutex::new(State {
                state: CircuitState::Closed,
                failure_count: 0,
                last_failure: None,
                probe_in_flight: false,
            }),
        }
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    fn threshold(&self) -> u32 {
        self.cfg.failure_threshold.max(1)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // Every transition leaves State consistent, so a poisoned lock is still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Gate check. `Ok(true)` means the caller was admitted as the half-open probe.
    fn admit(&self) -> Result<bool> {
        let mut st = self.lock();
        match st.state {
            CircuitState::Closed => Ok(false),
            CircuitState::Open => {
                let since = st
                    .last_failure
                    .map(|t| t.elapsed())
                    .unwrap_or(self.cfg.reset_timeout);
                if since >= self.cfg.reset_timeout {
                    st.state = CircuitState::HalfOpen;
                    st.probe_in_flight = true;
                    info!(
                        destination = self.destination.as_str(),
                        "circuit breaker half-open, admitting probe"
                    );
                    Ok(true)
                } else {
                    Err(Error::CircuitOpen {
                        destination: self.destination.clone(),
                        retry_in_ms: Some((self.cfg.reset_timeout - since).as_millis() as u64),
                    })
                }
            }
            CircuitState::HalfOpen => {
                if st.probe_in_flight {
                    Err(Error::CircuitOpen {
                        destination: self.destination.clone(),
                        retry_in_ms: None,
                    })
                } else {
                    st.probe_in_flight = true;
                    Ok(true)
                }
            }
        }
    }

    /// Read-only view of whether a `call` made now would be let through.
    ///
    /// Never claims the half-open probe slot; only `call` does that.
    pub fn is_call_permitted(&self) -> bool {
        let st = self.lock();
        match st.state {
            CircuitState::Closed => true,
            CircuitState::Open => st
                .last_failure
                .map_or(true, |t| t.elapsed() >= self.cfg.reset_timeout),
            CircuitState::HalfOpen => !st.probe_in_flight,
        }
    }

    pub(crate) fn on_success(&self) {
        let mut st = self.lock();
        if st.state != CircuitState::Closed {
            info!(
                destination = self.destination.as_str(),
                "circuit breaker closed"
            );
        }
        st.failure_count = 0;
        st.state = CircuitState::Closed;
        st.probe_in_flight = false;
    }

    pub(crate) fn on_failure(&self) {
        let mut st = self.lock();
        st.failure_count = st.failure_count.saturating_add(1);
        st.last_failure = Some(Instant::now());
        match st.state {
            CircuitState::HalfOpen => {
                st.state = CircuitState::Open;
                st.probe_in_flight = false;
                warn!(
                    destination = self.destination.as_str(),
                    "circuit breaker probe failed, reopening"
                );
            }
            CircuitState::Closed if st.failure_count >= self.threshold() => {
                st.state = CircuitState::Open;
                warn!(
                    destination = self.destination.as_str(),
                    failure_count = st.failure_count,
                    reset_timeout_ms = self.cfg.reset_timeout.as_millis() as u64,
                    "circuit breaker opened"
                );
            }
            _ => {}
        }
    }

    /// Run `operation` behind the breaker.
    ///
    /// One logical outcome is recorded per call: `Ok` resets, errors that
    /// [count as failures](Error::counts_as_breaker_failure) increment. Rejected
    /// calls never invoke `operation`.
    pub async fn call<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let probe = self.admit()?;
        let mut guard = ProbeGuard {
            breaker: self,
            armed: probe,
        };

        let result = operation().await;
        match &result {
            Ok(_) => {
                guard.armed = false;
                self.on_success();
            }
            Err(e) if e.counts_as_breaker_failure() => {
                guard.armed = false;
                self.on_failure();
            }
            // Cancelled probe: the guard frees the slot and HALF_OPEN waits for the next caller.
            Err(_) => {}
        }
        drop(guard);
        result
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn snapshot(&self) -> CircuitBreakerSnapshot {
        let st = self.lock();
        let open_remaining_ms = match (st.state, st.last_failure) {
            (CircuitState::Open, Some(t)) => {
                let since = t.elapsed();
                if since < self.cfg.reset_timeout {
                    Some((self.cfg.reset_timeout - since).as_millis() as u64)
                } else {
                    None
                }
            }
            _ => None,
        };
        CircuitBreakerSnapshot {
            destination: self.destination.clone(),
            state: st.state,
            failure_threshold: self.cfg.failure_threshold,
            reset_timeout_ms: self.cfg.reset_timeout.as_millis() as u64,
            failure_count: st.failure_count,
            open_remaining_ms,
        }
    }
}
