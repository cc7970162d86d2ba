//! File and environment configuration for clients and breakers.
//!
//! ```yaml
//! retry:
//!   timeoutMs: 10000
//!   maxRetries: 4
//!   retryDelay: 500
//!   maxRetryDelay: 8000
//!   backoffMultiplier: 2.0
//!   enableJitter: true
//!   retryStatusCodes: [502, 503, 504]
//!   retryErrorCodes: [ECONNRESET, ECONNREFUSED, ETIMEDOUT]
//! breaker:
//!   failureThreshold: 5
//!   resetTimeout: 60000
//! ```
//!
//! Every field is optional. `OUTBOUND_*` environment variables override the file
//! (see [`ClientConfig::apply_env`]).

use crate::policy::{RetryPolicy, SeededRandom};
use crate::resilience::circuit_breaker::CircuitBreakerConfig;
use crate::transport::TransportErrorCode;
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetryConfig {
    pub timeout_ms: u64,
    pub max_retries: u32,
    /// Base backoff delay in ms.
    pub retry_delay: u64,
    pub max_retry_delay: u64,
    pub backoff_multiplier: f64,
    pub enable_jitter: bool,
    pub retry_status_codes: Vec<u16>,
    pub retry_error_codes: Vec<String>,
    /// Seed for reproducible jitter; thread RNG when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jitter_seed: Option<u64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            max_retries: 3,
            retry_delay: 1_000,
            max_retry_delay: 30_000,
            backoff_multiplier: 2.0,
            enable_jitter: true,
            retry_status_codes: vec![500, 502, 503, 504],
            retry_error_codes: TransportErrorCode::NETWORK
                .iter()
                .map(|c| c.as_str().to_string())
                .collect(),
            jitter_seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    /// Open window in ms before a probe is admitted.
    pub reset_timeout: u64,
    /// Route calls through per-destination breakers.
    pub enabled: bool,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: 60_000,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub retry: RetryConfig,
    pub breaker: BreakerConfig,
}

impl ClientConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&raw)
    }

    /// Overlay `OUTBOUND_*` environment variables onto this config.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `OUTBOUND_TIMEOUT_MS` | `retry.timeoutMs` |
    /// | `OUTBOUND_MAX_RETRIES` | `retry.maxRetries` |
    /// | `OUTBOUND_RETRY_DELAY_MS` | `retry.retryDelay` |
    /// | `OUTBOUND_MAX_RETRY_DELAY_MS` | `retry.maxRetryDelay` |
    /// | `OUTBOUND_BACKOFF_MULTIPLIER` | `retry.backoffMultiplier` |
    /// | `OUTBOUND_ENABLE_JITTER` | `retry.enableJitter` |
    /// | `OUTBOUND_RETRY_STATUS_CODES` | `retry.retryStatusCodes` (comma separated) |
    /// | `OUTBOUND_RETRY_ERROR_CODES` | `retry.retryErrorCodes` (comma separated) |
    /// | `OUTBOUND_JITTER_SEED` | `retry.jitterSeed` |
    /// | `OUTBOUND_BREAKER_FAILURE_THRESHOLD` | `breaker.failureThreshold` |
    /// | `OUTBOUND_BREAKER_RESET_TIMEOUT_MS` | `breaker.resetTimeout` |
    /// | `OUTBOUND_BREAKER_ENABLED` | `breaker.enabled` |
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// [`apply_env`](Self::apply_env) with an explicit lookup (tests, layered sources).
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let r = &mut self.retry;
        if let Some(v) = env_value(&lookup, "OUTBOUND_TIMEOUT_MS", "retry.timeoutMs")? {
            r.timeout_ms = v;
        }
        if let Some(v) = env_value(&lookup, "OUTBOUND_MAX_RETRIES", "retry.maxRetries")? {
            r.max_retries = v;
        }
        if let Some(v) = env_value(&lookup, "OUTBOUND_RETRY_DELAY_MS", "retry.retryDelay")? {
            r.retry_delay = v;
        }
        if let Some(v) =
            env_value(&lookup, "OUTBOUND_MAX_RETRY_DELAY_MS", "retry.maxRetryDelay")?
        {
            r.max_retry_delay = v;
        }
        if let Some(v) =
            env_value(&lookup, "OUTBOUND_BACKOFF_MULTIPLIER", "retry.backoffMultiplier")?
        {
            r.backoff_multiplier = v;
        }
        if let Some(v) = env_value(&lookup, "OUTBOUND_ENABLE_JITTER", "retry.enableJitter")? {
            r.enable_jitter = v;
        }
        if let Some(v) = env_list(&lookup, "OUTBOUND_RETRY_STATUS_CODES", "retry.retryStatusCodes")? {
            r.retry_status_codes = v;
        }
        if let Some(v) = env_list(&lookup, "OUTBOUND_RETRY_ERROR_CODES", "retry.retryErrorCodes")? {
            r.retry_error_codes = v;
        }
        if let Some(v) = env_value(&lookup, "OUTBOUND_JITTER_SEED", "retry.jitterSeed")? {
            r.jitter_seed = Some(v);
        }

        let b = &mut self.breaker;
        if let Some(v) = env_value(
            &lookup,
            "OUTBOUND_BREAKER_FAILURE_THRESHOLD",
            "breaker.failureThreshold",
        )? {
            b.failure_threshold = v;
        }
        if let Some(v) = env_value(
            &lookup,
            "OUTBOUND_BREAKER_RESET_TIMEOUT_MS",
            "breaker.resetTimeout",
        )? {
            b.reset_timeout = v;
        }
        if let Some(v) = env_value(&lookup, "OUTBOUND_BREAKER_ENABLED", "breaker.enabled")? {
            b.enabled = v;
        }
        Ok(())
    }

    /// Client-level default policy described by the `retry` section.
    pub fn retry_policy(&self) -> RetryPolicy {
        let r = &self.retry;
        let mut policy = RetryPolicy::default()
            .with_timeout(Duration::from_millis(r.timeout_ms))
            .with_max_retries(r.max_retries)
            .with_base_delay(Duration::from_millis(r.retry_delay))
            .with_max_delay(Duration::from_millis(r.max_retry_delay))
            .with_backoff_multiplier(r.backoff_multiplier)
            .with_jitter(r.enable_jitter)
            .with_retryable_status_codes(r.retry_status_codes.iter().copied())
            .with_retryable_error_codes(
                r.retry_error_codes
                    .iter()
                    .map(|c| TransportErrorCode::parse(c)),
            );
        if let Some(seed) = r.jitter_seed {
            policy = policy.with_random(SeededRandom::new(seed));
        }
        policy
    }

    pub fn breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig::new()
            .with_failure_threshold(self.breaker.failure_threshold)
            .with_reset_timeout(Duration::from_millis(self.breaker.reset_timeout))
    }
}

fn env_error(var: &str, field: &str, raw: &str) -> Error {
    Error::configuration_with_context(
        format!("invalid value for {}", var),
        ErrorContext::new()
            .with_field_path(field)
            .with_details(format!("{}={}", var, raw))
            .with_source("config_env"),
    )
}

fn env_value<T, F>(lookup: &F, var: &str, field: &str) -> Result<Option<T>>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| env_error(var, field, &raw)),
    }
}

fn env_list<T, F>(lookup: &F, var: &str, field: &str) -> Result<Option<Vec<T>>>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<T>().map_err(|_| env_error(var, field, &raw)))
        .collect::<Result<Vec<T>>>()
        .map(Some)
}
