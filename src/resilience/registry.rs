//! One circuit breaker per destination.
//!
//! Integrations own a registry (or a single breaker) and inject it into the
//! clients that talk to their dependency. Keys are destination identities
//! (`host:port` by default), so a failing email API never trips the breaker
//! guarding the payment gateway.

use super::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerSnapshot};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

pub struct BreakerRegistry {
    default_cfg: CircuitBreakerConfig,
    overrides: RwLock<HashMap<String, CircuitBreakerConfig>>,
    breakers: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
}

impl BreakerRegistry {
    pub fn new(default_cfg: CircuitBreakerConfig) -> Self {
        Self {
            default_cfg,
            overrides: RwLock::new(HashMap::new()),
            breakers: RwLock::new(HashMap::new()),
        }
    }

    /// Use a dedicated config for `destination`. Only affects breakers created afterwards.
    pub fn configure(&self, destination: impl Into<String>, cfg: CircuitBreakerConfig) {
        self.overrides
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(destination.into(), cfg);
    }

    /// Breaker for `destination`, created on first use.
    pub fn breaker_for(&self, destination: &str) -> Arc<CircuitBreaker> {
        if let Some(b) = self
            .breakers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(destination)
        {
            return b.clone();
        }

        let cfg = self
            .overrides
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(destination)
            .cloned()
            .unwrap_or_else(|| self.default_cfg.clone());

        let mut breakers = self.breakers.write().unwrap_or_else(|e| e.into_inner());
        breakers
            .entry(destination.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(destination, cfg)))
            .clone()
    }

    pub fn get(&self, destination: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(destination)
            .cloned()
    }

    /// Snapshots of every known destination, sorted by destination.
    pub fn snapshots(&self) -> Vec<CircuitBreakerSnapshot> {
        let mut out: Vec<CircuitBreakerSnapshot> = self
            .breakers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .map(|b| b.snapshot())
            .collect();
        out.sort_by(|a, b| a.destination.cmp(&b.destination));
        out
    }

    pub fn len(&self) -> usize {
        self.breakers.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for BreakerRegistry {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}
