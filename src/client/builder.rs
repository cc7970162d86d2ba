use crate::client::core::ResilientClient;
use crate::config::ClientConfig;
use crate::policy::RetryPolicy;
use crate::resilience::registry::BreakerRegistry;
use crate::transport::{HttpTransport, Transport};
use crate::Result;
use std::sync::Arc;

/// Builder for creating clients with custom configuration.
///
/// Keep this surface area small and predictable (developer-friendly).
pub struct ResilientClientBuilder {
    transport: Option<Arc<dyn Transport>>,
    policy: RetryPolicy,
    breakers: Option<Arc<BreakerRegistry>>,
}

impl ResilientClientBuilder {
    pub fn new() -> Self {
        Self {
            transport: None,
            policy: RetryPolicy::default(),
            breakers: None,
        }
    }

    /// Use a custom transport (tests, alternative HTTP stacks).
    ///
    /// Defaults to [`HttpTransport`] when unset.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_transport(self, transport: impl Transport + 'static) -> Self {
        self.transport(Arc::new(transport))
    }

    /// Client-level default policy. Per-call overrides are merged on top.
    pub fn policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Route every call through the breaker of its destination.
    ///
    /// Share one registry between clients that talk to the same dependencies.
    pub fn breakers(mut self, registry: Arc<BreakerRegistry>) -> Self {
        self.breakers = Some(registry);
        self
    }

    /// Apply a loaded [`ClientConfig`]: its policy replaces the current one, and a
    /// fresh registry is installed when the breaker section is enabled.
    pub fn config(mut self, config: &ClientConfig) -> Self {
        self.policy = config.retry_policy();
        if config.breaker.enabled {
            self.breakers = Some(Arc::new(BreakerRegistry::new(config.breaker_config())));
        }
        self
    }

    pub fn build(self) -> Result<ResilientClient> {
        self.policy.validate()?;
        let transport = match self.transport {
            Some(t) => t,
            None => Arc::new(HttpTransport::new()?),
        };
        Ok(ResilientClient {
            transport,
            defaults: self.policy,
            breakers: self.breakers,
        })
    }
}

impl Default for ResilientClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
