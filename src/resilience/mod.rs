//! Circuit breaking for outbound dependencies.
//!
//! ## Overview
//!
//! A breaker stops hammering a dependency that keeps failing:
//! - **Closed**: Normal operation, calls pass through
//! - **Open**: Failures reached the threshold, calls fail fast with `CircuitOpen`
//! - **Half-Open**: Reset window elapsed, a single probe tests recovery
//!
//! Breakers count one win/loss per *logical* call (a whole retry loop), never
//! per attempt, and each destination gets its own instance via [`registry`].
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`circuit_breaker`] | Breaker state machine and `call` wrapper |
//! | [`registry`] | Per-destination breaker ownership |
//!
//! ```rust
//! use outbound_resilience::resilience::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
//! use std::time::Duration;
//!
//! # async fn demo() -> outbound_resilience::Result<()> {
//! let config = CircuitBreakerConfig::new()
//!     .with_failure_threshold(5)
//!     .with_reset_timeout(Duration::from_secs(60));
//! let breaker = CircuitBreaker::new("api.payments.test:443", config);
//!
//! let receipt = breaker
//!     .call(|| async { Ok::<_, outbound_resilience::Error>("charged") })
//!     .await?;
//! assert_eq!(receipt, "charged");
//! # Ok(())
//! # }
//! ```

pub mod circuit_breaker;
pub mod registry;
