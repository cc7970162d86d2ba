//! # outbound-resilience
//!
//! Resilient outbound request client used by the warehouse integrations
//! (webhook delivery, payment gateway, transactional email, partner inventory
//! sync, Slack notifications).
//!
//! ## Overview
//!
//! Every call to a third party goes through the same layer:
//!
//! ```text
//! caller → CircuitBreaker::call        (gate check, per destination)
//!        → ResilientClient attempt loop (deadline → classify → backoff → sleep → retry)
//!        → Response, or one terminal Error
//!        → breaker records the logical outcome
//! ```
//!
//! ## Key Components
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`request`] | Request descriptor and response envelope |
//! | [`transport`] | One HTTP request under a deadline (`reqwest` by default) |
//! | [`policy`] | Retry policy, per-call overrides, observer and predicate seams |
//! | [`backoff`] | Exponential backoff with equal jitter |
//! | [`classify`] | Normalises raw failures into timeout / network / status |
//! | [`client`] | The attempt loop and its builder |
//! | [`resilience`] | Circuit breaker and per-destination registry |
//! | [`config`] | YAML / environment configuration |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use outbound_resilience::{PolicyOverrides, RequestDescriptor, ResilientClientBuilder};
//!
//! #[tokio::main]
//! async fn main() -> outbound_resilience::Result<()> {
//!     let client = ResilientClientBuilder::new().build()?;
//!
//!     let request = RequestDescriptor::post("https://hooks.slack.com/services/T000/B000/XXX")?
//!         .with_body(r#"{"text":"Pick list 1042 printed"}"#)
//!         .with_header("content-type", "application/json");
//!
//!     let response = client
//!         .request(request, PolicyOverrides::new().with_max_retries(2))
//!         .await?;
//!     println!("delivered with HTTP {}", response.status());
//!     Ok(())
//! }
//! ```

pub mod backoff;
pub mod classify;
pub mod client;
pub mod config;
pub mod error_code;
pub mod policy;
pub mod request;
pub mod resilience;
pub mod transport;

// Re-export main types for convenience
pub use backoff::BackoffCalculator;
pub use classify::{AttemptFailure, Classification, ErrorClassifier, RawFailure};
pub use client::{
    AttemptRecord, AttemptResult, CallStats, CancelHandle, ResilientClient, ResilientClientBuilder,
};
pub use config::ClientConfig;
pub use error_code::ErrorKind;
pub use policy::{
    ChannelObserver, PolicyOverrides, RandomSource, RetryEvent, RetryObserver, RetryPolicy,
    RetryPredicate, SeededRandom, ThreadRandom,
};
pub use request::{Method, RequestDescriptor, Response};
pub use resilience::circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerSnapshot, CircuitState,
};
pub use resilience::registry::BreakerRegistry;
pub use transport::{HttpTransport, Transport, TransportError, TransportErrorCode};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext, HttpRequestError};
