//! Resilient client: the per-call attempt loop and its builder.
//!
//! Developer-friendly goal: keep the public surface small and predictable.
//! Implementation details are split into submodules under `src/client/`.

pub mod builder;
pub mod core;
mod execution;
mod policy;
pub mod types;

pub use builder::ResilientClientBuilder;
pub use self::core::ResilientClient;
pub use types::{AttemptRecord, AttemptResult, CallStats, CancelHandle};
