//! Modular common utilities shared across Warden crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: bounded collections
//! - `runtime`: async infrastructure (retry, worker pool, clocks)
//! - `observability`: tracing (pulled in by `runtime`)

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod collections;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod pool;
#[cfg(feature = "runtime")]
pub mod resilience;
#[cfg(feature = "runtime")]
pub mod time;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "foundation")]
pub use collections::EventBuffer;
#[cfg(feature = "runtime")]
pub use pool::{JobHandle, WorkerPool, WorkerPoolConfig};
#[cfg(feature = "runtime")]
pub use resilience::{RetryExecutor, RetryPolicy};
#[cfg(feature = "runtime")]
pub use time::{Clock, MockClock, SystemClock};
