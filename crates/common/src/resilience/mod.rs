//! Resilience patterns
//!
//! - **[`retry`]**: bounded retry with fixed, interruptible backoff

pub mod retry;

pub use retry::{RetryExecutor, RetryPolicy};
