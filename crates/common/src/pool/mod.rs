//! Bounded worker pool
//!
//! - **[`worker_pool`]**: tokio workers draining a bounded queue with a
//!   non-blocking rejection path

pub mod worker_pool;

pub use worker_pool::{JobHandle, WorkerPool, WorkerPoolConfig, WorkerPoolMetrics};
