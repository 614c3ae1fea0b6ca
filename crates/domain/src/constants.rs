//! Domain constants
//!
//! Centralized defaults shared by the configuration layer and the runtime
//! components.

use std::time::Duration;

// Trust material
pub const DEFAULT_INVALIDATION_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_INVALIDATION_INTERVAL: Duration =
    Duration::from_secs(DEFAULT_INVALIDATION_INTERVAL_SECS);

// OAuth tokens are treated as expired this long before the issuer says so.
pub const TOKEN_EXPIRY_SKEW_SECS: i64 = 60;

// Request tracing
pub const DEFAULT_TRACE_HEADER: &str = "X-Vcap-Request-Id";

// Retry defaults
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BACKOFF_MS: u64 = 100;

// Dispatcher defaults
pub const DEFAULT_MIN_WORKERS: usize = 1;
pub const DEFAULT_MAX_WORKERS: usize = 4;
pub const DEFAULT_KEEP_ALIVE_SECS: u64 = 60;
pub const DEFAULT_BUFFER_CAPACITY: usize = 100;

// Transport
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

// Destination service
pub const DESTINATION_LOOKUP_PATH: &str = "/destination-configuration/v1/destinations";
