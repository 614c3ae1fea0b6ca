//! Time utilities and abstractions
//!
//! - **[`clock`]**: real and mock clocks used for expiry calculations

pub mod clock;

// Re-export commonly used items
pub use clock::{Clock, MockClock, SystemClock};
