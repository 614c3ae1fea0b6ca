//! Specialized data structures
//!
//! - **[`event_buffer`]**: bounded, correlation-id keyed staging area with
//!   explicit overflow

pub mod event_buffer;

// Re-export commonly used types
pub use event_buffer::EventBuffer;
