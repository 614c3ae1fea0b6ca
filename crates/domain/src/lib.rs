//! # Warden Domain
//!
//! Domain types shared by every Warden crate.
//!
//! This crate contains:
//! - The error taxonomy and `Result` alias
//! - Configuration structures
//! - Credential, trust and transport data types
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other Warden crates
//! - Only external dependencies allowed
//! - Pure data structures and small invariants (no I/O)

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
