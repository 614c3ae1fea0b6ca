//! # Warden Core
//!
//! Port interfaces and transport-independent services.
//!
//! This crate contains:
//! - Port traits for authorization, credential lookup, HTTP transport and
//!   event delivery
//! - The [`AsyncDispatcher`] service that applies backpressure in front of an
//!   [`EventClient`]
//!
//! ## Architecture Principles
//! - Depends on `warden-common` and `warden-domain` only
//! - No HTTP, TLS or file system code
//! - All external dependencies via traits

pub mod auth;
pub mod dispatch;
pub mod transport;

// Re-export specific items to avoid ambiguity
pub use auth::ports::{AuthorizationProvider, CredentialSource};
pub use dispatch::ports::EventClient;
pub use dispatch::AsyncDispatcher;
pub use transport::ports::HttpTransport;
