//! # Warden Infrastructure
//!
//! Implementations of the `warden-core` ports.
//!
//! This crate contains:
//! - The reqwest HTTP transport and the authenticated [`RequestExecutor`]
//! - Basic, OAuth and client certificate authorization
//! - TLS identity loading and the [`TrustMaterialManager`]
//! - The destination service client
//! - Configuration loading, tracing setup and the client factory
//!
//! ## Architecture
//! - Implements traits defined in `warden-core`
//! - Depends on `warden-common`, `warden-core` and `warden-domain`
//! - Contains all "impure" code (network, TLS, environment, files)

pub mod auth;
pub mod config;
pub mod destination;
pub mod errors;
pub mod events;
pub mod factory;
pub mod http;
pub mod logging;
pub mod tls;

// Re-export commonly used items
pub use auth::{AuthMode, BasicAuthorization, CertificateAuthorization, OAuthAuthorization};
pub use destination::{DestinationCredentialSource, StaticCredentialSource};
pub use events::{EventReceipt, HttpEventClient};
pub use factory::{build_dispatcher, build_executor, ClientFactory};
pub use http::{Authentication, ReqwestTransport, RequestExecutor, TransportBuilder};
pub use logging::init_tracing;
pub use tls::{load_identity, ActiveMaterial, ClientIdentity, TrustMaterialManager};
