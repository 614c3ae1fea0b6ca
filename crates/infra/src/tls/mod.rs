//! Client certificate material
//!
//! Loads keystores into TLS identities and keeps certificate-bound
//! transports fresh.

pub mod identity;
mod jks;
pub mod manager;

pub use identity::{load_identity, ClientIdentity};
pub use manager::{ActiveMaterial, TrustMaterialManager};
