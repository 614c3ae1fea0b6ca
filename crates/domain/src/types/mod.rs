//! Domain types and models

pub mod auth;
pub mod destination;
pub mod http;
pub mod trust;

pub use auth::{AuthType, AuthorizationHeader};
pub use destination::{DestinationAuth, DestinationCredentials};
pub use http::{HttpVerb, TransportRequest, TransportResponse};
pub use trust::{KeyStoreDetails, KeyStoreType, TrustState};
