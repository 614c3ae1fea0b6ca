//! Port interfaces for credentials

use async_trait::async_trait;
use warden_domain::{AuthType, AuthorizationHeader, DestinationCredentials, Result};

/// Supplies the `Authorization` header for outgoing requests.
///
/// Implementations own their cached state (tokens, deadlines) and guard it
/// internally, so a single instance can be shared across concurrent callers.
#[async_trait]
pub trait AuthorizationProvider: Send + Sync {
    /// Header value to attach, or `None` when authentication happens at the
    /// TLS layer.
    async fn value(&self) -> Result<Option<AuthorizationHeader>>;

    /// Scheme implemented by this provider.
    fn auth_type(&self) -> AuthType;
}

/// Resolves the current credentials of a destination.
///
/// Lookups are not cached; every call reflects the remote state.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn credentials(&self) -> Result<DestinationCredentials>;
}
