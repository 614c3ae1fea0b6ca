use async_trait::async_trait;
use warden_core::AuthorizationProvider;
use warden_domain::{AuthType, AuthorizationHeader, Result};

/// Provider for client certificate mode. Authentication happens during the
/// TLS handshake, so no header is ever produced.
#[derive(Debug, Clone, Copy, Default)]
pub struct CertificateAuthorization;

#[async_trait]
impl AuthorizationProvider for CertificateAuthorization {
    async fn value(&self) -> Result<Option<AuthorizationHeader>> {
        Ok(None)
    }

    fn auth_type(&self) -> AuthType {
        AuthType::Certificate
    }
}
