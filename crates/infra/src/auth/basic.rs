use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use warden_core::AuthorizationProvider;
use warden_domain::{AuthType, AuthorizationHeader, Result, WardenError};

/// Static `Basic` credentials.
///
/// The header is rendered once at construction; every call returns the same
/// value.
#[derive(Debug, Clone)]
pub struct BasicAuthorization {
    header: AuthorizationHeader,
}

impl BasicAuthorization {
    /// # Errors
    /// Returns `WardenError::InvalidInput` when `user` or `password` is
    /// empty.
    pub fn new(user: &str, password: &str) -> Result<Self> {
        if user.is_empty() {
            return Err(WardenError::InvalidInput("basic auth user must not be empty".into()));
        }
        if password.is_empty() {
            return Err(WardenError::InvalidInput("basic auth password must not be empty".into()));
        }

        let encoded = STANDARD.encode(format!("{user}:{password}"));
        Ok(Self { header: AuthorizationHeader::basic(&encoded) })
    }

    pub fn header(&self) -> &AuthorizationHeader {
        &self.header
    }
}

#[async_trait]
impl AuthorizationProvider for BasicAuthorization {
    async fn value(&self) -> Result<Option<AuthorizationHeader>> {
        Ok(Some(self.header.clone()))
    }

    fn auth_type(&self) -> AuthType {
        AuthType::Basic
    }
}
