//! Credential sources for destinations

pub mod client;

use async_trait::async_trait;
use warden_core::CredentialSource;
use warden_domain::{DestinationCredentials, Result};

pub use client::DestinationCredentialSource;

/// Fixed credentials, for targets configured without a destination service.
#[derive(Debug, Clone)]
pub struct StaticCredentialSource {
    credentials: DestinationCredentials,
}

impl StaticCredentialSource {
    pub fn new(credentials: DestinationCredentials) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl CredentialSource for StaticCredentialSource {
    async fn credentials(&self) -> Result<DestinationCredentials> {
        Ok(self.credentials.clone())
    }
}
