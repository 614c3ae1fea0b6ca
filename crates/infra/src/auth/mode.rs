use std::fmt;
use std::sync::Arc;

use warden_core::CredentialSource;
use warden_domain::{AuthConfig, AuthType, DestinationAuth, KeyStoreDetails};

/// Authentication mode of a client, resolved from configuration.
#[derive(Clone)]
pub enum AuthMode {
    Basic { user: String, password: String },
    OAuth { client_id: String, client_secret: String, token_url: String },
    /// Certificate material supplied directly by configuration.
    Certificate(KeyStoreDetails),
    /// Certificate material re-resolved from the destination service on
    /// every trust reload.
    CertificateFromDestination(Arc<dyn CredentialSource>),
}

impl AuthMode {
    /// Mode for credentials that are already resolved.
    pub fn from_credentials(auth: &DestinationAuth) -> Self {
        match auth.clone() {
            DestinationAuth::Basic { user, password } => Self::Basic { user, password },
            DestinationAuth::OAuth { client_id, client_secret, token_url } => {
                Self::OAuth { client_id, client_secret, token_url }
            }
            DestinationAuth::Certificate { keystore } => Self::Certificate(keystore),
        }
    }

    /// Mode for non-destination configuration; `None` for
    /// [`AuthConfig::Destination`], which needs a credential source.
    pub fn from_config(config: &AuthConfig) -> Option<Self> {
        match config.clone() {
            AuthConfig::Basic { user, password } => Some(Self::Basic { user, password }),
            AuthConfig::OAuth { client_id, client_secret, token_url } => {
                Some(Self::OAuth { client_id, client_secret, token_url })
            }
            AuthConfig::Certificate { keystore } => Some(Self::Certificate(keystore)),
            AuthConfig::Destination { .. } => None,
        }
    }

    pub fn auth_type(&self) -> AuthType {
        match self {
            Self::Basic { .. } => AuthType::Basic,
            Self::OAuth { .. } => AuthType::OAuth,
            Self::Certificate(_) | Self::CertificateFromDestination(_) => AuthType::Certificate,
        }
    }
}

impl fmt::Debug for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic { user, .. } => f.debug_struct("Basic").field("user", user).finish_non_exhaustive(),
            Self::OAuth { client_id, token_url, .. } => f
                .debug_struct("OAuth")
                .field("client_id", client_id)
                .field("token_url", token_url)
                .finish_non_exhaustive(),
            Self::Certificate(keystore) => f.debug_tuple("Certificate").field(keystore).finish(),
            Self::CertificateFromDestination(_) => f.write_str("CertificateFromDestination"),
        }
    }
}
