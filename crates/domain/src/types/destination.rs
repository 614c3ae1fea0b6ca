use std::fmt;

use serde::{Deserialize, Serialize};

use super::auth::AuthType;
use super::trust::KeyStoreDetails;

/// Credentials resolved for a named destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationCredentials {
    pub name: String,
    pub service_uri: String,
    pub auth: DestinationAuth,
}

impl DestinationCredentials {
    pub fn auth_type(&self) -> AuthType {
        self.auth.auth_type()
    }

    /// Keystore material when the destination uses client certificates.
    pub fn keystore(&self) -> Option<&KeyStoreDetails> {
        match &self.auth {
            DestinationAuth::Certificate { keystore } => Some(keystore),
            _ => None,
        }
    }
}

/// Type-specific credential fields of a destination.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DestinationAuth {
    Basic {
        user: String,
        password: String,
    },
    #[serde(rename = "oauth")]
    OAuth {
        client_id: String,
        client_secret: String,
        token_url: String,
    },
    Certificate {
        keystore: KeyStoreDetails,
    },
}

impl DestinationAuth {
    pub fn auth_type(&self) -> AuthType {
        match self {
            Self::Basic { .. } => AuthType::Basic,
            Self::OAuth { .. } => AuthType::OAuth,
            Self::Certificate { .. } => AuthType::Certificate,
        }
    }
}

impl fmt::Debug for DestinationAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic { user, .. } => {
                f.debug_struct("Basic").field("user", user).finish_non_exhaustive()
            }
            Self::OAuth { client_id, token_url, .. } => f
                .debug_struct("OAuth")
                .field("client_id", client_id)
                .field("token_url", token_url)
                .finish_non_exhaustive(),
            Self::Certificate { keystore } => {
                f.debug_struct("Certificate").field("keystore", keystore).finish()
            }
        }
    }
}
