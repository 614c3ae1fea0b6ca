use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_INVALIDATION_INTERVAL;

/// Container format of client certificate material.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum KeyStoreType {
    Jks,
    Pkcs12,
    Pem,
}

impl KeyStoreType {
    /// Infer the format from a certificate file name.
    ///
    /// Returns `None` for unknown extensions so the caller can report the
    /// offending name.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let extension = name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase())?;
        match extension.as_str() {
            "pem" | "crt" | "cer" => Some(Self::Pem),
            "p12" | "pfx" => Some(Self::Pkcs12),
            "jks" => Some(Self::Jks),
            _ => None,
        }
    }
}

/// Keystore payload as delivered by configuration or the destination service.
///
/// `content` is base64 encoded; PEM content may also be supplied as plain
/// armored text.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyStoreDetails {
    #[serde(rename = "type")]
    pub keystore_type: KeyStoreType,
    #[serde(default)]
    pub password: String,
    pub content: String,
}

impl KeyStoreDetails {
    pub fn new(
        keystore_type: KeyStoreType,
        password: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self { keystore_type, password: password.into(), content: content.into() }
    }
}

impl fmt::Debug for KeyStoreDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyStoreDetails")
            .field("keystore_type", &self.keystore_type)
            .field("password", &"***")
            .field("content_len", &self.content.len())
            .finish()
    }
}

/// Snapshot describing the identity material currently bound to the
/// transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustState {
    pub load_time: DateTime<Utc>,
    pub cert_expiration: Option<DateTime<Utc>>,
    pub invalidation_interval: Option<Duration>,
}

impl TrustState {
    pub fn new(
        load_time: DateTime<Utc>,
        cert_expiration: Option<DateTime<Utc>>,
        invalidation_interval: Option<Duration>,
    ) -> Self {
        Self { load_time, cert_expiration, invalidation_interval }
    }

    /// Interval after which the material is rebuilt even if the certificate
    /// is still valid. Falls back to five minutes.
    pub fn effective_interval(&self) -> Duration {
        self.invalidation_interval.unwrap_or(DEFAULT_INVALIDATION_INTERVAL)
    }

    /// True once the invalidation window has passed or the leaf certificate
    /// has expired.
    pub fn is_reload_due(&self, now: DateTime<Utc>) -> bool {
        let window_elapsed = (now - self.load_time)
            .to_std()
            .map(|age| age > self.effective_interval())
            .unwrap_or(false);
        let certificate_expired = self.cert_expiration.is_some_and(|expires| now >= expires);

        window_elapsed || certificate_expired
    }
}
