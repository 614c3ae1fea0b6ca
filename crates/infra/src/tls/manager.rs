//! Trust material lifecycle for client certificate authentication

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use warden_common::time::Clock;
use warden_core::{CredentialSource, HttpTransport};
use warden_domain::constants::{DEFAULT_INVALIDATION_INTERVAL, DEFAULT_TIMEOUT_SECS};
use warden_domain::{Result, TrustState, WardenError};

use super::identity::load_identity;
use crate::http::ReqwestTransport;

/// Transport currently bound to the loaded client identity.
#[derive(Clone)]
pub struct ActiveMaterial {
    pub transport: Arc<dyn HttpTransport>,
    pub service_uri: String,
    pub alias: String,
    pub state: TrustState,
}

impl std::fmt::Debug for ActiveMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveMaterial")
            .field("service_uri", &self.service_uri)
            .field("alias", &self.alias)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Keeps a certificate-bound transport fresh.
///
/// Material is (re)built from the [`CredentialSource`] on first use, once the
/// invalidation interval has elapsed, and once the leaf certificate has
/// expired. Reloads are serialized; readers keep using the previous
/// transport until the new one is swapped in, and a failed reload leaves the
/// previous material in place.
pub struct TrustMaterialManager {
    source: Arc<dyn CredentialSource>,
    clock: Arc<dyn Clock>,
    invalidation_interval: Duration,
    timeout: Duration,
    user_agent: Option<String>,
    root_certificates: Vec<reqwest::Certificate>,
    current: RwLock<Option<ActiveMaterial>>,
    reload_lock: Mutex<()>,
}

impl TrustMaterialManager {
    pub fn new(source: Arc<dyn CredentialSource>, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            clock,
            invalidation_interval: DEFAULT_INVALIDATION_INTERVAL,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: None,
            root_certificates: Vec::new(),
            current: RwLock::new(None),
            reload_lock: Mutex::new(()),
        }
    }

    pub fn with_invalidation_interval(mut self, interval: Duration) -> Self {
        self.invalidation_interval = interval;
        self
    }

    /// Request timeout applied to every transport built by this manager.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Extra server roots trusted by every transport built by this manager.
    pub fn with_root_certificate(mut self, certificate: reqwest::Certificate) -> Self {
        self.root_certificates.push(certificate);
        self
    }

    pub fn invalidation_interval(&self) -> Duration {
        self.invalidation_interval
    }

    /// Snapshot of the loaded material without triggering a reload.
    pub fn loaded(&self) -> Option<ActiveMaterial> {
        self.current.read().clone()
    }

    /// True when nothing is loaded yet or the loaded material is stale.
    pub fn is_reload_due(&self) -> bool {
        self.reload_due_at(self.clock.utc_now())
    }

    /// Material to use for the next request, reloading first when due.
    ///
    /// # Errors
    /// Returns the reload error when nothing usable is loaded. A failed
    /// reload of stale material also surfaces its error, but the stale
    /// material stays installed for callers that only need
    /// [`TrustMaterialManager::loaded`].
    pub async fn current(&self) -> Result<ActiveMaterial> {
        if let Some(material) = self.fresh(self.clock.utc_now()) {
            return Ok(material);
        }

        let _guard = self.reload_lock.lock().await;
        // Another caller may have finished the reload while we waited.
        let now = self.clock.utc_now();
        if let Some(material) = self.fresh(now) {
            return Ok(material);
        }
        self.reload(now).await
    }

    /// Rebuild the material immediately regardless of its age.
    ///
    /// # Errors
    /// See [`TrustMaterialManager::current`].
    pub async fn force_reload(&self) -> Result<ActiveMaterial> {
        let _guard = self.reload_lock.lock().await;
        self.reload(self.clock.utc_now()).await
    }

    fn fresh(&self, now: DateTime<Utc>) -> Option<ActiveMaterial> {
        self.current.read().as_ref().filter(|material| !material.state.is_reload_due(now)).cloned()
    }

    fn reload_due_at(&self, now: DateTime<Utc>) -> bool {
        self.current.read().as_ref().map_or(true, |material| material.state.is_reload_due(now))
    }

    #[instrument(skip(self))]
    async fn reload(&self, now: DateTime<Utc>) -> Result<ActiveMaterial> {
        match self.build(now).await {
            Ok(material) => {
                info!(
                    alias = %material.alias,
                    service_uri = %material.service_uri,
                    cert_expiration = ?material.state.cert_expiration,
                    invalidation_interval_secs = self.invalidation_interval.as_secs(),
                    "trust_material_reloaded"
                );
                *self.current.write() = Some(material.clone());
                Ok(material)
            }
            Err(err) => {
                warn!(
                    error = %err,
                    previous_loaded = self.current.read().is_some(),
                    "trust_material_reload_failed"
                );
                Err(err)
            }
        }
    }

    async fn build(&self, now: DateTime<Utc>) -> Result<ActiveMaterial> {
        let credentials = self.source.credentials().await?;
        let keystore = credentials.keystore().ok_or_else(|| {
            WardenError::client_request(format!(
                "destination {} uses {} authentication, not a client certificate",
                credentials.name,
                credentials.auth_type()
            ))
        })?;

        let identity = load_identity(keystore)?;
        debug!(alias = %identity.alias(), "client_identity_loaded");

        let mut builder = ReqwestTransport::builder().timeout(self.timeout).identity(identity.to_reqwest()?);
        if let Some(agent) = &self.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        for certificate in &self.root_certificates {
            builder = builder.root_certificate(certificate.clone());
        }
        let transport: Arc<dyn HttpTransport> = Arc::new(builder.build()?);

        let state = TrustState::new(now, identity.not_after(), Some(self.invalidation_interval));
        Ok(ActiveMaterial {
            transport,
            service_uri: credentials.service_uri,
            alias: identity.alias().to_string(),
            state,
        })
    }
}

impl std::fmt::Debug for TrustMaterialManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustMaterialManager")
            .field("invalidation_interval", &self.invalidation_interval)
            .field("loaded", &self.current.read().as_ref().map(|material| material.alias.clone()))
            .finish_non_exhaustive()
    }
}
