//! Client assembly from configuration

use std::sync::Arc;

use tracing::info;
use warden_common::resilience::{RetryExecutor, RetryPolicy};
use warden_common::time::{Clock, SystemClock};
use warden_core::{AsyncDispatcher, CredentialSource, EventClient, HttpTransport};
use warden_domain::{
    AuthConfig, DestinationAuth, DestinationCredentials, Result, WardenConfig, WardenError,
};

use crate::auth::{AuthMode, BasicAuthorization, OAuthAuthorization};
use crate::destination::{DestinationCredentialSource, StaticCredentialSource};
use crate::http::{Authentication, ReqwestTransport, RequestExecutor};
use crate::tls::TrustMaterialManager;

const STATIC_CERTIFICATE_NAME: &str = "static-certificate";

/// Builds executors and dispatchers from a validated [`WardenConfig`].
pub struct ClientFactory {
    config: WardenConfig,
    clock: Arc<dyn Clock>,
}

impl ClientFactory {
    /// # Errors
    /// Returns `WardenError::Config` when `config` fails validation.
    pub fn new(config: WardenConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, clock: Arc::new(SystemClock) })
    }

    /// Clock used for token deadlines and trust reloads.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &WardenConfig {
        &self.config
    }

    /// Authentication mode of the target service.
    ///
    /// Destination mode yields [`AuthMode::CertificateFromDestination`]; the
    /// lookup itself is deferred to the first trust reload.
    ///
    /// # Errors
    /// Returns errors from building the destination service executor.
    pub fn auth_mode(&self) -> Result<AuthMode> {
        if let Some(mode) = AuthMode::from_config(&self.config.auth) {
            return Ok(mode);
        }
        match &self.config.auth {
            AuthConfig::Destination { service_uri, name, credentials } => {
                let lookup = self.destination_executor(service_uri, credentials)?;
                let source = DestinationCredentialSource::new(name.clone(), Arc::new(lookup));
                Ok(AuthMode::CertificateFromDestination(Arc::new(source)))
            }
            other => Err(WardenError::Config(format!(
                "auth mode {} cannot be resolved",
                other.mode_name()
            ))),
        }
    }

    /// Executor for the configured target service.
    ///
    /// # Errors
    /// Returns `WardenError::Config` or `WardenError::InvalidInput` for
    /// unusable settings and `WardenError::ClientRequest` when the HTTP
    /// transport cannot be built.
    pub fn build_executor(&self) -> Result<RequestExecutor> {
        let mode = self.auth_mode()?;
        let authentication = self.authentication(&mode)?;

        let mut executor = RequestExecutor::new(authentication)
            .with_trace_header(self.config.client.trace_header.clone())
            .with_retry(self.retry());
        if let Some(uri) = &self.config.client.service_uri {
            executor = executor.with_service_uri(uri.clone());
        }

        info!(
            mode = self.config.auth.mode_name(),
            auth = %mode.auth_type(),
            service_uri = self.config.client.service_uri.as_deref().unwrap_or("<destination>"),
            "request_executor_built"
        );
        Ok(executor)
    }

    /// Wrap `client` in a dispatcher sized from the configuration.
    ///
    /// # Errors
    /// Returns `WardenError::Config` for invalid sizing or outside a tokio
    /// runtime.
    pub fn build_dispatcher<C: EventClient>(&self, client: Arc<C>) -> Result<AsyncDispatcher<C>> {
        AsyncDispatcher::new(client, &self.config.dispatcher)
    }

    /// Turn `mode` into request authentication.
    ///
    /// # Errors
    /// See [`ClientFactory::build_executor`].
    pub fn authentication(&self, mode: &AuthMode) -> Result<Authentication> {
        let authentication = match mode {
            AuthMode::Basic { user, password } => Authentication::Header {
                transport: self.transport()?,
                provider: Arc::new(BasicAuthorization::new(user, password)?),
            },
            AuthMode::OAuth { client_id, client_secret, token_url } => {
                let transport = self.transport()?;
                let provider = OAuthAuthorization::new(
                    client_id,
                    client_secret,
                    token_url.clone(),
                    Arc::clone(&transport),
                    Arc::clone(&self.clock),
                )?;
                Authentication::Header { transport, provider: Arc::new(provider) }
            }
            AuthMode::Certificate(keystore) => {
                let service_uri = self.config.client.service_uri.clone().ok_or_else(|| {
                    WardenError::Config("client.service_uri is required for certificate mode".into())
                })?;
                let source = StaticCredentialSource::new(DestinationCredentials {
                    name: STATIC_CERTIFICATE_NAME.to_string(),
                    service_uri,
                    auth: DestinationAuth::Certificate { keystore: keystore.clone() },
                });
                Authentication::ClientCertificate(Arc::new(self.trust_manager(Arc::new(source))?))
            }
            AuthMode::CertificateFromDestination(source) => {
                Authentication::ClientCertificate(Arc::new(self.trust_manager(Arc::clone(source))?))
            }
        };
        Ok(authentication)
    }

    fn destination_executor(
        &self,
        service_uri: &str,
        credentials: &DestinationAuth,
    ) -> Result<RequestExecutor> {
        let authentication = self.authentication(&AuthMode::from_credentials(credentials))?;
        Ok(RequestExecutor::new(authentication)
            .with_service_uri(service_uri)
            .with_trace_header(self.config.client.trace_header.clone())
            .with_retry(self.retry()))
    }

    fn trust_manager(&self, source: Arc<dyn CredentialSource>) -> Result<TrustMaterialManager> {
        let mut manager = TrustMaterialManager::new(source, Arc::clone(&self.clock))
            .with_invalidation_interval(self.config.trust.invalidation_interval()?)
            .with_timeout(self.config.client.timeout());
        if let Some(agent) = &self.config.client.user_agent {
            manager = manager.with_user_agent(agent.clone());
        }
        Ok(manager)
    }

    fn transport(&self) -> Result<Arc<dyn HttpTransport>> {
        let mut builder = ReqwestTransport::builder().timeout(self.config.client.timeout());
        if let Some(agent) = &self.config.client.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        Ok(Arc::new(builder.build()?))
    }

    fn retry(&self) -> RetryExecutor {
        RetryExecutor::new(RetryPolicy::from(&self.config.retry))
    }
}

/// Build a [`RequestExecutor`] for `config`.
///
/// # Errors
/// See [`ClientFactory::build_executor`].
pub fn build_executor(config: &WardenConfig) -> Result<RequestExecutor> {
    ClientFactory::new(config.clone())?.build_executor()
}

/// Build an [`AsyncDispatcher`] around `client` sized from `config`.
///
/// # Errors
/// See [`ClientFactory::build_dispatcher`].
pub fn build_dispatcher<C: EventClient>(
    client: Arc<C>,
    config: &WardenConfig,
) -> Result<AsyncDispatcher<C>> {
    ClientFactory::new(config.clone())?.build_dispatcher(client)
}
