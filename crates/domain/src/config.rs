//! Configuration structures
//!
//! `WardenConfig` is deserialized from TOML/JSON files or assembled from
//! environment variables by the infra loader. Every section except `auth`
//! has defaults, so a minimal file only needs the auth mode and the target
//! service URI.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BACKOFF_MS, DEFAULT_BUFFER_CAPACITY, DEFAULT_INVALIDATION_INTERVAL,
    DEFAULT_KEEP_ALIVE_SECS, DEFAULT_MAX_RETRIES, DEFAULT_MAX_WORKERS, DEFAULT_MIN_WORKERS,
    DEFAULT_TIMEOUT_SECS, DEFAULT_TRACE_HEADER,
};
use crate::errors::{Result, WardenError};
use crate::types::{AuthType, DestinationAuth, KeyStoreDetails};

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WardenConfig {
    #[serde(default)]
    pub client: ClientConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
    #[serde(default)]
    pub trust: TrustConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl WardenConfig {
    /// Check cross-field constraints that serde cannot express.
    ///
    /// # Errors
    /// Returns `WardenError::Config` describing the first violated rule.
    pub fn validate(&self) -> Result<()> {
        self.auth.validate()?;
        if self.client.service_uri.as_deref().map_or(true, str::is_empty)
            && !matches!(self.auth, AuthConfig::Destination { .. })
        {
            return Err(WardenError::Config(format!(
                "client.service_uri is required for {} authentication",
                self.auth.mode_name()
            )));
        }
        if self.client.timeout_secs == 0 {
            return Err(WardenError::Config("client.timeout_secs must be positive".into()));
        }
        self.dispatcher.validate()?;
        self.trust.invalidation_interval()?;
        Ok(())
    }
}

/// Transport settings for the target service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URI of the target service. Resolved from the destination when
    /// `auth.mode = "destination"`.
    pub service_uri: Option<String>,
    pub timeout_secs: u64,
    pub user_agent: Option<String>,
    /// Response header carrying the peer's request trace id.
    pub trace_header: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            service_uri: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: None,
            trace_header: DEFAULT_TRACE_HEADER.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// How requests to the target service authenticate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AuthConfig {
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
    /// Static client certificate.
    Certificate { keystore: KeyStoreDetails },
    /// Client certificate (or other credentials) resolved from the
    /// destination service on every trust reload.
    Destination {
        service_uri: String,
        name: String,
        /// Credentials used to call the destination service itself.
        credentials: DestinationAuth,
    },
}

impl AuthConfig {
    pub fn mode_name(&self) -> &'static str {
        match self {
            Self::Basic { .. } => "basic",
            Self::OAuth { .. } => "oauth",
            Self::Certificate { .. } => "certificate",
            Self::Destination { .. } => "destination",
        }
    }

    /// Auth type of the target service, when known without a lookup.
    pub fn auth_type(&self) -> Option<AuthType> {
        match self {
            Self::Basic { .. } => Some(AuthType::Basic),
            Self::OAuth { .. } => Some(AuthType::OAuth),
            Self::Certificate { .. } => Some(AuthType::Certificate),
            Self::Destination { .. } => None,
        }
    }

    fn validate(&self) -> Result<()> {
        let missing = |field: &str| {
            WardenError::Config(format!("auth.{field} must not be empty ({} mode)", self.mode_name()))
        };
        match self {
            Self::Basic { user, password } => {
                if user.is_empty() {
                    return Err(missing("user"));
                }
                if password.is_empty() {
                    return Err(missing("password"));
                }
            }
            Self::OAuth { client_id, token_url, .. } => {
                if client_id.is_empty() {
                    return Err(missing("client_id"));
                }
                if token_url.is_empty() {
                    return Err(missing("token_url"));
                }
            }
            Self::Certificate { keystore } => {
                if keystore.content.is_empty() {
                    return Err(missing("keystore.content"));
                }
            }
            Self::Destination { service_uri, name, .. } => {
                if service_uri.is_empty() {
                    return Err(missing("service_uri"));
                }
                if name.is_empty() {
                    return Err(missing("name"));
                }
            }
        }
        Ok(())
    }
}

/// Retry budget applied around request execution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_retries: DEFAULT_MAX_RETRIES, backoff_ms: DEFAULT_BACKOFF_MS }
    }
}

impl RetryConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

/// Worker pool and buffer sizing for the async dispatcher
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    pub min_workers: usize,
    pub max_workers: usize,
    pub keep_alive_secs: u64,
    /// Capacity of both the event buffer and the task queue.
    pub buffer_capacity: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            min_workers: DEFAULT_MIN_WORKERS,
            max_workers: DEFAULT_MAX_WORKERS,
            keep_alive_secs: DEFAULT_KEEP_ALIVE_SECS,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

impl DispatcherConfig {
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    /// # Errors
    /// Returns `WardenError::Config` for zero capacity, a zero keep-alive
    /// or inverted worker bounds.
    pub fn validate(&self) -> Result<()> {
        if self.buffer_capacity == 0 {
            return Err(WardenError::Config("dispatcher.buffer_capacity must be at least 1".into()));
        }
        if self.keep_alive_secs == 0 {
            return Err(WardenError::Config("dispatcher.keep_alive_secs must be at least 1".into()));
        }
        if self.max_workers == 0 {
            return Err(WardenError::Config("dispatcher.max_workers must be at least 1".into()));
        }
        if self.min_workers > self.max_workers {
            return Err(WardenError::Config(format!(
                "dispatcher.min_workers ({}) exceeds max_workers ({})",
                self.min_workers, self.max_workers
            )));
        }
        Ok(())
    }
}

/// Trust material lifecycle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustConfig {
    /// Seconds after which client certificate material is rebuilt. Unset
    /// means five minutes; zero or negative values are rejected.
    pub invalidation_interval_secs: Option<i64>,
}

impl TrustConfig {
    /// # Errors
    /// Returns `WardenError::Config` when the configured value is not
    /// positive.
    pub fn invalidation_interval(&self) -> Result<Duration> {
        match self.invalidation_interval_secs {
            None => Ok(DEFAULT_INVALIDATION_INTERVAL),
            Some(secs) => u64::try_from(secs)
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or_else(|| {
                    WardenError::Config(format!(
                        "trust.invalidation_interval_secs must be positive, got {secs}"
                    ))
                }),
        }
    }
}

/// Tracing subscriber settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KeyStoreType;

    fn basic_config() -> WardenConfig {
        WardenConfig {
            client: ClientConfig {
                service_uri: Some("https://events.example.test".into()),
                ..ClientConfig::default()
            },
            auth: AuthConfig::Basic { user: "svc".into(), password: "secret".into() },
            retry: RetryConfig::default(),
            dispatcher: DispatcherConfig::default(),
            trust: TrustConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn defaults_are_valid() {
        assert!(basic_config().validate().is_ok());
    }

    #[test]
    fn unset_invalidation_interval_uses_default() {
        let trust = TrustConfig::default();
        assert_eq!(trust.invalidation_interval().ok(), Some(Duration::from_secs(300)));
    }

    #[test]
    fn non_positive_invalidation_interval_is_rejected() {
        for secs in [0, -1, -300] {
            let trust = TrustConfig { invalidation_interval_secs: Some(secs) };
            assert!(matches!(trust.invalidation_interval(), Err(WardenError::Config(_))));
        }
    }

    #[test]
    fn zero_buffer_capacity_is_rejected() {
        let mut config = basic_config();
        config.dispatcher.buffer_capacity = 0;
        assert!(matches!(config.validate(), Err(WardenError::Config(_))));
    }

    #[test]
    fn zero_keep_alive_is_rejected() {
        let mut config = basic_config();
        config.dispatcher.keep_alive_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("keep_alive_secs"), "{err}");
    }

    #[test]
    fn inverted_worker_bounds_are_rejected() {
        let mut config = basic_config();
        config.dispatcher.min_workers = 8;
        config.dispatcher.max_workers = 2;
        assert!(matches!(config.validate(), Err(WardenError::Config(_))));
    }

    #[test]
    fn service_uri_required_outside_destination_mode() {
        let mut config = basic_config();
        config.client.service_uri = None;
        assert!(matches!(config.validate(), Err(WardenError::Config(_))));
    }

    #[test]
    fn parses_destination_mode_from_toml() {
        let raw = r#"
            [auth]
            mode = "destination"
            service_uri = "https://destination.example.test"
            name = "billing-mtls"

            [auth.credentials]
            mode = "oauth"
            client_id = "client"
            client_secret = "secret"
            token_url = "https://auth.example.test/oauth/token"

            [dispatcher]
            buffer_capacity = 5
        "#;

        let config: WardenConfig = toml::from_str(raw).expect("valid toml");
        assert!(config.validate().is_ok());
        assert_eq!(config.dispatcher.buffer_capacity, 5);
        assert_eq!(config.retry.max_retries, 3);
        match config.auth {
            AuthConfig::Destination { name, credentials, .. } => {
                assert_eq!(name, "billing-mtls");
                assert_eq!(credentials.auth_type(), AuthType::OAuth);
            }
            other => panic!("unexpected auth mode: {other:?}"),
        }
    }

    #[test]
    fn parses_static_certificate_from_toml() {
        let raw = r#"
            [client]
            service_uri = "https://events.example.test"

            [auth]
            mode = "certificate"

            [auth.keystore]
            type = "pkcs12"
            password = "changeit"
            content = "MIIK"
        "#;

        let config: WardenConfig = toml::from_str(raw).expect("valid toml");
        match &config.auth {
            AuthConfig::Certificate { keystore } => {
                assert_eq!(keystore.keystore_type, KeyStoreType::Pkcs12);
            }
            other => panic!("unexpected auth mode: {other:?}"),
        }
        assert_eq!(config.client.trace_header, "X-Vcap-Request-Id");
    }
}
