//! Tracing subscriber setup

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};
use warden_domain::{LoggingConfig, Result, WardenError};

/// Filter from `RUST_LOG`, falling back to the configured level.
///
/// # Errors
/// Returns `WardenError::Config` when the configured level is not a valid
/// filter directive.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level)
        .map_err(|err| WardenError::Config(format!("invalid log level {:?}: {err}", config.level)))
}

/// Install the global subscriber.
///
/// # Errors
/// Returns `WardenError::Config` for an invalid level or when a global
/// subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = env_filter(config)?;
    let registry = Registry::default().with(filter);

    let installed = if config.json {
        registry.with(fmt::layer().json().with_current_span(true)).try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    };

    installed.map_err(|err| WardenError::Config(format!("tracing already initialized: {err}")))?;
    tracing::debug!(level = %config.level, json = config.json, "tracing_initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_level_is_a_config_error() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = LoggingConfig { level: "warden=verbose".into(), json: false };
        assert!(matches!(env_filter(&config), Err(WardenError::Config(_))));
    }

    #[test]
    fn second_initialization_fails() {
        let config = LoggingConfig::default();
        let _ = init_tracing(&config);
        assert!(init_tracing(&config).is_err());
    }
}
