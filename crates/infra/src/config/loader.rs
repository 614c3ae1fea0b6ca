//! Configuration loader
//!
//! Loads [`WardenConfig`] from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `WARDEN_AUTH_MODE` is unset or incomplete, falls back to a file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! Every loaded configuration is validated before it is returned.
//!
//! ## Environment Variables
//! - `WARDEN_AUTH_MODE`: `basic`, `oauth`, `certificate` or `destination`
//! - `WARDEN_AUTH_USER` / `WARDEN_AUTH_PASSWORD`: basic mode
//! - `WARDEN_OAUTH_CLIENT_ID` / `WARDEN_OAUTH_CLIENT_SECRET` /
//!   `WARDEN_OAUTH_TOKEN_URL`: oauth mode
//! - `WARDEN_KEYSTORE_TYPE` / `WARDEN_KEYSTORE_PASSWORD` /
//!   `WARDEN_KEYSTORE_CONTENT`: certificate mode
//! - `WARDEN_DESTINATION_SERVICE_URI` / `WARDEN_DESTINATION_NAME`: destination
//!   mode, authenticated with `WARDEN_DESTINATION_CLIENT_ID` /
//!   `WARDEN_DESTINATION_CLIENT_SECRET` / `WARDEN_DESTINATION_TOKEN_URL` when
//!   the token URL is set, otherwise `WARDEN_DESTINATION_USER` /
//!   `WARDEN_DESTINATION_PASSWORD`
//! - `WARDEN_SERVICE_URI`, `WARDEN_TIMEOUT_SECS`, `WARDEN_USER_AGENT`,
//!   `WARDEN_TRACE_HEADER`: client settings
//! - `WARDEN_MAX_RETRIES`, `WARDEN_BACKOFF_MS`: retry budget
//! - `WARDEN_MIN_WORKERS`, `WARDEN_MAX_WORKERS`, `WARDEN_KEEP_ALIVE_SECS`,
//!   `WARDEN_BUFFER_CAPACITY`: dispatcher sizing
//! - `WARDEN_INVALIDATION_INTERVAL_SECS`: trust material lifetime
//! - `WARDEN_LOG_LEVEL`, `WARDEN_LOG_JSON`: logging
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./warden.{toml,json}` then `./config.{toml,json}`
//! 2. The same names in the parent directory
//! 3. The same names next to the executable

use std::path::{Path, PathBuf};
use std::str::FromStr;

use warden_domain::{
    AuthConfig, ClientConfig, DestinationAuth, DispatcherConfig, KeyStoreDetails, KeyStoreType,
    LoggingConfig, Result, RetryConfig, TrustConfig, WardenConfig, WardenError,
};

const CONFIG_FILE_NAMES: [&str; 4] = ["warden.toml", "warden.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `WardenError::Config` if no source yields a valid configuration.
pub fn load() -> Result<WardenConfig> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!(mode = config.auth.mode_name(), "config_loaded_from_env");
            Ok(config)
        }
        Err(err) => {
            tracing::debug!(error = %err, "config_env_incomplete_trying_file");
            load_from_file(None)
        }
    }
}

/// Load configuration from `WARDEN_*` environment variables
///
/// # Errors
/// Returns `WardenError::Config` if required variables are missing, have
/// invalid values, or the result fails validation.
pub fn load_from_env() -> Result<WardenConfig> {
    let client = ClientConfig::default();
    let retry = RetryConfig::default();
    let dispatcher = DispatcherConfig::default();
    let logging = LoggingConfig::default();

    let config = WardenConfig {
        client: ClientConfig {
            service_uri: env_opt("WARDEN_SERVICE_URI"),
            timeout_secs: env_parse("WARDEN_TIMEOUT_SECS", client.timeout_secs)?,
            user_agent: env_opt("WARDEN_USER_AGENT"),
            trace_header: env_opt("WARDEN_TRACE_HEADER").unwrap_or(client.trace_header),
        },
        auth: auth_from_env()?,
        retry: RetryConfig {
            max_retries: env_parse("WARDEN_MAX_RETRIES", retry.max_retries)?,
            backoff_ms: env_parse("WARDEN_BACKOFF_MS", retry.backoff_ms)?,
        },
        dispatcher: DispatcherConfig {
            min_workers: env_parse("WARDEN_MIN_WORKERS", dispatcher.min_workers)?,
            max_workers: env_parse("WARDEN_MAX_WORKERS", dispatcher.max_workers)?,
            keep_alive_secs: env_parse("WARDEN_KEEP_ALIVE_SECS", dispatcher.keep_alive_secs)?,
            buffer_capacity: env_parse("WARDEN_BUFFER_CAPACITY", dispatcher.buffer_capacity)?,
        },
        trust: TrustConfig {
            invalidation_interval_secs: env_opt("WARDEN_INVALIDATION_INTERVAL_SECS")
                .map(|raw| parse_value("WARDEN_INVALIDATION_INTERVAL_SECS", &raw))
                .transpose()?,
        },
        logging: LoggingConfig {
            level: env_opt("WARDEN_LOG_LEVEL").unwrap_or(logging.level),
            json: env_bool("WARDEN_LOG_JSON", logging.json),
        },
    };

    config.validate()?;
    Ok(config)
}

fn auth_from_env() -> Result<AuthConfig> {
    let mode = env_var("WARDEN_AUTH_MODE")?;
    match mode.to_ascii_lowercase().as_str() {
        "basic" => Ok(AuthConfig::Basic {
            user: env_var("WARDEN_AUTH_USER")?,
            password: env_var("WARDEN_AUTH_PASSWORD")?,
        }),
        "oauth" => Ok(AuthConfig::OAuth {
            client_id: env_var("WARDEN_OAUTH_CLIENT_ID")?,
            client_secret: env_var("WARDEN_OAUTH_CLIENT_SECRET")?,
            token_url: env_var("WARDEN_OAUTH_TOKEN_URL")?,
        }),
        "certificate" => Ok(AuthConfig::Certificate {
            keystore: KeyStoreDetails::new(
                keystore_type(&env_var("WARDEN_KEYSTORE_TYPE")?)?,
                env_opt("WARDEN_KEYSTORE_PASSWORD").unwrap_or_default(),
                env_var("WARDEN_KEYSTORE_CONTENT")?,
            ),
        }),
        "destination" => {
            let credentials = match env_opt("WARDEN_DESTINATION_TOKEN_URL") {
                Some(token_url) => DestinationAuth::OAuth {
                    client_id: env_var("WARDEN_DESTINATION_CLIENT_ID")?,
                    client_secret: env_var("WARDEN_DESTINATION_CLIENT_SECRET")?,
                    token_url,
                },
                None => DestinationAuth::Basic {
                    user: env_var("WARDEN_DESTINATION_USER")?,
                    password: env_var("WARDEN_DESTINATION_PASSWORD")?,
                },
            };
            Ok(AuthConfig::Destination {
                service_uri: env_var("WARDEN_DESTINATION_SERVICE_URI")?,
                name: env_var("WARDEN_DESTINATION_NAME")?,
                credentials,
            })
        }
        other => Err(WardenError::Config(format!("Unsupported WARDEN_AUTH_MODE: {other}"))),
    }
}

fn keystore_type(raw: &str) -> Result<KeyStoreType> {
    match raw.to_ascii_lowercase().as_str() {
        "pem" => Ok(KeyStoreType::Pem),
        "pkcs12" | "p12" => Ok(KeyStoreType::Pkcs12),
        "jks" => Ok(KeyStoreType::Jks),
        other => Err(WardenError::Config(format!("Unsupported WARDEN_KEYSTORE_TYPE: {other}"))),
    }
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations. The format is
/// detected by file extension.
///
/// # Errors
/// Returns `WardenError::Config` if the file is missing, cannot be parsed,
/// or fails validation.
pub fn load_from_file(path: Option<PathBuf>) -> Result<WardenConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(WardenError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            WardenError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "config_loading_from_file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| WardenError::Config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration from string content, by file extension.
fn parse_config(contents: &str, path: &Path) -> Result<WardenConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| WardenError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| WardenError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(WardenError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// First existing config file among the standard locations.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut directories = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        directories.push(cwd.join(".."));
        directories.push(cwd);
        directories.reverse();
    }
    if let Some(exe_dir) = std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf)) {
        directories.push(exe_dir);
    }

    directories
        .iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

/// Get required environment variable
fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| WardenError::Config(format!("Missing required environment variable: {key}")))
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_opt(key).map_or(Ok(default), |raw| parse_value(key, &raw))
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e| WardenError::Config(format!("Invalid {key}: {e}")))
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use once_cell::sync::Lazy;
    use tempfile::Builder;

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    const WARDEN_VARS: &[&str] = &[
        "WARDEN_AUTH_MODE",
        "WARDEN_AUTH_USER",
        "WARDEN_AUTH_PASSWORD",
        "WARDEN_SERVICE_URI",
        "WARDEN_MAX_RETRIES",
        "WARDEN_BUFFER_CAPACITY",
        "WARDEN_INVALIDATION_INTERVAL_SECS",
        "WARDEN_LOG_JSON",
        "WARDEN_DESTINATION_SERVICE_URI",
        "WARDEN_DESTINATION_NAME",
        "WARDEN_DESTINATION_USER",
        "WARDEN_DESTINATION_PASSWORD",
        "WARDEN_DESTINATION_TOKEN_URL",
    ];

    fn clear_env() {
        for key in WARDEN_VARS {
            std::env::remove_var(key);
        }
    }

    fn write_config(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_env_bool_parsing() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

        std::env::set_var("WARDEN_TEST_BOOL_ON", "ON");
        std::env::set_var("WARDEN_TEST_BOOL_OFF", "off");
        assert!(env_bool("WARDEN_TEST_BOOL_ON", false));
        assert!(!env_bool("WARDEN_TEST_BOOL_OFF", true));

        std::env::remove_var("WARDEN_TEST_BOOL_MISSING");
        assert!(env_bool("WARDEN_TEST_BOOL_MISSING", true));

        std::env::remove_var("WARDEN_TEST_BOOL_ON");
        std::env::remove_var("WARDEN_TEST_BOOL_OFF");
    }

    #[test]
    fn test_load_from_env_basic_mode() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("WARDEN_AUTH_MODE", "basic");
        std::env::set_var("WARDEN_AUTH_USER", "svc");
        std::env::set_var("WARDEN_AUTH_PASSWORD", "secret");
        std::env::set_var("WARDEN_SERVICE_URI", "https://events.example.test");
        std::env::set_var("WARDEN_MAX_RETRIES", "5");
        std::env::set_var("WARDEN_LOG_JSON", "true");

        let result = load_from_env();
        clear_env();

        let config = result.expect("config from env");
        assert!(matches!(config.auth, AuthConfig::Basic { ref user, .. } if user == "svc"));
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.dispatcher.buffer_capacity, 100);
        assert!(config.logging.json);
    }

    #[test]
    fn test_load_from_env_destination_mode() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("WARDEN_AUTH_MODE", "destination");
        std::env::set_var("WARDEN_DESTINATION_SERVICE_URI", "https://destinations.example.test");
        std::env::set_var("WARDEN_DESTINATION_NAME", "events-mtls");
        std::env::set_var("WARDEN_DESTINATION_USER", "svc");
        std::env::set_var("WARDEN_DESTINATION_PASSWORD", "secret");

        let result = load_from_env();
        clear_env();

        match result.expect("config from env").auth {
            AuthConfig::Destination { name, credentials, .. } => {
                assert_eq!(name, "events-mtls");
                assert!(matches!(credentials, DestinationAuth::Basic { .. }));
            }
            other => panic!("unexpected auth mode: {other:?}"),
        }
    }

    #[test]
    fn test_load_from_env_missing_mode() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        let err = load_from_env().unwrap_err();
        assert!(matches!(err, WardenError::Config(ref msg) if msg.contains("WARDEN_AUTH_MODE")));
    }

    #[test]
    fn test_load_from_env_invalid_number() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("WARDEN_AUTH_MODE", "basic");
        std::env::set_var("WARDEN_AUTH_USER", "svc");
        std::env::set_var("WARDEN_AUTH_PASSWORD", "secret");
        std::env::set_var("WARDEN_SERVICE_URI", "https://events.example.test");
        std::env::set_var("WARDEN_BUFFER_CAPACITY", "lots");

        let result = load_from_env();
        clear_env();

        assert!(matches!(result, Err(WardenError::Config(ref msg)) if msg.contains("WARDEN_BUFFER_CAPACITY")));
    }

    #[test]
    fn test_load_from_env_rejects_non_positive_interval() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("WARDEN_AUTH_MODE", "basic");
        std::env::set_var("WARDEN_AUTH_USER", "svc");
        std::env::set_var("WARDEN_AUTH_PASSWORD", "secret");
        std::env::set_var("WARDEN_SERVICE_URI", "https://events.example.test");
        std::env::set_var("WARDEN_INVALIDATION_INTERVAL_SECS", "0");

        let result = load_from_env();
        clear_env();

        assert!(matches!(result, Err(WardenError::Config(_))));
    }

    #[test]
    fn test_load_from_file_toml() {
        let file = write_config(
            ".toml",
            r#"
                [client]
                service_uri = "https://events.example.test"

                [auth]
                mode = "oauth"
                client_id = "client"
                client_secret = "secret"
                token_url = "https://auth.example.test/oauth/token"

                [trust]
                invalidation_interval_secs = 120
            "#,
        );

        let config = load_from_file(Some(file.path().to_path_buf())).expect("toml config");
        assert_eq!(config.auth.mode_name(), "oauth");
        assert_eq!(config.trust.invalidation_interval().unwrap().as_secs(), 120);
    }

    #[test]
    fn test_load_from_file_json() {
        let file = write_config(
            ".json",
            r#"{
                "client": { "service_uri": "https://events.example.test" },
                "auth": { "mode": "basic", "user": "svc", "password": "secret" },
                "dispatcher": { "min_workers": 2, "max_workers": 6 }
            }"#,
        );

        let config = load_from_file(Some(file.path().to_path_buf())).expect("json config");
        assert_eq!(config.dispatcher.max_workers, 6);
    }

    #[test]
    fn test_load_from_file_validates() {
        let file = write_config(
            ".toml",
            r#"
                [auth]
                mode = "basic"
                user = "svc"
                password = "secret"
            "#,
        );

        let err = load_from_file(Some(file.path().to_path_buf())).unwrap_err();
        assert!(matches!(err, WardenError::Config(ref msg) if msg.contains("service_uri")));
    }

    #[test]
    fn test_load_from_file_not_found() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/warden.toml")));
        assert!(matches!(result, Err(WardenError::Config(_))));
    }

    #[test]
    fn test_parse_config_unsupported_format() {
        let result = parse_config("", Path::new("warden.yaml"));
        assert!(matches!(result, Err(WardenError::Config(ref msg)) if msg.contains("yaml")));
    }
}
