//! Integration tests for configuration loader
//!
//! Loads configuration files from disk and feeds them through the factory.

mod support;

use std::io::Write;
use std::time::Duration;

use tempfile::{Builder, NamedTempFile};
use warden_domain::{AuthConfig, AuthType, KeyStoreType, WardenError};
use warden_infra::{config, ClientFactory};
use wiremock::matchers::{header, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn write_config(suffix: &str, contents: &str) -> NamedTempFile {
    let mut file = Builder::new().suffix(suffix).tempfile().expect("Failed to create temp file");
    file.write_all(contents.as_bytes()).expect("Failed to write config");
    file.flush().expect("Failed to flush config");
    file
}

#[test]
fn test_load_destination_config_from_toml_file() {
    let file = write_config(
        ".toml",
        r#"
            [client]
            timeout_secs = 10
            user_agent = "warden-tests/1.0"

            [auth]
            mode = "destination"
            service_uri = "https://destinations.example.test"
            name = "events-mtls"

            [auth.credentials]
            mode = "oauth"
            client_id = "destination-client"
            client_secret = "destination-secret"
            token_url = "https://auth.example.test/oauth/token"

            [trust]
            invalidation_interval_secs = 900

            [logging]
            level = "warden=debug"
            json = true
        "#,
    );

    let config = config::load_from_file(Some(file.path().to_path_buf())).expect("toml config");

    assert_eq!(config.client.timeout(), Duration::from_secs(10));
    assert_eq!(config.trust.invalidation_interval().unwrap(), Duration::from_secs(900));
    assert!(config.logging.json);
    match &config.auth {
        AuthConfig::Destination { name, credentials, .. } => {
            assert_eq!(name, "events-mtls");
            assert_eq!(credentials.auth_type(), AuthType::OAuth);
        }
        other => panic!("expected destination mode, got {}", other.mode_name()),
    }

    let executor = ClientFactory::new(config).unwrap().build_executor().unwrap();
    assert_eq!(executor.auth_type(), AuthType::Certificate);
}

#[test]
fn test_load_certificate_config_from_json_file() {
    let json_content = format!(
        r#"{{
            "client": {{ "service_uri": "https://events.example.test" }},
            "auth": {{
                "mode": "certificate",
                "keystore": {{ "type": "pkcs12", "password": "changeit", "content": "{}" }}
            }},
            "retry": {{ "max_retries": 5, "backoff_ms": 250 }}
        }}"#,
        support::pkcs12_keystore().content
    );
    let file = write_config(".json", &json_content);

    let config = config::load_from_file(Some(file.path().to_path_buf())).expect("json config");

    assert_eq!(config.retry.max_retries, 5);
    assert_eq!(config.client.trace_header, "X-Vcap-Request-Id");
    match &config.auth {
        AuthConfig::Certificate { keystore } => {
            assert_eq!(keystore.keystore_type, KeyStoreType::Pkcs12);
        }
        other => panic!("expected certificate mode, got {}", other.mode_name()),
    }
}

#[test]
fn test_invalid_config_file_is_rejected() {
    let file = write_config(
        ".toml",
        r#"
            [client]
            service_uri = "https://events.example.test"

            [auth]
            mode = "basic"
            user = "svc"
            password = "secret"

            [dispatcher]
            min_workers = 8
            max_workers = 2
        "#,
    );

    let err = config::load_from_file(Some(file.path().to_path_buf())).unwrap_err();
    assert!(matches!(err, WardenError::Config(_)));
}

#[test]
fn test_malformed_config_file_is_rejected() {
    let file = write_config(".toml", "[auth\nmode = ");

    let err = config::load_from_file(Some(file.path().to_path_buf())).unwrap_err();
    assert!(matches!(err, WardenError::Config(_)));
}

#[tokio::test]
async fn test_basic_config_file_drives_requests() {
    let server = MockServer::start().await;
    Mock::given(path("/events"))
        .and(header("authorization", "Basic c3ZjOnNlY3JldA=="))
        .and(header("user-agent", "warden-tests/1.0"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let file = write_config(
        ".toml",
        &format!(
            r#"
                [client]
                service_uri = "{}"
                user_agent = "warden-tests/1.0"

                [auth]
                mode = "basic"
                user = "svc"
                password = "secret"
            "#,
            server.uri()
        ),
    );

    let config = config::load_from_file(Some(file.path().to_path_buf())).unwrap();
    assert!(matches!(
        &config.auth,
        AuthConfig::Basic { user, .. } if user == "svc"
    ));
    let executor = warden_infra::build_executor(&config).unwrap();
    executor.get("/events").await.expect("configured request");
}
