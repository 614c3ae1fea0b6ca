#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use warden_common::resilience::{RetryExecutor, RetryPolicy};
use warden_core::AuthorizationProvider;
use warden_domain::{KeyStoreDetails, KeyStoreType};
use warden_infra::{Authentication, ReqwestTransport, RequestExecutor};
use wiremock::MockServer;

pub const CERT: &str = include_str!("fixtures/client.crt");
pub const KEY: &str = include_str!("fixtures/client.key");
pub const ENCRYPTED_KEY: &str = include_str!("fixtures/client-encrypted.key");
pub const P12: &[u8] = include_bytes!("fixtures/client.p12");
pub const KEYSTORE_PASSWORD: &str = "changeit";

/// Base64 PEM bundle of the fixture key and certificate.
pub fn pem_keystore() -> KeyStoreDetails {
    KeyStoreDetails::new(KeyStoreType::Pem, "", STANDARD.encode(format!("{KEY}{CERT}")))
}

pub fn pkcs12_keystore() -> KeyStoreDetails {
    KeyStoreDetails::new(KeyStoreType::Pkcs12, KEYSTORE_PASSWORD, STANDARD.encode(P12))
}

/// Destination document in the shape served by the destination service.
pub fn certificate_destination(target_uri: &str) -> Value {
    json!({
        "owner": { "SubaccountId": "sub", "InstanceId": null },
        "destinationConfiguration": {
            "Name": "events-mtls",
            "Type": "HTTP",
            "URL": target_uri,
            "Authentication": "ClientCertificateAuthentication",
            "ProxyType": "Internet",
            "KeyStorePassword": KEYSTORE_PASSWORD,
            "KeyStoreLocation": "client.p12"
        },
        "certificates": [
            { "Name": "client.p12", "Type": "CERTIFICATE", "Content": STANDARD.encode(P12) }
        ]
    })
}

pub fn fast_retry(max_retries: u32) -> RetryExecutor {
    RetryExecutor::new(RetryPolicy::new(max_retries, Duration::from_millis(10)))
}

/// Header-authenticated executor pointed at `server`.
pub fn header_executor(
    server: &MockServer,
    provider: Arc<dyn AuthorizationProvider>,
) -> RequestExecutor {
    let transport = Arc::new(
        ReqwestTransport::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .expect("transport should build"),
    );
    RequestExecutor::new(Authentication::Header { transport, provider })
        .with_service_uri(server.uri())
        .with_retry(fast_retry(0))
}

/// Number of requests `server` received on `path`.
pub async fn hits(server: &MockServer, path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == path)
        .count()
}
