//! Destination service lookup

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};
use warden_core::CredentialSource;
use warden_domain::constants::DESTINATION_LOOKUP_PATH;
use warden_domain::{
    DestinationAuth, DestinationCredentials, KeyStoreDetails, KeyStoreType, Result, WardenError,
};

use crate::http::RequestExecutor;

const BASIC_AUTHENTICATION: &str = "BasicAuthentication";
const OAUTH_CLIENT_CREDENTIALS: &str = "OAuth2ClientCredentials";
const CLIENT_CERTIFICATE: &str = "ClientCertificateAuthentication";

#[derive(Debug, Deserialize)]
struct DestinationDocument {
    #[serde(rename = "destinationConfiguration")]
    configuration: DestinationConfiguration,
    #[serde(default)]
    certificates: Vec<CertificateEntry>,
}

#[derive(Deserialize)]
struct DestinationConfiguration {
    #[serde(rename = "URL")]
    url: Option<String>,
    #[serde(rename = "Authentication")]
    authentication: Option<String>,
    #[serde(rename = "User")]
    user: Option<String>,
    #[serde(rename = "Password")]
    password: Option<String>,
    #[serde(rename = "clientId")]
    client_id: Option<String>,
    #[serde(rename = "clientSecret")]
    client_secret: Option<String>,
    #[serde(rename = "tokenServiceURL")]
    token_service_url: Option<String>,
    #[serde(rename = "KeyStorePassword")]
    keystore_password: Option<String>,
}

impl std::fmt::Debug for DestinationConfiguration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DestinationConfiguration")
            .field("url", &self.url)
            .field("authentication", &self.authentication)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct CertificateEntry {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Content")]
    content: String,
}

impl std::fmt::Debug for CertificateEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateEntry").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Resolves a named destination through the destination service.
///
/// Every call performs a fresh lookup; callers decide when a lookup is due.
#[derive(Debug)]
pub struct DestinationCredentialSource {
    name: String,
    executor: Arc<RequestExecutor>,
}

impl DestinationCredentialSource {
    /// `executor` must already authenticate against the destination service
    /// and carry its base URI.
    pub fn new(name: impl Into<String>, executor: Arc<RequestExecutor>) -> Self {
        Self { name: name.into(), executor }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn lookup_path(&self) -> String {
        format!("{}/{}", DESTINATION_LOOKUP_PATH, urlencoding::encode(&self.name))
    }
}

#[async_trait]
impl CredentialSource for DestinationCredentialSource {
    #[instrument(skip(self), fields(destination = %self.name))]
    async fn credentials(&self) -> Result<DestinationCredentials> {
        let response = self.executor.get(&self.lookup_path()).await?;
        let document: DestinationDocument =
            serde_json::from_slice(&response.body).map_err(|err| {
                WardenError::client_request_with(
                    format!("invalid destination document for {}", self.name),
                    err,
                )
            })?;
        debug!(authentication = ?document.configuration.authentication, "destination_resolved");

        parse_document(&self.name, document)
    }
}

fn parse_document(name: &str, document: DestinationDocument) -> Result<DestinationCredentials> {
    let DestinationDocument { configuration, certificates } = document;
    let missing = |field: &str| {
        WardenError::client_request(format!("destination {name} is missing {field}"))
    };

    let service_uri = configuration.url.filter(|url| !url.is_empty()).ok_or_else(|| missing("URL"))?;
    let authentication = configuration.authentication.ok_or_else(|| missing("Authentication"))?;

    let auth = match authentication.as_str() {
        BASIC_AUTHENTICATION => DestinationAuth::Basic {
            user: configuration.user.ok_or_else(|| missing("User"))?,
            password: configuration.password.ok_or_else(|| missing("Password"))?,
        },
        OAUTH_CLIENT_CREDENTIALS => DestinationAuth::OAuth {
            client_id: configuration.client_id.ok_or_else(|| missing("clientId"))?,
            client_secret: configuration.client_secret.ok_or_else(|| missing("clientSecret"))?,
            token_url: configuration.token_service_url.ok_or_else(|| missing("tokenServiceURL"))?,
        },
        CLIENT_CERTIFICATE => {
            let certificate = certificates.into_iter().next().ok_or_else(|| missing("certificates"))?;
            let keystore_type = KeyStoreType::from_file_name(&certificate.name).ok_or_else(|| {
                WardenError::client_request(format!(
                    "destination {name} uses unsupported keystore {}",
                    certificate.name
                ))
            })?;
            DestinationAuth::Certificate {
                keystore: KeyStoreDetails::new(
                    keystore_type,
                    configuration.keystore_password.unwrap_or_default(),
                    certificate.content,
                ),
            }
        }
        other => {
            return Err(WardenError::client_request(format!(
                "destination {name} uses unsupported authentication type {other}"
            )));
        }
    };

    Ok(DestinationCredentials { name: name.to_string(), service_uri, auth })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parse(name: &str, value: serde_json::Value) -> Result<DestinationCredentials> {
        parse_document(name, serde_json::from_value(value).unwrap())
    }

    #[test]
    fn parses_basic_destinations() {
        let credentials = parse(
            "events",
            json!({
                "destinationConfiguration": {
                    "URL": "https://events.example.test",
                    "Authentication": "BasicAuthentication",
                    "User": "svc",
                    "Password": "secret"
                }
            }),
        )
        .unwrap();

        assert_eq!(credentials.service_uri, "https://events.example.test");
        assert_eq!(
            credentials.auth,
            DestinationAuth::Basic { user: "svc".into(), password: "secret".into() }
        );
    }

    #[test]
    fn parses_oauth_destinations() {
        let credentials = parse(
            "events",
            json!({
                "destinationConfiguration": {
                    "URL": "https://events.example.test",
                    "Authentication": "OAuth2ClientCredentials",
                    "clientId": "client",
                    "clientSecret": "secret",
                    "tokenServiceURL": "https://auth.example.test/oauth/token"
                }
            }),
        )
        .unwrap();

        assert!(matches!(
            credentials.auth,
            DestinationAuth::OAuth { ref token_url, .. } if token_url == "https://auth.example.test/oauth/token"
        ));
    }

    #[test]
    fn parses_certificate_destinations() {
        let credentials = parse(
            "events",
            json!({
                "destinationConfiguration": {
                    "URL": "https://events.example.test",
                    "Authentication": "ClientCertificateAuthentication",
                    "KeyStorePassword": "changeit"
                },
                "certificates": [
                    { "Name": "client.p12", "Content": "MIIB", "Type": "CERTIFICATE" }
                ]
            }),
        )
        .unwrap();

        let keystore = credentials.keystore().unwrap();
        assert_eq!(keystore.keystore_type, KeyStoreType::Pkcs12);
        assert_eq!(keystore.password, "changeit");
        assert_eq!(keystore.content, "MIIB");
    }

    #[test]
    fn unknown_authentication_type_names_destination_and_type() {
        let err = parse(
            "legacy",
            json!({
                "destinationConfiguration": {
                    "URL": "https://legacy.example.test",
                    "Authentication": "SAMLAssertion"
                }
            }),
        )
        .unwrap_err();

        assert!(err.is_client_request());
        let message = err.to_string();
        assert!(message.contains("legacy"), "{message}");
        assert!(message.contains("SAMLAssertion"), "{message}");
    }

    #[test]
    fn certificate_mode_without_certificates_fails() {
        let err = parse(
            "events",
            json!({
                "destinationConfiguration": {
                    "URL": "https://events.example.test",
                    "Authentication": "ClientCertificateAuthentication"
                }
            }),
        )
        .unwrap_err();
        assert!(err.to_string().contains("certificates"));
    }

    #[test]
    fn missing_url_fails() {
        let err = parse(
            "events",
            json!({ "destinationConfiguration": { "Authentication": "BasicAuthentication" } }),
        )
        .unwrap_err();
        assert!(err.to_string().contains("URL"));
    }
}
