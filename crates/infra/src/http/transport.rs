use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Certificate, Client as ReqwestClient, Identity, Method};
use tracing::debug;
use warden_core::HttpTransport;
use warden_domain::constants::DEFAULT_TIMEOUT_SECS;
use warden_domain::{HttpVerb, Result, TransportRequest, TransportResponse, WardenError};

use crate::errors::conversions::http_error;

/// reqwest-backed [`HttpTransport`], optionally bound to a client identity.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: ReqwestClient,
}

impl ReqwestTransport {
    /// Start building a new transport.
    pub fn builder() -> TransportBuilder {
        TransportBuilder::default()
    }

    /// Convenience constructor with default configuration.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    fn method(verb: HttpVerb) -> Method {
        match verb {
            HttpVerb::Get => Method::GET,
            HttpVerb::Post => Method::POST,
            HttpVerb::Put => Method::PUT,
            HttpVerb::Delete => Method::DELETE,
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse> {
        let TransportRequest { verb, url, headers, body } = request;

        let mut builder = self.client.request(Self::method(verb), url.as_str());
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }

        debug!(%verb, %url, "sending_http_request");
        let response = builder.send().await.map_err(|err| {
            debug!(%verb, %url, error = %err, "http_request_failed");
            http_error(err)
        })?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value.to_str().ok().map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        // Reading the body to the end releases the connection on every path.
        let body = response.bytes().await.map_err(http_error)?;
        debug!(%verb, %url, status = status.as_u16(), body_len = body.len(), "received_http_response");

        Ok(TransportResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown Status").to_string(),
            headers,
            body: body.to_vec(),
        })
    }
}

/// Builder for [`ReqwestTransport`].
#[derive(Debug)]
pub struct TransportBuilder {
    timeout: Duration,
    user_agent: Option<String>,
    identity: Option<Identity>,
    root_certificates: Vec<Certificate>,
}

impl Default for TransportBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: None,
            identity: None,
            root_certificates: Vec::new(),
        }
    }
}

impl TransportBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Present `identity` as the TLS client certificate.
    pub fn identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Trust `certificate` for server authentication in addition to the
    /// bundled web roots.
    pub fn root_certificate(mut self, certificate: Certificate) -> Self {
        self.root_certificates.push(certificate);
        self
    }

    pub fn build(self) -> Result<ReqwestTransport> {
        let mut builder =
            ReqwestClient::builder().use_rustls_tls().timeout(self.timeout).no_proxy();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        if let Some(identity) = self.identity {
            builder = builder.identity(identity);
        }
        for certificate in self.root_certificates {
            builder = builder.add_root_certificate(certificate);
        }

        let client = builder.build().map_err(|err| {
            WardenError::client_request_with("failed to build HTTP transport", err)
        })?;

        Ok(ReqwestTransport { client })
    }
}
