//! Authenticated request execution with status validation

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, instrument, warn};
use url::Url;
use warden_common::resilience::RetryExecutor;
use warden_core::{AuthorizationProvider, HttpTransport};
use warden_domain::constants::DEFAULT_TRACE_HEADER;
use warden_domain::{AuthType, HttpVerb, Result, TransportRequest, TransportResponse, WardenError};

use crate::tls::TrustMaterialManager;

const JSON: &str = "application/json";

/// How requests prove their identity.
#[derive(Clone)]
pub enum Authentication {
    /// A shared transport plus an `Authorization` header from `provider`.
    Header { transport: Arc<dyn HttpTransport>, provider: Arc<dyn AuthorizationProvider> },
    /// A transport bound to the client certificate kept by the manager.
    /// No `Authorization` header is sent.
    ClientCertificate(Arc<TrustMaterialManager>),
}

impl Authentication {
    pub fn auth_type(&self) -> AuthType {
        match self {
            Self::Header { provider, .. } => provider.auth_type(),
            Self::ClientCertificate(_) => AuthType::Certificate,
        }
    }
}

/// Executes verbs against a service and validates the response status.
///
/// Relative targets are resolved against the configured service URI, or
/// against the URI of the loaded destination in client certificate mode.
/// Statuses outside the verb's expected set become
/// `WardenError::Authorization` (401/403) or `WardenError::ServerResponse`,
/// carrying the trace id from the configured response header.
pub struct RequestExecutor {
    authentication: Authentication,
    service_uri: Option<String>,
    trace_header: String,
    retry: RetryExecutor,
}

impl RequestExecutor {
    pub fn new(authentication: Authentication) -> Self {
        Self {
            authentication,
            service_uri: None,
            trace_header: DEFAULT_TRACE_HEADER.to_string(),
            retry: RetryExecutor::default(),
        }
    }

    pub fn with_service_uri(mut self, uri: impl Into<String>) -> Self {
        self.service_uri = Some(uri.into());
        self
    }

    /// Response header read into the `trace_id` of status errors.
    pub fn with_trace_header(mut self, header: impl Into<String>) -> Self {
        self.trace_header = header.into();
        self
    }

    /// Retry executor used by the `*_with_retry` operations.
    pub fn with_retry(mut self, retry: RetryExecutor) -> Self {
        self.retry = retry;
        self
    }

    pub fn auth_type(&self) -> AuthType {
        self.authentication.auth_type()
    }

    pub fn authentication(&self) -> &Authentication {
        &self.authentication
    }

    pub fn service_uri(&self) -> Option<&str> {
        self.service_uri.as_deref()
    }

    pub async fn get(&self, target: &str) -> Result<TransportResponse> {
        self.execute(HttpVerb::Get, target, None).await
    }

    pub async fn post(&self, target: &str, body: impl Into<Vec<u8>>) -> Result<TransportResponse> {
        self.execute(HttpVerb::Post, target, Some(body.into())).await
    }

    pub async fn put(&self, target: &str, body: impl Into<Vec<u8>>) -> Result<TransportResponse> {
        self.execute(HttpVerb::Put, target, Some(body.into())).await
    }

    pub async fn delete(&self, target: &str) -> Result<TransportResponse> {
        self.execute(HttpVerb::Delete, target, None).await
    }

    /// Serialize `payload` as JSON and send it with `verb`.
    ///
    /// # Errors
    /// Returns `WardenError::InvalidInput` when `payload` cannot be
    /// serialized, otherwise see [`RequestExecutor::execute`].
    pub async fn send_json<T: Serialize + ?Sized>(
        &self,
        verb: HttpVerb,
        target: &str,
        payload: &T,
    ) -> Result<TransportResponse> {
        let body = serde_json::to_vec(payload)
            .map_err(|err| WardenError::InvalidInput(format!("payload is not serializable: {err}")))?;
        self.execute(verb, target, Some(body)).await
    }

    /// Run [`RequestExecutor::execute`] under the retry executor.
    ///
    /// # Errors
    /// Returns the error of the final attempt.
    pub async fn execute_with_retry(
        &self,
        verb: HttpVerb,
        target: &str,
        body: Option<Vec<u8>>,
    ) -> Result<TransportResponse> {
        self.retry.execute_with_retry(|| self.execute(verb, target, body.clone())).await
    }

    /// Execute one request.
    ///
    /// # Errors
    /// - `WardenError::ClientRequest` for I/O, credential or trust failures
    /// - `WardenError::Authorization` for unexpected 401/403 responses
    /// - `WardenError::ServerResponse` for any other unexpected status
    /// - `WardenError::InvalidInput` for a relative target without a base URI
    #[instrument(skip(self, body), fields(auth = %self.auth_type()))]
    pub async fn execute(
        &self,
        verb: HttpVerb,
        target: &str,
        body: Option<Vec<u8>>,
    ) -> Result<TransportResponse> {
        let (transport, base, authorization) = match &self.authentication {
            Authentication::Header { transport, provider } => {
                let header = provider.value().await?;
                (Arc::clone(transport), self.service_uri.clone(), header)
            }
            Authentication::ClientCertificate(manager) => {
                let material = manager.current().await?;
                let base = self.service_uri.clone().or(Some(material.service_uri));
                (material.transport, base, None)
            }
        };

        let url = resolve(base.as_deref(), target)?;
        let mut request = TransportRequest::new(verb, url).with_header("Accept", JSON);
        if let Some(header) = authorization {
            request = request.with_header("Authorization", header.as_str());
        }
        if let Some(body) = body {
            request = request.with_header("Content-Type", JSON).with_body(body);
        }

        let response = transport.execute(request).await?;
        self.validate(verb, response)
    }

    fn validate(&self, verb: HttpVerb, response: TransportResponse) -> Result<TransportResponse> {
        if verb.accepts(response.status) {
            debug!(%verb, status = response.status, "request_succeeded");
            return Ok(response);
        }

        let trace_id = response.header(&self.trace_header).map(str::to_string);
        warn!(
            %verb,
            status = response.status,
            reason = %response.reason,
            trace_id = trace_id.as_deref().unwrap_or("-"),
            "unexpected_response_status"
        );
        Err(WardenError::from_status(response.status, response.reason, trace_id))
    }
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("auth_type", &self.auth_type())
            .field("service_uri", &self.service_uri)
            .field("trace_header", &self.trace_header)
            .field("retry", &self.retry.policy())
            .finish()
    }
}

/// Absolute `http`/`https` targets pass through; anything else is appended
/// to `base`.
fn resolve(base: Option<&str>, target: &str) -> Result<String> {
    if Url::parse(target).is_ok_and(|url| matches!(url.scheme(), "http" | "https")) {
        return Ok(target.to_string());
    }

    let base = base.ok_or_else(|| {
        WardenError::InvalidInput(format!("relative target {target} requires a service URI"))
    })?;
    let joined = format!("{}/{}", base.trim_end_matches('/'), target.trim_start_matches('/'));
    Url::parse(&joined)
        .map(|_| joined)
        .map_err(|err| WardenError::InvalidInput(format!("invalid request URL: {err}")))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use warden_common::resilience::RetryPolicy;
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    use super::*;
    use crate::auth::{BasicAuthorization, CertificateAuthorization};
    use crate::http::ReqwestTransport;

    fn executor(server: &MockServer, provider: Arc<dyn AuthorizationProvider>) -> RequestExecutor {
        let transport = Arc::new(ReqwestTransport::builder().timeout(Duration::from_secs(5)).build().unwrap());
        RequestExecutor::new(Authentication::Header { transport, provider }).with_service_uri(server.uri())
    }

    fn basic() -> Arc<dyn AuthorizationProvider> {
        Arc::new(BasicAuthorization::new("svc", "secret").unwrap())
    }

    #[tokio::test]
    async fn attaches_the_authorization_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/events"))
            .and(header("authorization", "Basic c3ZjOnNlY3JldA=="))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .expect(1)
            .mount(&server)
            .await;

        let response = executor(&server, basic()).get("/events").await.unwrap();
        assert_eq!(response.text(), "[]");
    }

    #[tokio::test]
    async fn header_less_providers_send_no_authorization() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(|request: &Request| {
                let status = if request.headers.contains_key("authorization") { 400 } else { 204 };
                ResponseTemplate::new(status)
            })
            .mount(&server)
            .await;

        let response =
            executor(&server, Arc::new(CertificateAuthorization)).delete("events/1").await.unwrap();
        assert_eq!(response.status, 204);
    }

    #[tokio::test]
    async fn post_sends_json_and_expects_created() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/events"))
            .and(header("content-type", JSON))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let err = executor(&server, basic()).post("/events", "{}").await.unwrap_err();
        assert!(err.is_server_response(), "POST only accepts 201, got {err:?}");
        assert_eq!(err.status(), Some(200));
    }

    #[tokio::test]
    async fn forbidden_maps_to_authorization_error_with_trace_id() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(403).insert_header("X-Vcap-Request-Id", "trace-7"))
            .mount(&server)
            .await;

        let err = executor(&server, basic()).put("/events/1", "{}").await.unwrap_err();
        assert!(err.is_authorization());
        assert_eq!(err.status(), Some(403));
        assert_eq!(err.trace_id(), Some("trace-7"));
    }

    #[tokio::test]
    async fn trace_header_is_configurable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).insert_header("X-Correlation-Id", "corr-1"))
            .mount(&server)
            .await;

        let err = executor(&server, basic())
            .with_trace_header("X-Correlation-Id")
            .get("/events")
            .await
            .unwrap_err();
        assert!(err.is_server_response());
        assert_eq!(err.trace_id(), Some("corr-1"));
    }

    #[tokio::test]
    async fn execute_with_retry_stops_at_first_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(200)).mount(&server).await;

        let executor = executor(&server, basic())
            .with_retry(RetryExecutor::new(RetryPolicy::new(3, Duration::from_millis(10))));
        let response = executor.execute_with_retry(HttpVerb::Get, "/events", None).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[test]
    fn resolves_relative_and_absolute_targets() {
        assert_eq!(resolve(Some("https://a.test/api/"), "/events").unwrap(), "https://a.test/api/events");
        assert_eq!(resolve(Some("https://a.test"), "events").unwrap(), "https://a.test/events");
        assert_eq!(resolve(None, "https://b.test/x").unwrap(), "https://b.test/x");
        assert!(matches!(resolve(None, "/events"), Err(WardenError::InvalidInput(_))));
    }

    #[test]
    fn colon_in_relative_target_is_not_a_scheme() {
        assert_eq!(
            resolve(Some("https://a.test/api"), "events:batch").unwrap(),
            "https://a.test/api/events:batch"
        );
        assert_eq!(
            resolve(Some("https://a.test"), "urn:event:42").unwrap(),
            "https://a.test/urn:event:42"
        );
        assert!(matches!(resolve(None, "events:batch"), Err(WardenError::InvalidInput(_))));
    }
}
