//! Conversions from external infrastructure errors into domain errors.

use reqwest::Error as HttpError;
use warden_domain::WardenError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub WardenError);

impl From<InfraError> for WardenError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<WardenError> for InfraError {
    fn from(value: WardenError) -> Self {
        InfraError(value)
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → WardenError */
/* -------------------------------------------------------------------------- */

fn describe(err: &HttpError) -> &'static str {
    if err.is_timeout() {
        return "HTTP request timed out";
    }
    if err.is_connect() {
        return "HTTP connection failure";
    }
    if err.is_builder() {
        return "invalid HTTP request";
    }
    if err.is_body() || err.is_decode() {
        return "failed to read HTTP response body";
    }
    "HTTP request failed"
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        let message = match value.url() {
            Some(url) => format!("{} ({url})", describe(&value)),
            None => describe(&value).to_string(),
        };
        InfraError(WardenError::client_request_with(message, value))
    }
}

/// Shorthand used at call sites that return `warden_domain::Result`.
pub(crate) fn http_error(err: HttpError) -> WardenError {
    InfraError::from(err).into()
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[tokio::test]
    async fn connection_failure_maps_to_client_request() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener); // release the port so that requests fail with ECONNREFUSED

        let err = reqwest::Client::new()
            .get(format!("http://{addr}/unreachable"))
            .send()
            .await
            .expect_err("nothing listens on the released port");

        let mapped = http_error(err);
        assert!(mapped.is_client_request());
        assert!(mapped.to_string().contains(&addr.to_string()));
        assert!(mapped.source().is_some(), "the reqwest error is kept as the cause");
    }

    #[test]
    fn builder_failure_maps_to_client_request() {
        let err = reqwest::Client::new()
            .get("not a url")
            .build()
            .expect_err("invalid URL");

        let mapped: WardenError = InfraError::from(err).into();
        assert!(mapped.is_client_request());
    }
}
