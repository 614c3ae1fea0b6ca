//! OAuth2 client-credentials provider with a cached bearer token

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use warden_common::time::Clock;
use warden_core::{AuthorizationProvider, HttpTransport};
use warden_domain::constants::TOKEN_EXPIRY_SKEW_SECS;
use warden_domain::{
    AuthType, AuthorizationHeader, HttpVerb, Result, TransportRequest, WardenError,
};

use super::basic::BasicAuthorization;

const GRANT_BODY: &str = "grant_type=client_credentials";
/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    header: AuthorizationHeader,
    valid_until: DateTime<Utc>,
}

/// Fetches bearer tokens with the client-credentials grant and reuses them
/// until shortly before they expire.
///
/// The client id and secret authenticate the token request itself as `Basic`
/// credentials. Concurrent callers share a single in-flight refresh.
pub struct OAuthAuthorization {
    token_url: String,
    client: BasicAuthorization,
    transport: Arc<dyn HttpTransport>,
    clock: Arc<dyn Clock>,
    cache: Mutex<Option<CachedToken>>,
}

impl OAuthAuthorization {
    /// # Errors
    /// Returns `WardenError::InvalidInput` when the client id, secret or
    /// token URL is empty.
    pub fn new(
        client_id: &str,
        client_secret: &str,
        token_url: impl Into<String>,
        transport: Arc<dyn HttpTransport>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let token_url = token_url.into();
        if token_url.is_empty() {
            return Err(WardenError::InvalidInput("oauth token url must not be empty".into()));
        }
        let client = BasicAuthorization::new(client_id, client_secret)?;

        Ok(Self { token_url, client, transport, clock, cache: Mutex::new(None) })
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    /// Drop the cached token so the next call fetches a new one.
    pub async fn invalidate(&self) {
        self.cache.lock().await.take();
    }

    #[instrument(skip(self), fields(token_url = %self.token_url))]
    async fn fetch_token(&self) -> Result<CachedToken> {
        let request = TransportRequest::new(HttpVerb::Post, self.token_url.as_str())
            .with_header("Authorization", self.client.header().as_str())
            .with_header("Content-Type", "application/x-www-form-urlencoded")
            .with_header("Accept", "application/json")
            .with_body(GRANT_BODY);

        let response = self.transport.execute(request).await.map_err(|err| {
            warn!(error = %err, "oauth_token_request_failed");
            WardenError::client_request_with(
                format!("token request to {} failed", self.token_url),
                err,
            )
        })?;

        if !(200..300).contains(&response.status) {
            warn!(status = response.status, "oauth_token_request_rejected");
            return Err(WardenError::from_status(response.status, response.reason, None));
        }

        let token: TokenResponse = serde_json::from_slice(&response.body).map_err(|err| {
            WardenError::client_request_with(
                format!("invalid token response from {}", self.token_url),
                err,
            )
        })?;

        let expires_in = token.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        let issued_at = self.clock.utc_now();
        let valid_until = expires_in
            .checked_sub(TOKEN_EXPIRY_SKEW_SECS)
            .and_then(ChronoDuration::try_seconds)
            .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
            .ok_or_else(|| {
                warn!(expires_in, "oauth_token_expiry_out_of_range");
                WardenError::client_request(format!(
                    "invalid expires_in {expires_in} from {}",
                    self.token_url
                ))
            })?;
        info!(expires_in, valid_until = %valid_until, "oauth_token_refreshed");

        Ok(CachedToken { header: AuthorizationHeader::bearer(&token.access_token), valid_until })
    }
}

#[async_trait]
impl AuthorizationProvider for OAuthAuthorization {
    async fn value(&self) -> Result<Option<AuthorizationHeader>> {
        // Held across the fetch so that waiting callers reuse the new token.
        let mut cache = self.cache.lock().await;

        if let Some(token) = cache.as_ref() {
            if self.clock.utc_now() < token.valid_until {
                return Ok(Some(token.header.clone()));
            }
            debug!(valid_until = %token.valid_until, "oauth_token_expired");
        }

        let token = self.fetch_token().await?;
        let header = token.header.clone();
        *cache = Some(token);
        Ok(Some(header))
    }

    fn auth_type(&self) -> AuthType {
        AuthType::OAuth
    }
}

impl std::fmt::Debug for OAuthAuthorization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthAuthorization").field("token_url", &self.token_url).finish()
    }
}
