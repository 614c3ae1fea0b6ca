//! Port interface for HTTP execution

use async_trait::async_trait;
use warden_domain::{Result, TransportRequest, TransportResponse};

/// Executes a request and returns the fully drained response.
///
/// Implementations report I/O failures as `WardenError::ClientRequest` and
/// return every received response, whatever its status, as `Ok`. Status
/// validation is left to the caller.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse>;
}
