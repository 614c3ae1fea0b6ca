//! HTTP event client

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::instrument;
use warden_core::EventClient;
use warden_domain::{HttpVerb, Result, WardenError};

use crate::http::RequestExecutor;

/// Acknowledgement returned for an accepted event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventReceipt {
    pub status: u16,
    /// `Location` header, when the service returns one.
    pub location: Option<String>,
    pub body: Vec<u8>,
}

/// Posts events as JSON to a collection endpoint and pages through it.
pub struct HttpEventClient<E> {
    executor: Arc<RequestExecutor>,
    path: String,
    _event: PhantomData<fn(E)>,
}

impl<E> HttpEventClient<E> {
    /// `path` is resolved against the executor's service URI.
    pub fn new(executor: Arc<RequestExecutor>, path: impl Into<String>) -> Self {
        Self { executor, path: path.into(), _event: PhantomData }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn executor(&self) -> &Arc<RequestExecutor> {
        &self.executor
    }

    /// Fetch one page of the collection.
    ///
    /// # Errors
    /// Returns the executor's errors, or `WardenError::ClientRequest` when
    /// the body does not deserialize into `T`.
    #[instrument(skip(self), fields(path = %self.path))]
    pub async fn fetch_page<T: DeserializeOwned>(&self, page: u32, size: u32) -> Result<Vec<T>> {
        let target = format!("{}?page={page}&size={size}", self.path);
        let response = self.executor.execute_with_retry(HttpVerb::Get, &target, None).await?;
        serde_json::from_slice(&response.body).map_err(|err| {
            WardenError::client_request_with(format!("invalid page {page} from {}", self.path), err)
        })
    }
}

#[async_trait]
impl<E> EventClient for HttpEventClient<E>
where
    E: Serialize + Send + 'static,
{
    type Event = E;
    type Receipt = EventReceipt;

    async fn send_event(&self, event: E) -> Result<EventReceipt> {
        let body = serde_json::to_vec(&event)
            .map_err(|err| WardenError::InvalidInput(format!("event is not serializable: {err}")))?;
        let response =
            self.executor.execute_with_retry(HttpVerb::Post, &self.path, Some(body)).await?;

        Ok(EventReceipt {
            status: response.status,
            location: response.header("location").map(str::to_string),
            body: response.body,
        })
    }
}

impl<E> std::fmt::Debug for HttpEventClient<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpEventClient").field("path", &self.path).finish_non_exhaustive()
    }
}
