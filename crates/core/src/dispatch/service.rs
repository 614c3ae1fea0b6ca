//! Async dispatcher - backpressure in front of an event client

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;
use warden_common::collections::EventBuffer;
use warden_common::pool::{JobHandle, WorkerPool, WorkerPoolConfig};
use warden_domain::{DispatcherConfig, Result, WardenError};

use super::ports::EventClient;

/// Fire-and-forget front end for an [`EventClient`].
///
/// Events are staged in an [`EventBuffer`] and sent by a bounded
/// [`WorkerPool`] whose queue holds as many jobs as the buffer holds events.
/// Both reject immediately with `WardenError::BufferOverflow` when full.
pub struct AsyncDispatcher<C: EventClient> {
    client: Arc<C>,
    buffer: Arc<EventBuffer<C::Event>>,
    pool: WorkerPool,
}

impl<C: EventClient> AsyncDispatcher<C> {
    /// Create a dispatcher sized from `config`.
    ///
    /// # Errors
    /// Returns `WardenError::Config` for invalid sizing or when called
    /// outside a tokio runtime.
    pub fn new(client: Arc<C>, config: &DispatcherConfig) -> Result<Self> {
        config.validate()?;
        let buffer = Arc::new(EventBuffer::new(config.buffer_capacity)?);
        let pool = WorkerPool::new(WorkerPoolConfig::from(config))?;
        info!(
            buffer_capacity = config.buffer_capacity,
            min_workers = config.min_workers,
            max_workers = config.max_workers,
            "async_dispatcher_started"
        );
        Ok(Self { client, buffer, pool })
    }

    /// Stage `event` and schedule its delivery.
    ///
    /// The event stays in the buffer until a worker starts sending it, so
    /// buffer occupancy reflects work that has not begun yet.
    ///
    /// # Errors
    /// - `WardenError::BufferOverflow` when the buffer or queue is full
    /// - `WardenError::ClientRequest` after shutdown
    pub fn send_event(&self, event: C::Event) -> Result<JobHandle<C::Receipt>> {
        let correlation_id = self.buffer.write(event)?;

        let client = Arc::clone(&self.client);
        let buffer = Arc::clone(&self.buffer);
        let job = async move {
            let event = buffer.read(&correlation_id).ok_or_else(|| {
                WardenError::client_request(format!(
                    "buffered event {correlation_id} is no longer available"
                ))
            })?;
            debug!(%correlation_id, "dispatching_buffered_event");
            client.send_event(event).await
        };

        self.pool.submit(job).map_err(|err| {
            self.discard(&correlation_id);
            warn!(%correlation_id, error = %err, "event_submission_rejected");
            err
        })
    }

    /// Run a read-only operation against the client without buffering.
    ///
    /// # Errors
    /// Same as [`AsyncDispatcher::submit`].
    pub fn query<F, Fut, T>(&self, operation: F) -> Result<JobHandle<T>>
    where
        F: FnOnce(Arc<C>) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        self.submit(operation(Arc::clone(&self.client)))
    }

    /// Submit an arbitrary task to the worker pool.
    ///
    /// # Errors
    /// - `WardenError::BufferOverflow` when the queue is full
    /// - `WardenError::ClientRequest` after shutdown
    pub fn submit<F, T>(&self, task: F) -> Result<JobHandle<T>>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        self.pool.submit(task)
    }

    /// Cancel queued and running work. Events still staged in the buffer are
    /// not delivered.
    pub fn shutdown(&self) {
        self.pool.shutdown();
        info!(undelivered = self.buffer.len(), "async_dispatcher_shutdown");
    }

    /// Cancel all work and wait for the workers to exit.
    pub async fn shutdown_and_wait(&self) {
        self.shutdown();
        self.pool.shutdown_and_wait().await;
    }

    /// Number of events staged but not yet picked up by a worker.
    pub fn pending_events(&self) -> usize {
        self.buffer.len()
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    fn discard(&self, correlation_id: &Uuid) {
        self.buffer.read(correlation_id);
    }
}
