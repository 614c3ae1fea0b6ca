//! Bounded worker pool with explicit rejection
//!
//! Jobs are queued on a bounded `tokio::sync::mpsc` channel and drained by
//! between `min_workers` and `max_workers` tokio tasks. Submission uses
//! `try_send`, so a saturated queue is reported immediately as
//! [`WardenError::BufferOverflow`] instead of growing without limit.
//!
//! Workers above `min_workers` retire after sitting idle for `keep_alive`.
//! [`WorkerPool::shutdown`] cancels queued and running jobs; their
//! [`JobHandle`]s resolve to an interrupted `ClientRequest` error.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::runtime::Handle;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};
use warden_domain::{DispatcherConfig, Result, WardenError};

type Job = BoxFuture<'static, ()>;

/// Configuration for worker pool sizing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerPoolConfig {
    /// Workers kept alive even when idle
    pub min_workers: usize,
    /// Upper bound on concurrently running jobs
    pub max_workers: usize,
    /// Idle time after which surplus workers retire
    pub keep_alive: Duration,
    /// Number of jobs that may wait for a worker
    pub queue_capacity: usize,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self::from(&DispatcherConfig::default())
    }
}

impl From<&DispatcherConfig> for WorkerPoolConfig {
    fn from(config: &DispatcherConfig) -> Self {
        Self {
            min_workers: config.min_workers,
            max_workers: config.max_workers,
            keep_alive: config.keep_alive(),
            queue_capacity: config.buffer_capacity,
        }
    }
}

impl WorkerPoolConfig {
    /// # Errors
    /// Returns `WardenError::Config` for a zero queue, zero workers,
    /// inverted bounds or a zero keep-alive.
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(WardenError::Config("queue_capacity must be at least 1".into()));
        }
        if self.keep_alive.is_zero() {
            return Err(WardenError::Config("keep_alive must be greater than zero".into()));
        }
        if self.max_workers == 0 {
            return Err(WardenError::Config("max_workers must be at least 1".into()));
        }
        if self.min_workers > self.max_workers {
            return Err(WardenError::Config(format!(
                "min_workers ({}) exceeds max_workers ({})",
                self.min_workers, self.max_workers
            )));
        }
        Ok(())
    }
}

/// Point-in-time pool counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerPoolMetrics {
    pub workers: usize,
    pub idle_workers: usize,
    pub queued_jobs: usize,
    pub submitted_jobs: u64,
    pub rejected_jobs: u64,
}

struct Inner {
    config: WorkerPoolConfig,
    sender: mpsc::Sender<Job>,
    receiver: Mutex<mpsc::Receiver<Job>>,
    workers: AtomicUsize,
    idle: AtomicUsize,
    submitted: AtomicU64,
    rejected: AtomicU64,
    shutdown: CancellationToken,
    tracker: TaskTracker,
    runtime: Handle,
}

impl Inner {
    fn queued(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    /// Reserve a worker slot if the pool is below `limit`.
    fn try_reserve_worker(&self, limit: usize) -> bool {
        self.workers
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| {
                (count < limit).then_some(count + 1)
            })
            .is_ok()
    }

    /// Release a worker slot unless that would drop below `min_workers`.
    fn try_retire_worker(&self) -> bool {
        let min = self.config.min_workers;
        self.workers
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| {
                (count > min).then(|| count - 1)
            })
            .is_ok()
    }

    fn drain_queue(receiver: &mut mpsc::Receiver<Job>) -> usize {
        let mut dropped = 0;
        while receiver.try_recv().is_ok() {
            dropped += 1;
        }
        dropped
    }
}

/// Bounded pool of tokio workers.
///
/// Clones share the same queue and workers. Workers keep running until
/// [`WorkerPool::shutdown`] is called.
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<Inner>,
}

impl WorkerPool {
    /// Create a pool and start `min_workers` workers on the current runtime.
    ///
    /// # Errors
    /// Returns `WardenError::Config` for invalid sizing or when called
    /// outside a tokio runtime.
    pub fn new(config: WorkerPoolConfig) -> Result<Self> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|err| {
            WardenError::Config(format!("worker pool requires a tokio runtime: {err}"))
        })?;

        let (sender, receiver) = mpsc::channel(config.queue_capacity);
        let pool = Self {
            inner: Arc::new(Inner {
                sender,
                receiver: Mutex::new(receiver),
                workers: AtomicUsize::new(0),
                idle: AtomicUsize::new(0),
                submitted: AtomicU64::new(0),
                rejected: AtomicU64::new(0),
                shutdown: CancellationToken::new(),
                tracker: TaskTracker::new(),
                runtime,
                config,
            }),
        };

        for _ in 0..pool.inner.config.min_workers {
            if pool.inner.try_reserve_worker(pool.inner.config.min_workers) {
                pool.spawn_worker();
            }
        }
        debug!(
            min_workers = pool.inner.config.min_workers,
            max_workers = pool.inner.config.max_workers,
            queue_capacity = pool.inner.config.queue_capacity,
            "worker_pool_started"
        );
        Ok(pool)
    }

    /// Queue `job` without waiting for capacity.
    ///
    /// # Errors
    /// - `WardenError::BufferOverflow` when the queue is full
    /// - `WardenError::ClientRequest` after shutdown
    pub fn submit<F, T>(&self, job: F) -> Result<JobHandle<T>>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        if self.inner.shutdown.is_cancelled() {
            return Err(WardenError::client_request("worker pool is shut down"));
        }

        let (tx, rx) = oneshot::channel();
        let cancel = self.inner.shutdown.clone();
        let wrapped: Job = Box::pin(async move {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {}
                result = job => {
                    let _ = tx.send(result);
                }
            }
        });

        match self.inner.sender.try_send(wrapped) {
            Ok(()) => {
                self.inner.submitted.fetch_add(1, Ordering::Relaxed);
                self.ensure_worker();
                Ok(JobHandle { receiver: rx })
            }
            Err(TrySendError::Full(_)) => {
                self.inner.rejected.fetch_add(1, Ordering::Relaxed);
                warn!(capacity = self.inner.config.queue_capacity, "worker_pool_queue_full");
                Err(WardenError::BufferOverflow { capacity: self.inner.config.queue_capacity })
            }
            Err(TrySendError::Closed(_)) => {
                Err(WardenError::client_request("worker pool is shut down"))
            }
        }
    }

    /// Cancel queued and running jobs. Returns immediately; use
    /// [`WorkerPool::shutdown_and_wait`] to wait for workers to exit.
    pub fn shutdown(&self) {
        if self.inner.shutdown.is_cancelled() {
            return;
        }
        self.inner.shutdown.cancel();
        self.inner.tracker.close();
        if let Ok(mut receiver) = self.inner.receiver.try_lock() {
            let dropped = Inner::drain_queue(&mut receiver);
            if dropped > 0 {
                debug!(dropped, "worker_pool_queue_drained");
            }
        }
        info!(
            workers = self.inner.workers.load(Ordering::SeqCst),
            "worker_pool_shutdown_requested"
        );
    }

    /// Cancel all work and wait until every worker has exited.
    pub async fn shutdown_and_wait(&self) {
        self.shutdown();
        self.inner.tracker.wait().await;
        let mut receiver = self.inner.receiver.lock().await;
        Inner::drain_queue(&mut receiver);
    }

    pub fn is_shutdown(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    pub fn metrics(&self) -> WorkerPoolMetrics {
        WorkerPoolMetrics {
            workers: self.inner.workers.load(Ordering::SeqCst),
            idle_workers: self.inner.idle.load(Ordering::SeqCst),
            queued_jobs: self.inner.queued(),
            submitted_jobs: self.inner.submitted.load(Ordering::Relaxed),
            rejected_jobs: self.inner.rejected.load(Ordering::Relaxed),
        }
    }

    pub fn config(&self) -> &WorkerPoolConfig {
        &self.inner.config
    }

    fn ensure_worker(&self) {
        let no_idle_worker = self.inner.idle.load(Ordering::SeqCst) == 0;
        let no_worker = self.inner.workers.load(Ordering::SeqCst) == 0;
        if (no_idle_worker || no_worker) && self.inner.try_reserve_worker(self.inner.config.max_workers)
        {
            self.spawn_worker();
        }
    }

    /// Spawn a worker for a slot already reserved in `workers`.
    fn spawn_worker(&self) {
        let inner = Arc::clone(&self.inner);
        let runtime = self.inner.runtime.clone();
        self.inner.tracker.spawn_on(run_worker(inner), &runtime);
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("config", &self.inner.config)
            .field("metrics", &self.metrics())
            .finish()
    }
}

/// Releases the worker slot even if a job panics.
struct WorkerSlot {
    inner: Arc<Inner>,
    retired: bool,
}

impl WorkerSlot {
    fn try_retire(&mut self) -> bool {
        self.retired = self.inner.try_retire_worker();
        self.retired
    }
}

impl Drop for WorkerSlot {
    fn drop(&mut self) {
        if !self.retired {
            self.inner.workers.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

enum Next {
    Job(Job),
    IdleTimeout,
    Stop,
}

/// Next queued job, `Some(None)` once the queue is closed, or `None` when
/// `idle_limit` passes first.
async fn receive(inner: &Inner, idle_limit: Option<Duration>) -> Option<Option<Job>> {
    let recv = async {
        let mut receiver = inner.receiver.lock().await;
        receiver.recv().await
    };
    match idle_limit {
        Some(limit) => tokio::time::timeout(limit, recv).await.ok(),
        None => Some(recv.await),
    }
}

async fn run_worker(inner: Arc<Inner>) {
    let keep_alive = inner.config.keep_alive;
    let mut slot = WorkerSlot { inner: Arc::clone(&inner), retired: false };

    loop {
        inner.idle.fetch_add(1, Ordering::SeqCst);
        // Core workers never retire, so they wait without a deadline.
        let surplus = inner.workers.load(Ordering::SeqCst) > inner.config.min_workers;
        let next = tokio::select! {
            biased;
            () = inner.shutdown.cancelled() => Next::Stop,
            received = receive(&inner, surplus.then_some(keep_alive)) => match received {
                Some(Some(job)) => Next::Job(job),
                Some(None) => Next::Stop,
                None => Next::IdleTimeout,
            },
        };
        inner.idle.fetch_sub(1, Ordering::SeqCst);

        match next {
            Next::Job(job) => job.await,
            Next::IdleTimeout => {
                // A job queued while this worker was timing out must not be
                // stranded without a worker.
                if inner.queued() > 0 || !slot.try_retire() {
                    continue;
                }
                debug!("worker_retired_after_idle");
                return;
            }
            Next::Stop => break,
        }
    }

    if inner.shutdown.is_cancelled() {
        if let Ok(mut receiver) = inner.receiver.try_lock() {
            Inner::drain_queue(&mut receiver);
        }
    }
    drop(slot);
}

/// Completion handle for a submitted job.
///
/// Resolves to the job's result, or to an interrupted `ClientRequest` error
/// when the pool shut down before the job completed.
#[must_use = "dropping a JobHandle discards the job's result"]
pub struct JobHandle<T> {
    receiver: oneshot::Receiver<Result<T>>,
}

impl<T> Future for JobHandle<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver).poll(cx).map(|received| {
            received.unwrap_or_else(|_| {
                Err(WardenError::interrupted("job cancelled by worker pool shutdown"))
            })
        })
    }
}

impl<T> fmt::Debug for JobHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobHandle").finish_non_exhaustive()
    }
}
