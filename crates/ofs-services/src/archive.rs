//! Background archive copies.
//!
//! Jobs go through a bounded channel to a dispatcher that runs at most
//! `max_concurrent` uploads at a time. Submitting never waits: a full queue rejects the
//! job and the caller carries on. Results are only visible through logs, the counters in
//! [`ArchiveStatsSnapshot`] and the outcome broadcast.

use bytes::Bytes;
use ofs_core::ArchiveConfig;
use ofs_storage::Storage;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::retry::RetryPolicy;

const OUTCOME_CHANNEL_CAPACITY: usize = 256;
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
pub struct ArchiveJob {
    pub job_id: Uuid,
    pub storage_key: String,
    pub data: Bytes,
    pub content_type: String,
}

impl ArchiveJob {
    pub fn new(storage_key: String, data: Bytes, content_type: impl Into<String>) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            storage_key,
            data,
            content_type: content_type.into(),
        }
    }
}

/// Final result of one archive job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveOutcome {
    Stored {
        job_id: Uuid,
        storage_key: String,
        url: String,
        attempts: u32,
    },
    Failed {
        job_id: Uuid,
        storage_key: String,
        error: String,
        attempts: u32,
    },
}

impl ArchiveOutcome {
    pub fn job_id(&self) -> Uuid {
        match self {
            ArchiveOutcome::Stored { job_id, .. } | ArchiveOutcome::Failed { job_id, .. } => *job_id,
        }
    }

    pub fn storage_key(&self) -> &str {
        match self {
            ArchiveOutcome::Stored { storage_key, .. }
            | ArchiveOutcome::Failed { storage_key, .. } => storage_key,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArchiveSubmitError {
    #[error("Archive queue is full")]
    Full,
    #[error("Archive queue is closed")]
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveQueueConfig {
    pub queue_size: usize,
    pub max_concurrent: usize,
    pub retry: RetryPolicy,
}

impl From<&ArchiveConfig> for ArchiveQueueConfig {
    fn from(config: &ArchiveConfig) -> Self {
        Self {
            queue_size: config.queue_size,
            max_concurrent: config.max_concurrent,
            retry: RetryPolicy::archive(config.max_retries),
        }
    }
}

#[derive(Debug, Default)]
struct ArchiveStats {
    submitted: AtomicU64,
    rejected: AtomicU64,
    stored: AtomicU64,
    failed: AtomicU64,
    in_flight: AtomicU64,
}

/// Point-in-time view of the archive counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ArchiveStatsSnapshot {
    /// Jobs accepted by the queue.
    pub submitted: u64,
    /// Jobs refused because the queue was full or closed.
    pub rejected: u64,
    pub stored: u64,
    pub failed: u64,
    /// Accepted jobs that have not finished yet, queued or running.
    pub in_flight: u64,
}

impl ArchiveStats {
    fn snapshot(&self) -> ArchiveStatsSnapshot {
        ArchiveStatsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            stored: self.stored.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Acquire),
        }
    }
}

/// Handle to the archive worker pool. Cheap to clone; all clones feed the same pool.
#[derive(Clone)]
pub struct ArchiveQueue {
    tx: mpsc::Sender<ArchiveJob>,
    stats: Arc<ArchiveStats>,
    outcomes: broadcast::Sender<ArchiveOutcome>,
    shutdown: CancellationToken,
    backend: &'static str,
}

impl ArchiveQueue {
    /// Create the queue and spawn its dispatcher. Must be called inside a Tokio runtime.
    pub fn new(storage: Arc<dyn Storage>, config: ArchiveQueueConfig) -> Self {
        let queue_size = config.queue_size.max(1);
        let max_concurrent = config.max_concurrent.max(1);

        let (tx, rx) = mpsc::channel(queue_size);
        let (outcomes, _) = broadcast::channel(OUTCOME_CHANNEL_CAPACITY);
        let stats = Arc::new(ArchiveStats::default());
        let backend = backend_label(storage.as_ref());
        let shutdown = CancellationToken::new();

        tokio::spawn(Self::worker_pool(
            rx,
            shutdown.clone(),
            storage,
            max_concurrent,
            config.retry,
            stats.clone(),
            outcomes.clone(),
        ));

        tracing::info!(
            queue_size = queue_size,
            max_concurrent = max_concurrent,
            max_retries = config.retry.max_retries,
            backend = backend,
            "Archive queue initialized with bounded channel"
        );

        Self {
            tx,
            stats,
            outcomes,
            shutdown,
            backend,
        }
    }

    /// Enqueue a job without waiting. A full queue rejects the job.
    #[tracing::instrument(skip(self, job), fields(job.id = %job.job_id, storage_key = %job.storage_key))]
    pub fn submit(&self, job: ArchiveJob) -> Result<(), ArchiveSubmitError> {
        if self.shutdown.is_cancelled() {
            self.stats.rejected.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("Archive queue is shutting down, rejecting job");
            return Err(ArchiveSubmitError::Closed);
        }

        // Counted before sending so a fast worker can never underflow in_flight.
        self.stats.in_flight.fetch_add(1, Ordering::AcqRel);

        match self.tx.try_send(job) {
            Ok(()) => {
                self.stats.submitted.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Enqueued archive job");
                Ok(())
            }
            Err(e) => {
                self.stats.in_flight.fetch_sub(1, Ordering::AcqRel);
                self.stats.rejected.fetch_add(1, Ordering::Relaxed);
                let err = match e {
                    mpsc::error::TrySendError::Full(_) => ArchiveSubmitError::Full,
                    mpsc::error::TrySendError::Closed(_) => ArchiveSubmitError::Closed,
                };
                tracing::warn!(error = %err, "Archive job rejected");
                Err(err)
            }
        }
    }

    pub fn stats(&self) -> ArchiveStatsSnapshot {
        self.stats.snapshot()
    }

    /// Receive the outcome of every job finished after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ArchiveOutcome> {
        self.outcomes.subscribe()
    }

    pub fn backend(&self) -> &'static str {
        self.backend
    }

    /// Stop accepting jobs. Jobs already queued are still written.
    pub fn shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            tracing::info!(in_flight = self.stats.in_flight.load(Ordering::Acquire), "Archive queue shutting down");
            self.shutdown.cancel();
        }
    }

    /// Wait until no accepted job is pending, up to `timeout`. Returns whether the
    /// queue drained in time.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let drained = async {
            while self.stats.in_flight.load(Ordering::Acquire) > 0 {
                tokio::time::sleep(IDLE_POLL_INTERVAL).await;
            }
        };
        tokio::time::timeout(timeout, drained).await.is_ok()
    }

    async fn worker_pool(
        mut rx: mpsc::Receiver<ArchiveJob>,
        shutdown: CancellationToken,
        storage: Arc<dyn Storage>,
        max_concurrent: usize,
        retry: RetryPolicy,
        stats: Arc<ArchiveStats>,
        outcomes: broadcast::Sender<ArchiveOutcome>,
    ) {
        let semaphore = Arc::new(Semaphore::new(max_concurrent));
        let mut closing = false;

        loop {
            let job = tokio::select! {
                job = rx.recv() => job,
                _ = shutdown.cancelled(), if !closing => {
                    // Buffered jobs stay receivable after close.
                    rx.close();
                    closing = true;
                    continue;
                }
            };
            let Some(job) = job else { break };

            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let storage = storage.clone();
            let stats = stats.clone();
            let outcomes = outcomes.clone();

            tokio::spawn(async move {
                let _permit = permit;
                let outcome = Self::process_job(job, storage.as_ref(), retry).await;

                match &outcome {
                    ArchiveOutcome::Stored { .. } => stats.stored.fetch_add(1, Ordering::Relaxed),
                    ArchiveOutcome::Failed { .. } => stats.failed.fetch_add(1, Ordering::Relaxed),
                };
                stats.in_flight.fetch_sub(1, Ordering::AcqRel);

                // No subscribers is the normal case.
                let _ = outcomes.send(outcome);
            });
        }

        tracing::debug!("Archive queue closed, dispatcher exiting");
    }

    #[tracing::instrument(
        skip(job, storage, retry),
        fields(job.id = %job.job_id, storage_key = %job.storage_key, job.status = tracing::field::Empty)
    )]
    async fn process_job(job: ArchiveJob, storage: &dyn Storage, retry: RetryPolicy) -> ArchiveOutcome {
        let start = std::time::Instant::now();

        let (result, attempts) = retry
            .run("archive_upload", || {
                storage.upload_with_key(&job.storage_key, job.data.clone(), &job.content_type)
            })
            .await;

        let elapsed = start.elapsed();

        match result {
            Ok(url) => {
                tracing::Span::current().record("job.status", "success");
                tracing::info!(
                    attempts = attempts,
                    size_bytes = job.data.len(),
                    duration_ms = elapsed.as_millis(),
                    "Archive copy stored"
                );
                ArchiveOutcome::Stored {
                    job_id: job.job_id,
                    storage_key: job.storage_key,
                    url,
                    attempts,
                }
            }
            Err(e) => {
                tracing::Span::current().record("job.status", "failed");
                tracing::error!(
                    error = %e,
                    attempts = attempts,
                    duration_ms = elapsed.as_millis(),
                    "Archive copy failed"
                );
                ArchiveOutcome::Failed {
                    job_id: job.job_id,
                    storage_key: job.storage_key,
                    error: e.to_string(),
                    attempts,
                }
            }
        }
    }
}

fn backend_label(storage: &dyn Storage) -> &'static str {
    use ofs_storage::StorageBackend;
    match storage.backend_type() {
        StorageBackend::S3 => "s3",
        StorageBackend::Local => "local",
        StorageBackend::Memory => "memory",
        StorageBackend::Dropbox => "dropbox",
    }
}
