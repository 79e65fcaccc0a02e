//! The job worker: blocking queue pulls, per-job fan-out under a
//! concurrency semaphore, write-through persistence, progress updates.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::queue::{JobQueue, QueueError};
use super::store::ResultStore;
use super::{JobEnvelope, JobStatus};
use crate::pipeline::{VerificationResult, VerifyEngine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Concurrent per-address pipelines within one job.
    pub concurrency: usize,
    /// Blocking-pop timeout on the queue.
    pub poll_timeout: Duration,
    /// Sleep between polls when the queue is empty.
    pub sleep_empty: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            poll_timeout: Duration::from_secs(5),
            sleep_empty: Duration::from_secs(1),
        }
    }
}

/// Seam between the worker and the verification pipeline.
#[async_trait]
pub trait Verifier: Send + Sync {
    async fn verify(&self, email: &str) -> VerificationResult;
}

#[async_trait]
impl Verifier for VerifyEngine {
    async fn verify(&self, email: &str) -> VerificationResult {
        VerifyEngine::verify(self, email).await
    }
}

pub struct Worker<Q, S, V> {
    queue: Q,
    store: Arc<S>,
    verifier: Arc<V>,
    config: WorkerConfig,
}

impl<Q, S, V> Worker<Q, S, V>
where
    Q: JobQueue,
    S: ResultStore + 'static,
    V: Verifier + 'static,
{
    pub fn new(queue: Q, store: Arc<S>, verifier: Arc<V>, config: WorkerConfig) -> Self {
        Self {
            queue,
            store,
            verifier,
            config,
        }
    }

    /// Consume the queue forever.
    pub async fn run(&self) {
        tracing::info!(concurrency = self.config.concurrency, "worker started");
        loop {
            match self.poll_once().await {
                Ok(true) => {}
                Ok(false) => tokio::time::sleep(self.config.sleep_empty).await,
                Err(err) => {
                    tracing::error!(error = %err, "queue poll failed");
                    tokio::time::sleep(self.config.sleep_empty).await;
                }
            }
        }
    }

    /// One queue poll. Returns whether a payload was consumed. Malformed
    /// payloads are logged and dropped; the queue has already advanced.
    pub async fn poll_once(&self) -> Result<bool, QueueError> {
        let envelope = match self.queue.dequeue(self.config.poll_timeout).await {
            Ok(Some(envelope)) => envelope,
            Ok(None) => return Ok(false),
            Err(QueueError::Malformed { source }) => {
                tracing::warn!(error = %source, "dropping malformed queue payload");
                return Ok(true);
            }
            Err(err) => return Err(err),
        };
        self.process_job(envelope).await;
        Ok(true)
    }

    async fn process_job(&self, envelope: JobEnvelope) {
        let job_id = envelope.job_id;
        let total = envelope.emails.len() as u64;
        tracing::info!(%job_id, emails = total, "processing job");

        // Idempotent when the submitter already persisted the job row.
        if let Err(err) = self.store.create_job(job_id, total).await {
            tracing::error!(%job_id, error = %err, "job row creation failed");
        }
        if let Err(err) = self
            .store
            .update_job_processed(job_id, 0, Some(JobStatus::Running))
            .await
        {
            tracing::error!(%job_id, error = %err, "status update failed");
        }

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for email in envelope.emails {
            let semaphore = semaphore.clone();
            let store = self.store.clone();
            let verifier = self.verifier.clone();
            tasks.spawn(async move {
                let _permit = semaphore.acquire().await.expect("semaphore closed");
                let result = verifier.verify(&email).await;
                persist(&*store, job_id, &result).await;
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                // A panicking pipeline loses one address but not the job.
                tracing::error!(%job_id, error = %err, "pipeline task failed");
                if let Err(err) = self.store.update_job_processed(job_id, 1, None).await {
                    tracing::error!(%job_id, error = %err, "progress update failed");
                }
            }
        }

        if let Err(err) = self
            .store
            .update_job_processed(job_id, 0, Some(JobStatus::Done))
            .await
        {
            tracing::error!(%job_id, error = %err, "final status update failed");
        }
        tracing::info!(%job_id, "job finished");
    }
}

/// Persist one result and advance progress. Persistence failures are
/// logged but still advance the counter: delivery is at-least-once and
/// downstream dedupes on `(job_id, email)`.
async fn persist<S: ResultStore>(store: &S, job_id: uuid::Uuid, result: &VerificationResult) {
    tracing::info!(
        %job_id,
        email = %result.email,
        status = ?result.status,
        score = result.score,
        reason = %result.reason,
        "verified"
    );
    if let Err(err) = store.insert_result(job_id, result).await {
        tracing::error!(%job_id, email = %result.email, error = %err, "result insert failed");
    }
    if let Err(err) = store.update_job_processed(job_id, 1, None).await {
        tracing::error!(%job_id, error = %err, "progress update failed");
    }
}
