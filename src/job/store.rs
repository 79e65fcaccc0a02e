//! Persistence adapter: the write-through interface the worker consumes.
//! Relational/search-index implementations live behind this trait; the
//! in-memory store is the reference implementation and test double.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use super::{JobProgress, JobStatus};
use crate::pipeline::VerificationResult;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("persistence error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Append-only; duplicates per `(job_id, email)` may arrive and must
    /// be safe.
    async fn insert_result(
        &self,
        job_id: Uuid,
        result: &VerificationResult,
    ) -> Result<(), StoreError>;

    async fn create_job(&self, job_id: Uuid, total: u64) -> Result<(), StoreError>;

    /// Atomic progress increment with optional status change. `processed`
    /// only grows and never exceeds `total`; status never regresses.
    async fn update_job_processed(
        &self,
        job_id: Uuid,
        delta: u64,
        status: Option<JobStatus>,
    ) -> Result<(), StoreError>;

    async fn job_progress(&self, job_id: Uuid) -> Result<Option<JobProgress>, StoreError>;
}

#[derive(Default)]
pub struct MemoryStore {
    results: Mutex<Vec<(Uuid, VerificationResult)>>,
    seen: Mutex<HashSet<(Uuid, String)>>,
    jobs: Mutex<HashMap<Uuid, JobProgress>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn results_for(&self, job_id: Uuid) -> Vec<VerificationResult> {
        self.results
            .lock()
            .expect("results poisoned")
            .iter()
            .filter(|(id, _)| *id == job_id)
            .map(|(_, result)| result.clone())
            .collect()
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn insert_result(
        &self,
        job_id: Uuid,
        result: &VerificationResult,
    ) -> Result<(), StoreError> {
        let mut seen = self.seen.lock().expect("seen poisoned");
        if !seen.insert((job_id, result.email.clone())) {
            // Duplicate delivery; identical signals, nothing to add.
            return Ok(());
        }
        self.results
            .lock()
            .expect("results poisoned")
            .push((job_id, result.clone()));
        Ok(())
    }

    async fn create_job(&self, job_id: Uuid, total: u64) -> Result<(), StoreError> {
        self.jobs
            .lock()
            .expect("jobs poisoned")
            .entry(job_id)
            .or_insert(JobProgress {
                job_id,
                total,
                processed: 0,
                status: JobStatus::Queued,
            });
        Ok(())
    }

    async fn update_job_processed(
        &self,
        job_id: Uuid,
        delta: u64,
        status: Option<JobStatus>,
    ) -> Result<(), StoreError> {
        let mut jobs = self.jobs.lock().expect("jobs poisoned");
        let Some(progress) = jobs.get_mut(&job_id) else {
            return Err(StoreError::Backend(format!("unknown job {job_id}")));
        };

        progress.processed = progress.total.min(progress.processed + delta);
        if let Some(status) = status {
            if status.rank() >= progress.status.rank() {
                progress.status = status;
            }
        }
        if progress.processed >= progress.total && progress.status == JobStatus::Running {
            progress.status = JobStatus::Done;
        }
        Ok(())
    }

    async fn job_progress(&self, job_id: Uuid) -> Result<Option<JobProgress>, StoreError> {
        Ok(self.jobs.lock().expect("jobs poisoned").get(&job_id).cloned())
    }
}
