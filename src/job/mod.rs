//! Job model: envelopes on the queue, progress rows in the store.

pub mod queue;
pub mod store;
pub mod worker;

pub use queue::{JobQueue, MemoryQueue, QueueError, RedisQueue};
pub use store::{MemoryStore, ResultStore, StoreError};
pub use worker::{Verifier, Worker, WorkerConfig};

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One submission: consumed exactly once by a worker, delivered at least
/// once by the queue, so processing must be idempotent per
/// `(job_id, email)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobEnvelope {
    pub job_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    pub emails: Vec<String>,
    #[serde(default)]
    pub meta: HashMap<String, String>,
}

impl JobEnvelope {
    pub fn new(emails: Vec<String>, owner_id: Option<String>) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            owner_id,
            emails,
            meta: HashMap::new(),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn decode(raw: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    Failed,
}

impl JobStatus {
    /// Transition rank; status never regresses.
    pub(crate) fn rank(self) -> u8 {
        match self {
            Self::Queued => 0,
            Self::Running => 1,
            Self::Done | Self::Failed => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobProgress {
    pub job_id: Uuid,
    pub total: u64,
    pub processed: u64,
    pub status: JobStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_round_trips_through_json() {
        let mut envelope = JobEnvelope::new(
            vec!["a@acme.io".to_string(), "b@acme.io".to_string()],
            Some("tenant-1".to_string()),
        );
        envelope.meta.insert("source".to_string(), "csv".to_string());
        let raw = envelope.encode().expect("encode");
        let decoded = JobEnvelope::decode(&raw).expect("decode");
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn envelope_tolerates_missing_optional_fields() {
        let raw = br#"{"job_id":"6f7c0a57-6eab-4ee6-a084-7bf2f72ec4b3","emails":["a@acme.io"]}"#;
        let decoded = JobEnvelope::decode(raw).expect("decode");
        assert!(decoded.owner_id.is_none());
        assert!(decoded.meta.is_empty());
    }

    #[test]
    fn status_ranks_are_monotone() {
        assert!(JobStatus::Queued.rank() < JobStatus::Running.rank());
        assert!(JobStatus::Running.rank() < JobStatus::Done.rank());
        assert_eq!(JobStatus::Done.rank(), JobStatus::Failed.rank());
    }
}
