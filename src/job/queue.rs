//! FIFO job queue adapters: redis lists in production, an in-memory
//! double for tests and embedded use.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use thiserror::Error;
use tokio::sync::Notify;
use tokio::time::Instant;

use super::JobEnvelope;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue backend error: {source}")]
    Redis {
        #[from]
        source: redis::RedisError,
    },
    /// The payload was popped but is not a valid envelope; it is gone from
    /// the queue and the caller should log and move on.
    #[error("malformed queue payload: {source}")]
    Malformed {
        #[from]
        source: serde_json::Error,
    },
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, envelope: &JobEnvelope) -> Result<(), QueueError>;

    /// Blocking pop with a timeout; `None` when the queue stayed empty.
    async fn dequeue(&self, timeout: Duration) -> Result<Option<JobEnvelope>, QueueError>;
}

/// Redis list queue: RPUSH to submit, BLPOP to consume. Multiple workers
/// may consume concurrently; delivery is at-least-once.
pub struct RedisQueue {
    conn: ConnectionManager,
    key: String,
}

impl RedisQueue {
    pub async fn connect(url: &str, key: impl Into<String>) -> Result<Self, QueueError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::new(conn, key))
    }

    pub fn new(conn: ConnectionManager, key: impl Into<String>) -> Self {
        Self {
            conn,
            key: key.into(),
        }
    }
}

#[async_trait]
impl JobQueue for RedisQueue {
    async fn enqueue(&self, envelope: &JobEnvelope) -> Result<(), QueueError> {
        let payload = envelope.encode()?;
        let mut conn = self.conn.clone();
        redis::cmd("RPUSH")
            .arg(&self.key)
            .arg(payload)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn dequeue(&self, timeout: Duration) -> Result<Option<JobEnvelope>, QueueError> {
        let mut conn = self.conn.clone();
        let item: Option<(String, Vec<u8>)> = redis::cmd("BLPOP")
            .arg(&self.key)
            .arg(timeout.as_secs().max(1))
            .query_async(&mut conn)
            .await?;
        match item {
            Some((_, raw)) => Ok(Some(JobEnvelope::decode(&raw)?)),
            None => Ok(None),
        }
    }
}

/// In-memory FIFO speaking the same wire encoding as the redis queue.
#[derive(Default)]
pub struct MemoryQueue {
    items: Mutex<VecDeque<Vec<u8>>>,
    notify: Notify,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push raw bytes, bypassing encoding. Lets tests exercise the
    /// malformed-payload path.
    pub fn push_raw(&self, raw: Vec<u8>) {
        self.items.lock().expect("queue poisoned").push_back(raw);
        self.notify.notify_one();
    }

    pub fn len(&self) -> usize {
        self.items.lock().expect("queue poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn enqueue(&self, envelope: &JobEnvelope) -> Result<(), QueueError> {
        self.push_raw(envelope.encode()?);
        Ok(())
    }

    async fn dequeue(&self, timeout: Duration) -> Result<Option<JobEnvelope>, QueueError> {
        let deadline = Instant::now() + timeout;
        loop {
            let raw = self.items.lock().expect("queue poisoned").pop_front();
            if let Some(raw) = raw {
                return Ok(Some(JobEnvelope::decode(&raw)?));
            }
            if tokio::time::timeout_at(deadline, self.notify.notified())
                .await
                .is_err()
            {
                return Ok(None);
            }
        }
    }
}
