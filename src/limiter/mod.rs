//! Per-domain token bucket and per-destination circuit breaker.
//!
//! Production workers share state through redis, where both primitives
//! are atomic Lua scripts; `LocalGate` mirrors the semantics in-process
//! for tests and single-worker runs.

mod local;
mod scripts;

pub use local::LocalGate;
pub use scripts::{CIRCUIT_BREAKER_LUA, TOKEN_BUCKET_LUA};

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use redis::Script;
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GateError {
    #[error("rate-limit store error: {source}")]
    Redis {
        #[from]
        source: redis::RedisError,
    },
    #[error("{0}")]
    Generic(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GateConfig {
    pub capacity: f64,
    pub refill_per_sec: f64,
    pub window_secs: u64,
    pub threshold: u64,
    pub open_secs: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            capacity: 20.0,
            refill_per_sec: 10.0,
            window_secs: 300,
            threshold: 5,
            open_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateDecision {
    pub allowed: bool,
    pub tokens_left: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerState {
    pub is_open: bool,
    pub count: u64,
    pub opened_until: u64,
}

/// Admission control shared by every worker probing a destination.
#[async_trait]
pub trait RateGate: Send + Sync {
    /// Token-bucket admission for one probe against `domain`.
    async fn allow(&self, domain: &str) -> Result<RateDecision, GateError>;

    /// Record a transport failure against `dest`; opens the breaker once
    /// the threshold is crossed within the window.
    async fn record_failure(&self, dest: &str) -> Result<BreakerState, GateError>;

    async fn breaker_state(&self, dest: &str) -> Result<BreakerState, GateError>;

    /// Drop both the failure counter and the open flag.
    async fn clear(&self, dest: &str) -> Result<(), GateError>;
}

pub(crate) fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Redis-backed gate: one `EVALSHA` per operation, no client-side locking.
pub struct RedisGate {
    conn: ConnectionManager,
    bucket: Script,
    breaker: Script,
    config: GateConfig,
}

impl RedisGate {
    pub async fn connect(url: &str, config: GateConfig) -> Result<Self, GateError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::new(conn, config))
    }

    pub fn new(conn: ConnectionManager, config: GateConfig) -> Self {
        Self {
            conn,
            bucket: Script::new(TOKEN_BUCKET_LUA),
            breaker: Script::new(CIRCUIT_BREAKER_LUA),
            config,
        }
    }

    async fn breaker_call(
        &self,
        dest: &str,
        op: &str,
    ) -> Result<BreakerState, GateError> {
        let mut conn = self.conn.clone();
        let (is_open, count, opened_until): (i64, i64, i64) = self
            .breaker
            .key(format!("cb:{dest}"))
            .arg(self.config.window_secs)
            .arg(self.config.threshold)
            .arg(self.config.open_secs)
            .arg(unix_now() as u64)
            .arg(op)
            .invoke_async(&mut conn)
            .await?;
        Ok(BreakerState {
            is_open: is_open == 1,
            count: count.max(0) as u64,
            opened_until: opened_until.max(0) as u64,
        })
    }
}

#[async_trait]
impl RateGate for RedisGate {
    async fn allow(&self, domain: &str) -> Result<RateDecision, GateError> {
        let mut conn = self.conn.clone();
        let (allowed, tokens): (i64, String) = self
            .bucket
            .key(format!("tb:{domain}"))
            .arg(self.config.capacity)
            .arg(self.config.refill_per_sec)
            .arg(unix_now())
            .arg(1)
            .invoke_async(&mut conn)
            .await?;
        Ok(RateDecision {
            allowed: allowed == 1,
            tokens_left: tokens.parse().unwrap_or(0.0),
        })
    }

    async fn record_failure(&self, dest: &str) -> Result<BreakerState, GateError> {
        self.breaker_call(dest, "inc").await
    }

    async fn breaker_state(&self, dest: &str) -> Result<BreakerState, GateError> {
        self.breaker_call(dest, "is_open").await
    }

    async fn clear(&self, dest: &str) -> Result<(), GateError> {
        self.breaker_call(dest, "clear").await.map(|_| ())
    }
}
