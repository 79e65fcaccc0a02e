//! In-process gate with the same semantics as the redis scripts. Used by
//! tests and single-process deployments; multi-worker fleets need the
//! shared store.

use std::collections::HashMap;
use std::sync::Mutex;

use super::{BreakerState, GateConfig, RateDecision, unix_now};

#[derive(Debug, Clone, Copy)]
struct BucketState {
    tokens: f64,
    last: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct BreakerEntry {
    count: u64,
    count_expires: f64,
    opened_until: f64,
}

#[derive(Default)]
pub struct LocalGate {
    config: GateConfig,
    buckets: Mutex<HashMap<String, BucketState>>,
    breakers: Mutex<HashMap<String, BreakerEntry>>,
}

impl LocalGate {
    pub fn new(config: GateConfig) -> Self {
        Self {
            config,
            buckets: Mutex::new(HashMap::new()),
            breakers: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn allow_at(&self, domain: &str, now: f64) -> RateDecision {
        let mut buckets = self.buckets.lock().expect("bucket map poisoned");
        let state = buckets.entry(domain.to_string()).or_insert(BucketState {
            tokens: self.config.capacity,
            last: now,
        });

        let elapsed = (now - state.last).max(0.0);
        state.tokens = self
            .config
            .capacity
            .min(state.tokens + elapsed * self.config.refill_per_sec);
        state.last = now;

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            RateDecision {
                allowed: true,
                tokens_left: state.tokens,
            }
        } else {
            RateDecision {
                allowed: false,
                tokens_left: state.tokens,
            }
        }
    }

    pub(crate) fn record_failure_at(&self, dest: &str, now: f64) -> BreakerState {
        let mut breakers = self.breakers.lock().expect("breaker map poisoned");
        let entry = breakers.entry(dest.to_string()).or_default();

        if now >= entry.count_expires {
            entry.count = 0;
        }
        entry.count += 1;
        entry.count_expires = now + self.config.window_secs as f64;
        if entry.count >= self.config.threshold {
            entry.opened_until = now + self.config.open_secs as f64;
        }

        BreakerState {
            is_open: entry.opened_until > now,
            count: entry.count,
            opened_until: entry.opened_until as u64,
        }
    }

    pub(crate) fn breaker_state_at(&self, dest: &str, now: f64) -> BreakerState {
        let breakers = self.breakers.lock().expect("breaker map poisoned");
        let entry = breakers.get(dest).copied().unwrap_or_default();
        let count = if now >= entry.count_expires { 0 } else { entry.count };
        BreakerState {
            is_open: entry.opened_until > now,
            count,
            opened_until: entry.opened_until as u64,
        }
    }

    pub(crate) fn clear_dest(&self, dest: &str) {
        self.breakers
            .lock()
            .expect("breaker map poisoned")
            .remove(dest);
    }
}

#[async_trait::async_trait]
impl super::RateGate for LocalGate {
    async fn allow(&self, domain: &str) -> Result<RateDecision, super::GateError> {
        Ok(self.allow_at(domain, unix_now()))
    }

    async fn record_failure(&self, dest: &str) -> Result<BreakerState, super::GateError> {
        Ok(self.record_failure_at(dest, unix_now()))
    }

    async fn breaker_state(&self, dest: &str) -> Result<BreakerState, super::GateError> {
        Ok(self.breaker_state_at(dest, unix_now()))
    }

    async fn clear(&self, dest: &str) -> Result<(), super::GateError> {
        self.clear_dest(dest);
        Ok(())
    }
}
