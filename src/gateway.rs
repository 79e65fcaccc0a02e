//! Probe gateway: the funnel between per-address pipelines and SMTP
//! sessions. Requests for the same domain coalesce in the batcher; each
//! emitted batch passes the circuit breaker and the token bucket, then
//! runs over one pooled session.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::batch::DomainBatcher;
use crate::classify::NON_VERIFIABLE_DOMAINS;
use crate::limiter::RateGate;
use crate::smtp::{SmtpPool, SmtpProbeResult, probe_batch};

/// How long a batch may wait for a token before the whole batch reports
/// `rate-limited`.
const RATE_WAIT_MAX: Duration = Duration::from_secs(10);
const RATE_WAIT_STEP: Duration = Duration::from_millis(200);

#[async_trait]
pub trait MailboxProber: Send + Sync {
    /// SMTP evidence for one address; never fails, failures are encoded in
    /// the result.
    async fn probe(&self, email: &str, domain: &str, mx_hosts: &[String]) -> SmtpProbeResult;
}

struct PendingProbe {
    email: String,
    mx_hosts: Vec<String>,
    reply: oneshot::Sender<SmtpProbeResult>,
}

struct GatewayInner {
    pool: SmtpPool,
    gate: Arc<dyn RateGate>,
    batcher: DomainBatcher<PendingProbe>,
    drains: Mutex<HashSet<String>>,
}

#[derive(Clone)]
pub struct SmtpGateway {
    inner: Arc<GatewayInner>,
}

impl SmtpGateway {
    pub fn new(pool: SmtpPool, gate: Arc<dyn RateGate>) -> Self {
        Self {
            inner: Arc::new(GatewayInner {
                pool,
                gate,
                batcher: DomainBatcher::default(),
                drains: Mutex::new(HashSet::new()),
            }),
        }
    }

    fn ensure_drain(&self, domain: &str) {
        let mut drains = self.inner.drains.lock().expect("drain set poisoned");
        if drains.contains(domain) {
            return;
        }
        drains.insert(domain.to_string());
        tokio::spawn(drain_loop(self.inner.clone(), domain.to_string()));
    }
}

#[async_trait]
impl MailboxProber for SmtpGateway {
    async fn probe(&self, email: &str, domain: &str, mx_hosts: &[String]) -> SmtpProbeResult {
        // Privacy short-circuit before any queueing: no I/O, no batch wait.
        if NON_VERIFIABLE_DOMAINS.contains(domain) {
            return SmtpProbeResult::privacy_protected();
        }

        let (tx, rx) = oneshot::channel();
        self.inner.batcher.add(
            domain,
            PendingProbe {
                email: email.to_string(),
                mx_hosts: mx_hosts.to_vec(),
                reply: tx,
            },
        );
        self.ensure_drain(domain);

        match rx.await {
            Ok(result) => result,
            Err(_) => SmtpProbeResult::unknown("probe task dropped"),
        }
    }
}

async fn drain_loop(inner: Arc<GatewayInner>, domain: String) {
    loop {
        let batch = inner.batcher.next_batch(&domain).await;
        if batch.is_empty() {
            // Deregister; re-check under the lock so a request that raced
            // in is either seen here or spawns a fresh drain.
            let mut drains = inner.drains.lock().expect("drain set poisoned");
            if inner.batcher.pending(&domain) == 0 {
                drains.remove(&domain);
                drop(drains);
                inner.batcher.remove_idle_lane(&domain);
                return;
            }
            continue;
        }
        inner.process_batch(&domain, batch).await;
    }
}

impl GatewayInner {
    async fn process_batch(&self, domain: &str, batch: Vec<PendingProbe>) {
        match self.gate.breaker_state(domain).await {
            Ok(state) if state.is_open => {
                tracing::info!(domain, count = state.count, "circuit open, skipping probe");
                reply_all(batch, SmtpProbeResult::circuit_open());
                return;
            }
            Ok(_) => {}
            Err(err) => {
                // The gate being down must not stop verification; fail open.
                tracing::warn!(domain, error = %err, "breaker check failed");
            }
        }

        if !self.wait_for_token(domain).await {
            reply_all(batch, SmtpProbeResult::rate_limited());
            return;
        }

        let mx_hosts = batch
            .first()
            .map(|pending| pending.mx_hosts.clone())
            .unwrap_or_default();
        let emails: Vec<String> = batch.iter().map(|p| p.email.clone()).collect();

        let outcome = probe_batch(&self.pool, domain, &mx_hosts, &emails).await;

        if outcome.transport_failure {
            if let Err(err) = self.gate.record_failure(domain).await {
                tracing::warn!(domain, error = %err, "breaker increment failed");
            }
        }

        for (pending, result) in batch.into_iter().zip(outcome.results) {
            let _ = pending.reply.send(result);
        }
    }

    async fn wait_for_token(&self, domain: &str) -> bool {
        let mut waited = Duration::ZERO;
        loop {
            match self.gate.allow(domain).await {
                Ok(decision) if decision.allowed => return true,
                Ok(decision) => {
                    tracing::trace!(domain, tokens = decision.tokens_left, "rate limited, waiting");
                }
                Err(err) => {
                    tracing::warn!(domain, error = %err, "token bucket check failed");
                    return true;
                }
            }
            if waited >= RATE_WAIT_MAX {
                return false;
            }
            tokio::time::sleep(RATE_WAIT_STEP).await;
            waited += RATE_WAIT_STEP;
        }
    }
}

fn reply_all(batch: Vec<PendingProbe>, result: SmtpProbeResult) {
    for pending in batch {
        let _ = pending.reply.send(result.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limiter::{GateConfig, LocalGate};
    use crate::smtp::{PoolConfig, SmtpProbeOptions};

    fn gateway() -> SmtpGateway {
        let pool = SmtpPool::new(PoolConfig::default(), SmtpProbeOptions::default());
        SmtpGateway::new(pool, Arc::new(LocalGate::new(GateConfig::default())))
    }

    #[tokio::test]
    async fn privacy_domains_never_reach_the_batcher() {
        let gw = gateway();
        let result = gw
            .probe("nobody@gmail.com", "gmail.com", &["alt1.gmail-smtp-in.l.google.com".to_string()])
            .await;
        assert!(result.message.contains("privacy"));
        assert_eq!(gw.inner.batcher.pending("gmail.com"), 0);
    }

    #[tokio::test]
    async fn open_breaker_short_circuits_batches() {
        let gate = Arc::new(LocalGate::new(GateConfig {
            threshold: 1,
            ..GateConfig::default()
        }));
        let pool = SmtpPool::new(PoolConfig::default(), SmtpProbeOptions::default());
        let gw = SmtpGateway::new(pool, gate.clone());

        use crate::limiter::RateGate as _;
        gate.record_failure("acme.io").await.expect("local gate");

        let result = gw
            .probe("alice@acme.io", "acme.io", &["mx.acme.io".to_string()])
            .await;
        assert_eq!(result.message, "circuit-open");
    }
}
