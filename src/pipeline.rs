//! Per-address verification pipeline: syntax → classification → MX →
//! (infra ∥ SMTP) → decision → scoring → reputation.
//!
//! The pipeline never fails; every recoverable error is folded into the
//! result. Only the wall-clock budget can cut it short.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::classify::{
    DomainKind, LocalClass, alias_tag, classify_domain, classify_local, username_strength,
};
use crate::decision::{Signals, Verdict, VerdictStatus, decide};
use crate::gateway::MailboxProber;
use crate::infra::{InfraProber, InfraScore, score_domain_infra};
use crate::mx::MxResolver;
use crate::reputation::{ReputationStore, TrustLevel};
use crate::validator::parse_email;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Hard per-address wall-clock budget; the pipeline is cancelled past it.
    pub hard_budget: Duration,
    /// Soft budget; exceeding it is only logged.
    pub soft_budget: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hard_budget: Duration::from_secs(300),
            soft_budget: Duration::from_secs(240),
        }
    }
}

/// Immutable once persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub email: String,
    pub domain: String,
    pub status: VerdictStatus,
    pub score: u8,
    pub reason: String,
    pub signals: Signals,
    pub infra_score: Option<InfraScore>,
    pub domain_trust: TrustLevel,
    pub duration_ms: u64,
}

pub struct VerifyEngine {
    resolver: MxResolver,
    infra: Arc<dyn InfraProber>,
    prober: Arc<dyn MailboxProber>,
    reputation: Arc<ReputationStore>,
    config: EngineConfig,
}

impl VerifyEngine {
    pub fn new(
        resolver: MxResolver,
        infra: Arc<dyn InfraProber>,
        prober: Arc<dyn MailboxProber>,
        reputation: Arc<ReputationStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            resolver,
            infra,
            prober,
            reputation,
            config,
        }
    }

    pub fn reputation(&self) -> &ReputationStore {
        &self.reputation
    }

    pub async fn verify(&self, email: &str) -> VerificationResult {
        let started = Instant::now();
        let outcome =
            tokio::time::timeout(self.config.hard_budget, self.verify_inner(email, started)).await;
        match outcome {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(email, "verification exceeded hard budget");
                let mut signals = Signals::invalid_syntax(email);
                signals.syntax_valid = true;
                self.finish(
                    email,
                    &domain_of(email),
                    Verdict {
                        status: VerdictStatus::Unknown,
                        score: 25,
                        reason: "Verification timed out".to_string(),
                    },
                    signals,
                    started,
                )
            }
        }
    }

    async fn verify_inner(&self, email: &str, started: Instant) -> VerificationResult {
        let parsed = parse_email(email);
        if !parsed.valid {
            tracing::debug!(email, reasons = ?parsed.reasons, "syntax rejection");
            let signals = Signals::invalid_syntax(email);
            let verdict = decide(&signals);
            return self.finish(email, "", verdict, signals, started);
        }

        let domain = parsed.ascii_domain.clone();
        let local_class = classify_local(&parsed.local);
        let domain_class = classify_domain(&domain);

        let mut signals = Signals {
            email: parsed.original.clone(),
            domain: domain.clone(),
            syntax_valid: true,
            is_disposable: domain_class.kind == DomainKind::Disposable,
            is_role: local_class == LocalClass::Role,
            is_free_provider: domain_class.kind == DomainKind::UnverifiablePersonal,
            is_private_relay: domain_class.kind == DomainKind::PrivateRelay,
            alias_tag: alias_tag(&parsed.local),
            local_class: Some(local_class),
            username_strength: username_strength(local_class),
            smtp: None,
            infra: None,
        };

        let mx_records = match self.resolver.resolve(&domain).await {
            Ok(records) => records,
            Err(err) if err.is_timeout() => {
                tracing::debug!(domain, "MX lookup timed out");
                let verdict = Verdict {
                    status: VerdictStatus::Unknown,
                    score: 25,
                    reason: "MX lookup timed out".to_string(),
                };
                return self.finish(email, &domain, verdict, signals, started);
            }
            Err(err) => {
                tracing::debug!(domain, error = %err, "MX lookup failed");
                let verdict = no_mx_verdict();
                return self.finish(email, &domain, verdict, signals, started);
            }
        };

        if mx_records.is_empty() {
            return self.finish(email, &domain, no_mx_verdict(), signals, started);
        }

        let mx_hosts: Vec<String> = mx_records.iter().map(|r| r.exchange.clone()).collect();

        // SMTP and infra probes run side by side; only SMTP-verifiable,
        // non-disposable domains are worth a session.
        let wants_smtp = domain_class.smtp_verifiable && !signals.is_disposable;
        let smtp_probe = async {
            if wants_smtp {
                Some(self.prober.probe(email, &domain, &mx_hosts).await)
            } else {
                None
            }
        };
        let (smtp, infra) = tokio::join!(smtp_probe, self.infra.probe(&domain));
        signals.smtp = smtp;
        signals.infra = Some(infra);

        let verdict = decide(&signals);
        self.finish(email, &domain, verdict, signals, started)
    }

    fn finish(
        &self,
        email: &str,
        domain: &str,
        verdict: Verdict,
        signals: Signals,
        started: Instant,
    ) -> VerificationResult {
        if !domain.is_empty() {
            self.reputation.record(domain, verdict.status);
        }

        let elapsed = started.elapsed();
        if elapsed > self.config.soft_budget {
            tracing::warn!(email, elapsed_ms = elapsed.as_millis() as u64, "soft budget exceeded");
        }

        VerificationResult {
            email: email.to_string(),
            domain: domain.to_string(),
            status: verdict.status,
            score: verdict.score,
            reason: verdict.reason,
            infra_score: signals.infra.as_ref().map(score_domain_infra),
            domain_trust: self.reputation.trust_level(domain),
            signals,
            duration_ms: elapsed.as_millis() as u64,
        }
    }
}

fn no_mx_verdict() -> Verdict {
    Verdict {
        status: VerdictStatus::Risky,
        score: 20,
        reason: "Domain has no MX records".to_string(),
    }
}

fn domain_of(email: &str) -> String {
    email.split_once('@').map(|(_, d)| d).unwrap_or("").to_string()
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::infra::{DomainInfra, WebFingerprint, WebStatus};
    use crate::mx::{LookupMx, MxLookupError, MxRecord};
    use crate::smtp::{SmtpProbeResult, SmtpStatus};

    struct StubMx {
        outcome: fn(&str) -> Result<Vec<MxRecord>, MxLookupError>,
    }

    #[async_trait]
    impl LookupMx for StubMx {
        async fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, MxLookupError> {
            (self.outcome)(domain)
        }

        async fn lookup_a(&self, _domain: &str) -> Result<bool, MxLookupError> {
            Ok(false)
        }
    }

    struct StubInfra {
        infra: DomainInfra,
    }

    #[async_trait]
    impl InfraProber for StubInfra {
        async fn probe(&self, _domain: &str) -> DomainInfra {
            self.infra.clone()
        }
    }

    struct StubProber {
        result: SmtpProbeResult,
    }

    #[async_trait]
    impl MailboxProber for StubProber {
        async fn probe(
            &self,
            _email: &str,
            _domain: &str,
            _mx_hosts: &[String],
        ) -> SmtpProbeResult {
            self.result.clone()
        }
    }

    fn smtp_result(status: SmtpStatus) -> SmtpProbeResult {
        let mut result = SmtpProbeResult::unknown("");
        result.smtp_status = status;
        result
    }

    fn engine(
        mx: fn(&str) -> Result<Vec<MxRecord>, MxLookupError>,
        infra: DomainInfra,
        smtp: SmtpProbeResult,
    ) -> VerifyEngine {
        VerifyEngine::new(
            MxResolver::new(Arc::new(StubMx { outcome: mx })),
            Arc::new(StubInfra { infra }),
            Arc::new(StubProber { result: smtp }),
            Arc::new(ReputationStore::new()),
            EngineConfig::default(),
        )
    }

    fn one_mx(_domain: &str) -> Result<Vec<MxRecord>, MxLookupError> {
        Ok(vec![MxRecord::new(10, "mx1.acme.io")])
    }

    fn bare_infra() -> DomainInfra {
        DomainInfra::empty("acme.io")
    }

    #[tokio::test]
    async fn invalid_syntax_short_circuits() {
        let engine = engine(one_mx, bare_infra(), smtp_result(SmtpStatus::Unknown));
        let result = engine.verify("definitely not an email").await;
        assert_eq!(result.status, VerdictStatus::Undeliverable);
        assert_eq!(result.score, 0);
        assert_eq!(result.reason, "Invalid syntax");
        assert!(result.domain.is_empty());
    }

    #[tokio::test]
    async fn parked_mx_is_risky_no_mx() {
        fn parked(_: &str) -> Result<Vec<MxRecord>, MxLookupError> {
            Err(MxLookupError::ParkedExchange {
                host: "mail.parking.example.com".to_string(),
            })
        }
        let engine = engine(parked, bare_infra(), smtp_result(SmtpStatus::Unknown));
        let result = engine.verify("alice@example.com").await;
        assert_eq!(result.status, VerdictStatus::Risky);
        assert_eq!(result.score, 20);
        assert_eq!(result.reason, "Domain has no MX records");
    }

    #[tokio::test]
    async fn empty_mx_is_risky_no_mx() {
        fn empty(_: &str) -> Result<Vec<MxRecord>, MxLookupError> {
            Ok(Vec::new())
        }
        let engine = engine(empty, bare_infra(), smtp_result(SmtpStatus::Unknown));
        let result = engine.verify("alice@acme.io").await;
        assert_eq!(result.status, VerdictStatus::Risky);
        assert_eq!(result.reason, "Domain has no MX records");
    }

    #[tokio::test]
    async fn mx_timeout_is_unknown() {
        fn timeout(domain: &str) -> Result<Vec<MxRecord>, MxLookupError> {
            Err(MxLookupError::Timeout {
                domain: domain.to_string(),
            })
        }
        let engine = engine(timeout, bare_infra(), smtp_result(SmtpStatus::Unknown));
        let result = engine.verify("alice@acme.io").await;
        assert_eq!(result.status, VerdictStatus::Unknown);
        assert_eq!(result.reason, "MX lookup timed out");
    }

    #[tokio::test]
    async fn free_provider_skips_smtp_and_uses_heuristics() {
        // The stub prober would say Invalid; it must never be consulted.
        let engine = engine(one_mx, bare_infra(), smtp_result(SmtpStatus::Invalid));
        let result = engine.verify("nobody@gmail.com").await;
        assert_eq!(result.status, VerdictStatus::Deliverable);
        assert_eq!(result.score, 85);
        assert_eq!(result.reason, "Free provider heuristic deliverable");
        assert!(result.signals.smtp.is_none());
    }

    #[tokio::test]
    async fn smtp_rejection_is_undeliverable() {
        let engine = engine(one_mx, bare_infra(), smtp_result(SmtpStatus::Invalid));
        let result = engine.verify("deadbox@acme.io").await;
        assert_eq!(result.status, VerdictStatus::Undeliverable);
        assert_eq!(result.score, 10);
        assert_eq!(result.reason, "Mailbox does not exist");
    }

    #[tokio::test]
    async fn catch_all_beats_role() {
        let mut probe = smtp_result(SmtpStatus::Deliverable);
        probe.is_catch_all = true;
        let engine = engine(one_mx, bare_infra(), probe);
        let result = engine.verify("admin@acme.io").await;
        assert_eq!(result.status, VerdictStatus::Risky);
        assert_eq!(result.score, 60);
        assert_eq!(result.reason, "Catch-all domain");
    }

    #[tokio::test]
    async fn timeout_with_live_web_promotes_to_deliverable() {
        let mut probe = smtp_result(SmtpStatus::Unknown);
        probe.timed_out = true;
        let infra = DomainInfra {
            domain: "startup-launch-new.io".to_string(),
            domain_age_days: Some(90),
            has_spf: true,
            has_dmarc: false,
            web_status: WebStatus::Active,
            https: true,
            web: Some(WebFingerprint {
                has_website: true,
                http_status: Some(200),
                https: true,
                title: Some("Launch".to_string()),
                meta_description: Some("New things".to_string()),
                has_favicon: true,
                parking: false,
            }),
        };
        let engine = engine(one_mx, infra, probe);
        let result = engine.verify("xjk92z3q@startup-launch-new.io").await;
        assert_eq!(result.status, VerdictStatus::Deliverable);
        assert_eq!(result.score, 90);
        assert!(result.infra_score.is_some());
    }

    #[tokio::test]
    async fn disposable_never_probes_smtp() {
        let engine = engine(one_mx, bare_infra(), smtp_result(SmtpStatus::Deliverable));
        let result = engine.verify("user@mailinator.com").await;
        assert_eq!(result.status, VerdictStatus::Risky);
        assert_eq!(result.score, 40);
        assert_eq!(result.reason, "Disposable domain");
        assert!(result.signals.smtp.is_none());
    }

    #[tokio::test]
    async fn reputation_is_updated_per_verification() {
        let engine = engine(one_mx, bare_infra(), smtp_result(SmtpStatus::Deliverable));
        for _ in 0..6 {
            engine.verify("alice@acme.io").await;
        }
        assert_eq!(engine.reputation().stats("acme.io").map(|s| s.total), Some(6));
        assert!(engine.reputation().score("acme.io") > 0);
    }

    #[tokio::test]
    async fn identical_inputs_yield_identical_signals() {
        let engine = engine(one_mx, bare_infra(), smtp_result(SmtpStatus::Deliverable));
        let first = engine.verify("alice@acme.io").await;
        let second = engine.verify("alice@acme.io").await;
        assert_eq!(first.status, second.status);
        assert_eq!(first.score, second.score);
        assert_eq!(first.reason, second.reason);
        assert_eq!(first.signals.smtp, second.signals.smtp);
    }
}
