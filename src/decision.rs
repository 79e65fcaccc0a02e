//! The decision engine: a deterministic precedence ladder over the signal
//! bag. First matching rule wins; no suspension points in here.

use serde::{Deserialize, Serialize};

use crate::classify::{LocalClass, UsernameStrength};
use crate::infra::DomainInfra;
use crate::smtp::{SmtpProbeResult, SmtpStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictStatus {
    Deliverable,
    Undeliverable,
    Risky,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub status: VerdictStatus,
    pub score: u8,
    pub reason: String,
}

impl Verdict {
    fn new(status: VerdictStatus, score: u8, reason: &str) -> Self {
        Self {
            status,
            score,
            reason: reason.to_string(),
        }
    }
}

/// Everything the pipeline learned about one address. Heterogeneous by
/// nature; absent probes stay `None` and the ladder works around them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signals {
    pub email: String,
    pub domain: String,
    pub syntax_valid: bool,
    pub is_disposable: bool,
    pub is_role: bool,
    pub is_free_provider: bool,
    pub is_private_relay: bool,
    pub alias_tag: Option<String>,
    pub local_class: Option<LocalClass>,
    pub username_strength: UsernameStrength,
    pub smtp: Option<SmtpProbeResult>,
    pub infra: Option<DomainInfra>,
}

impl Signals {
    pub fn invalid_syntax(email: &str) -> Self {
        Self {
            email: email.to_string(),
            domain: String::new(),
            syntax_valid: false,
            is_disposable: false,
            is_role: false,
            is_free_provider: false,
            is_private_relay: false,
            alias_tag: None,
            local_class: None,
            username_strength: UsernameStrength::Normal,
            smtp: None,
            infra: None,
        }
    }

    fn smtp_status(&self) -> Option<SmtpStatus> {
        self.smtp.as_ref().map(|s| s.smtp_status)
    }

    fn is_catch_all(&self) -> bool {
        self.smtp.as_ref().is_some_and(|s| s.is_catch_all)
    }

    fn smtp_timed_out(&self) -> bool {
        self.smtp.as_ref().is_some_and(|s| s.timed_out)
    }
}

/// Web-presence confidence for the commercial promotion rule.
fn web_confidence(infra: &DomainInfra) -> i32 {
    let Some(web) = &infra.web else {
        return 0;
    };
    let mut confidence = 0;
    if web.has_website {
        confidence += 30;
    }
    if web.https {
        confidence += 10;
    }
    if web.title.is_some() {
        confidence += 10;
    }
    if web.meta_description.is_some() {
        confidence += 10;
    }
    if web.has_favicon {
        confidence += 10;
    }
    if web.parking {
        confidence -= 30;
    }
    confidence
}

/// Evaluate the ladder. SMTP evidence trumps heuristics when conclusive;
/// otherwise infrastructure confidence substitutes, with free providers
/// special-cased because RCPT verification is definitionally unavailable
/// there.
pub fn decide(signals: &Signals) -> Verdict {
    // 1. Hard evidence: the string is not an address.
    if !signals.syntax_valid {
        return Verdict::new(VerdictStatus::Undeliverable, 0, "Invalid syntax");
    }

    // 2. Disposable domains are always risky.
    if signals.is_disposable {
        return Verdict::new(VerdictStatus::Risky, 40, "Disposable domain");
    }

    // 3. Server said the mailbox does not exist.
    if signals.smtp_status() == Some(SmtpStatus::Invalid) {
        return Verdict::new(VerdictStatus::Undeliverable, 10, "Mailbox does not exist");
    }

    // 4. Server accepted the target; only meaningful when the random
    //    probe was rejected, otherwise the acceptance proves nothing.
    if signals.smtp_status() == Some(SmtpStatus::Deliverable) && !signals.is_catch_all() {
        return Verdict::new(VerdictStatus::Deliverable, 95, "SMTP mailbox exists");
    }

    // 5. Accept-everything servers.
    if signals.is_catch_all() {
        return Verdict::new(VerdictStatus::Risky, 60, "Catch-all domain");
    }

    // 6. Shared mailboxes.
    if signals.is_role {
        return Verdict::new(VerdictStatus::Risky, 50, "Role-based email");
    }

    // 7. Free providers: never undeliverable on heuristics alone.
    if signals.is_free_provider {
        return match signals.username_strength {
            UsernameStrength::Weak => Verdict::new(
                VerdictStatus::Risky,
                55,
                "Low confidence username on free provider",
            ),
            UsernameStrength::Normal => Verdict::new(
                VerdictStatus::Deliverable,
                85,
                "Free provider heuristic deliverable",
            ),
            UsernameStrength::Strong => Verdict::new(
                VerdictStatus::Deliverable,
                95,
                "Free provider heuristic deliverable",
            ),
        };
    }

    // 8/9. SMTP inconclusive: domain-trust signals substitute when a web
    //      fingerprint was collected, otherwise a timeout is reported as
    //      such.
    if let Some(infra) = signals.infra.as_ref().filter(|i| i.web.is_some()) {
        let confidence = web_confidence(infra);
        if confidence >= 20 {
            let score = (70 + confidence).min(90) as u8;
            return Verdict::new(
                VerdictStatus::Deliverable,
                score,
                "High probability of delivery",
            );
        }
        return Verdict::new(VerdictStatus::Risky, 20, "Low domain trust");
    }

    if signals.smtp_timed_out() {
        return Verdict::new(VerdictStatus::Unknown, 30, "SMTP connection timeout");
    }

    // 10. Nothing conclusive anywhere.
    Verdict::new(VerdictStatus::Unknown, 25, "Insufficient data")
}
