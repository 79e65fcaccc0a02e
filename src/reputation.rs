//! Rolling per-domain reputation counters. Reported alongside results but
//! deliberately not consulted by the decision engine yet.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decision::VerdictStatus;

/// Minimum observations before the score means anything.
const MIN_SAMPLES: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustLevel {
    High,
    Medium,
    Low,
    Unknown,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomainStats {
    pub total: u64,
    pub deliverable: u64,
    pub undeliverable: u64,
    pub risky: u64,
    pub unknown: u64,
    pub last_seen: Option<DateTime<Utc>>,
}

#[derive(Default)]
pub struct ReputationStore {
    domains: Mutex<HashMap<String, DomainStats>>,
}

impl ReputationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, domain: &str, status: VerdictStatus) {
        let mut domains = self.domains.lock().expect("reputation map poisoned");
        let stats = domains.entry(domain.to_ascii_lowercase()).or_default();
        stats.total += 1;
        stats.last_seen = Some(Utc::now());
        match status {
            VerdictStatus::Deliverable => stats.deliverable += 1,
            VerdictStatus::Undeliverable => stats.undeliverable += 1,
            VerdictStatus::Risky => stats.risky += 1,
            VerdictStatus::Unknown => stats.unknown += 1,
        }
    }

    pub fn stats(&self, domain: &str) -> Option<DomainStats> {
        let domains = self.domains.lock().expect("reputation map poisoned");
        domains.get(&domain.to_ascii_lowercase()).cloned()
    }

    /// `40·deliverable_ratio − 50·undeliverable_ratio − 20·risky_ratio`,
    /// zero until the domain has enough samples.
    pub fn score(&self, domain: &str) -> i32 {
        let Some(stats) = self.stats(domain) else {
            return 0;
        };
        if stats.total < MIN_SAMPLES {
            return 0;
        }
        let total = stats.total as f64;
        let deliverable = stats.deliverable as f64 / total;
        let undeliverable = stats.undeliverable as f64 / total;
        let risky = stats.risky as f64 / total;
        (40.0 * deliverable) as i32 - (50.0 * undeliverable) as i32 - (20.0 * risky) as i32
    }

    pub fn trust_level(&self, domain: &str) -> TrustLevel {
        let score = self.score(domain);
        if score >= 30 {
            TrustLevel::High
        } else if score >= 10 {
            TrustLevel::Medium
        } else if score > 0 {
            TrustLevel::Low
        } else {
            TrustLevel::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_below_minimum_samples() {
        let store = ReputationStore::new();
        for _ in 0..4 {
            store.record("acme.io", VerdictStatus::Deliverable);
        }
        assert_eq!(store.score("acme.io"), 0);
        assert_eq!(store.trust_level("acme.io"), TrustLevel::Unknown);
    }

    #[test]
    fn all_deliverable_is_high_trust() {
        let store = ReputationStore::new();
        for _ in 0..10 {
            store.record("acme.io", VerdictStatus::Deliverable);
        }
        assert_eq!(store.score("acme.io"), 40);
        assert_eq!(store.trust_level("acme.io"), TrustLevel::High);
    }

    #[test]
    fn undeliverable_drags_the_score_down() {
        let store = ReputationStore::new();
        for _ in 0..5 {
            store.record("acme.io", VerdictStatus::Deliverable);
        }
        for _ in 0..5 {
            store.record("acme.io", VerdictStatus::Undeliverable);
        }
        // 40*0.5 - 50*0.5 = -5
        assert_eq!(store.score("acme.io"), -5);
        assert_eq!(store.trust_level("acme.io"), TrustLevel::Unknown);
    }

    #[test]
    fn domains_are_case_insensitive() {
        let store = ReputationStore::new();
        for _ in 0..6 {
            store.record("ACME.io", VerdictStatus::Deliverable);
        }
        assert_eq!(store.trust_level("acme.IO"), TrustLevel::High);
        assert_eq!(store.stats("acme.io").map(|s| s.total), Some(6));
    }

    #[test]
    fn unknown_counts_do_not_move_the_score() {
        let store = ReputationStore::new();
        for _ in 0..3 {
            store.record("acme.io", VerdictStatus::Deliverable);
        }
        for _ in 0..3 {
            store.record("acme.io", VerdictStatus::Unknown);
        }
        // 40*0.5 = 20
        assert_eq!(store.score("acme.io"), 20);
        assert_eq!(store.trust_level("acme.io"), TrustLevel::Medium);
    }
}
