//! Heuristic classification of local parts and domains.
//!
//! Nothing here touches the network; these are the static signals the
//! decision engine combines with DNS/SMTP/infra evidence.

mod sets;

pub use sets::{DISPOSABLE_DOMAINS, FREE_PROVIDERS, NON_VERIFIABLE_DOMAINS, ROLE_ACCOUNTS};

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use sets::{
    COMMON_HUMAN_NAMES, GENERIC_TEST_NAMES, INSTITUTIONAL_TLDS, PRIVATE_RELAY_PROVIDERS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalClass {
    Role,
    Generic,
    Human,
    Random,
}

/// Confidence that a local part names a real person, used by the
/// free-provider decision rule where SMTP verification is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsernameStrength {
    Weak,
    Normal,
    Strong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainKind {
    UnverifiablePersonal,
    Institutional,
    Business,
    Disposable,
    PrivateRelay,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainClass {
    pub provider: String,
    pub kind: DomainKind,
    pub smtp_verifiable: bool,
}

static HUMAN_DOTTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{3,}\.[a-z]{3,}$").expect("static regex"));
static HUMAN_PLAIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{4,}$").expect("static regex"));
static RANDOM_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{2,}").expect("static regex"));
static RANDOM_INFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z]\d+[a-z]").expect("static regex"));

/// Classify a local part into role/generic/human/random.
pub fn classify_local(local: &str) -> LocalClass {
    let local = local.trim().to_ascii_lowercase();

    if ROLE_ACCOUNTS.contains(local.as_str()) {
        return LocalClass::Role;
    }
    if GENERIC_TEST_NAMES.contains(local.as_str()) {
        return LocalClass::Generic;
    }
    if COMMON_HUMAN_NAMES.contains(local.as_str()) {
        return LocalClass::Human;
    }
    if HUMAN_DOTTED.is_match(&local) || HUMAN_PLAIN.is_match(&local) {
        return LocalClass::Human;
    }
    if RANDOM_DIGITS.is_match(&local) || RANDOM_INFIX.is_match(&local) {
        return LocalClass::Random;
    }
    LocalClass::Generic
}

pub fn username_strength(class: LocalClass) -> UsernameStrength {
    match class {
        LocalClass::Human => UsernameStrength::Strong,
        LocalClass::Random => UsernameStrength::Weak,
        LocalClass::Role | LocalClass::Generic => UsernameStrength::Normal,
    }
}

/// Classify a domain; suffix matches cover subdomains of the static sets.
pub fn classify_domain(domain: &str) -> DomainClass {
    let domain = domain.to_ascii_lowercase();

    if let Some(provider) = disposable_provider(&domain) {
        return DomainClass {
            provider: provider.to_string(),
            kind: DomainKind::Disposable,
            smtp_verifiable: false,
        };
    }

    if let Some(provider) = private_relay_provider(&domain) {
        return DomainClass {
            provider: provider.to_string(),
            kind: DomainKind::PrivateRelay,
            smtp_verifiable: true,
        };
    }

    if FREE_PROVIDERS.contains(domain.as_str()) {
        return DomainClass {
            provider: domain,
            kind: DomainKind::UnverifiablePersonal,
            smtp_verifiable: false,
        };
    }

    if INSTITUTIONAL_TLDS.iter().any(|tld| domain.ends_with(tld)) {
        return DomainClass {
            provider: domain,
            kind: DomainKind::Institutional,
            smtp_verifiable: false,
        };
    }

    DomainClass {
        provider: domain,
        kind: DomainKind::Business,
        smtp_verifiable: true,
    }
}

pub fn is_disposable(domain: &str) -> bool {
    disposable_provider(&domain.to_ascii_lowercase()).is_some()
}

fn disposable_provider(domain: &str) -> Option<&'static str> {
    DISPOSABLE_DOMAINS
        .iter()
        .find(|d| domain == **d || domain.ends_with(&format!(".{d}")))
        .copied()
}

fn private_relay_provider(domain: &str) -> Option<&'static str> {
    PRIVATE_RELAY_PROVIDERS
        .entries()
        .find(|(d, _)| domain == **d || domain.ends_with(&format!(".{d}")))
        .map(|(_, provider)| *provider)
}

/// Plus-addressing tag, if any ("user+tag" -> "tag").
pub fn alias_tag(local: &str) -> Option<String> {
    local.split_once('+').map(|(_, tag)| tag.to_string())
}

/// Guess the mail provider behind an SMTP banner.
pub fn fingerprint_server(banner: &str) -> Option<&'static str> {
    const PATTERNS: &[(&str, &[&str])] = &[
        ("google", &["gmail", "google", "mx.google.com"]),
        ("outlook", &["outlook", "hotmail", "protection.outlook.com"]),
        ("zoho", &["zoho"]),
        ("protonmail", &["protonmail"]),
        ("yahoo", &["yahoo"]),
    ];
    let banner = banner.to_ascii_lowercase();
    PATTERNS
        .iter()
        .find(|(_, needles)| needles.iter().any(|n| banner.contains(n)))
        .map(|(provider, _)| *provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_accounts() {
        assert_eq!(classify_local("admin"), LocalClass::Role);
        assert_eq!(classify_local("Support"), LocalClass::Role);
        assert_eq!(classify_local("newsletter"), LocalClass::Role);
    }

    #[test]
    fn generic_test_users_before_human_pattern() {
        // "test" also matches the 4+ lowercase human pattern; the curated
        // set takes precedence.
        assert_eq!(classify_local("test"), LocalClass::Generic);
        assert_eq!(classify_local("demo"), LocalClass::Generic);
        assert_eq!(classify_local("nobody"), LocalClass::Generic);
    }

    #[test]
    fn human_patterns() {
        assert_eq!(classify_local("john.smith"), LocalClass::Human);
        assert_eq!(classify_local("maria"), LocalClass::Human);
        assert_eq!(classify_local("jonathan"), LocalClass::Human);
    }

    #[test]
    fn random_patterns() {
        assert_eq!(classify_local("xjk92z3q"), LocalClass::Random);
        assert_eq!(classify_local("a1b"), LocalClass::Random);
        assert_eq!(classify_local("user42"), LocalClass::Random);
    }

    #[test]
    fn short_fallback_is_generic() {
        assert_eq!(classify_local("ab"), LocalClass::Generic);
    }

    #[test]
    fn strength_mapping() {
        assert_eq!(username_strength(LocalClass::Human), UsernameStrength::Strong);
        assert_eq!(username_strength(LocalClass::Random), UsernameStrength::Weak);
        assert_eq!(username_strength(LocalClass::Generic), UsernameStrength::Normal);
    }

    #[test]
    fn free_provider_not_verifiable() {
        let class = classify_domain("gmail.com");
        assert_eq!(class.kind, DomainKind::UnverifiablePersonal);
        assert!(!class.smtp_verifiable);
    }

    #[test]
    fn institutional_tld() {
        let class = classify_domain("cs.stanford.edu");
        assert_eq!(class.kind, DomainKind::Institutional);
        assert!(!class.smtp_verifiable);
    }

    #[test]
    fn disposable_suffix_match() {
        assert!(is_disposable("mailinator.com"));
        assert!(is_disposable("mx.mailinator.com"));
        assert!(!is_disposable("notmailinator.com"));
        assert_eq!(classify_domain("yopmail.com").kind, DomainKind::Disposable);
    }

    #[test]
    fn private_relay() {
        let class = classify_domain("privaterelay.appleid.com");
        assert_eq!(class.kind, DomainKind::PrivateRelay);
        assert_eq!(class.provider, "apple");
    }

    #[test]
    fn business_fallback() {
        let class = classify_domain("acme.io");
        assert_eq!(class.kind, DomainKind::Business);
        assert!(class.smtp_verifiable);
    }

    #[test]
    fn alias_detection() {
        assert_eq!(alias_tag("user+news"), Some("news".to_string()));
        assert_eq!(alias_tag("user"), None);
    }

    #[test]
    fn banner_fingerprint() {
        assert_eq!(
            fingerprint_server("220 mx.google.com ESMTP ready"),
            Some("google")
        );
        assert_eq!(fingerprint_server("220 smtp.example.com"), None);
    }
}
