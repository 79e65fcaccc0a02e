//! Validator module: RFC-subset syntax checks and address parsing.

mod domain;
mod local;
mod types;

pub use types::{EmailError, ParsedEmail, ValidationReport};

use domain::check_domain;
use local::check_local;

/// Validate the **format** of an email address (no MX/SMTP).
///
/// Returns a `ValidationReport` detailing the reasons on invalidation.
///
/// # Examples
/// ```
/// use mailverdict::validator::validate_email;
/// let r = validate_email("alice@example.com");
/// assert!(r.ok);
/// ```
pub fn validate_email(email: &str) -> ValidationReport {
    let parsed = parse_email(email);
    ValidationReport {
        ok: parsed.valid,
        reasons: parsed.reasons,
    }
}

/// Parse and validate an address into its `(local, domain)` parts.
///
/// The returned record only carries non-empty parts when `valid` is true;
/// the rest of the pipeline must not advance an invalid record.
pub fn parse_email(email: &str) -> ParsedEmail {
    let input = email.trim();

    let mut reasons = Vec::new();

    // RFC 5321: 254 max including the '@'
    if input.len() > 254 {
        reasons.push(format!("total length {} > 254", input.len()));
    }

    let parts: Vec<&str> = input.split('@').collect();
    if parts.len() != 2 {
        reasons.push("must contain exactly one '@'".to_string());
        return ParsedEmail::invalid(input, reasons);
    }
    let (local, domain) = (parts[0], parts[1]);

    check_local(local, &mut reasons);
    let ascii_domain = check_domain(domain, &mut reasons);

    if !reasons.is_empty() {
        return ParsedEmail::invalid(input, reasons);
    }

    ParsedEmail {
        original: input.to_string(),
        local: local.to_string(),
        domain: domain.to_ascii_lowercase(),
        ascii_domain,
        valid: true,
        reasons: Vec::new(),
    }
}
