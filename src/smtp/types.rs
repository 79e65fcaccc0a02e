use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmtpStatus {
    Deliverable,
    Invalid,
    Unknown,
}

/// Outcome of probing one address through one SMTP session.
///
/// `is_catch_all`, `anti_spam` and `server_banner` are session-level
/// observations shared by every address in the same batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmtpProbeResult {
    pub smtp_status: SmtpStatus,
    pub code: u16,
    pub message: String,
    pub mx_host: String,
    pub is_catch_all: bool,
    pub anti_spam: bool,
    pub greylisted: bool,
    pub timed_out: bool,
    pub duration_ms: u64,
    pub server_banner: Option<String>,
    pub server_provider: Option<String>,
}

impl SmtpProbeResult {
    pub(crate) fn unknown(message: impl Into<String>) -> Self {
        Self {
            smtp_status: SmtpStatus::Unknown,
            code: 0,
            message: message.into(),
            mx_host: String::new(),
            is_catch_all: false,
            anti_spam: false,
            greylisted: false,
            timed_out: false,
            duration_ms: 0,
            server_banner: None,
            server_provider: None,
        }
    }

    /// Privacy short-circuit: large consumer providers never reveal mailbox
    /// existence, so no network I/O is attempted.
    pub fn privacy_protected() -> Self {
        Self::unknown("Domain does not support SMTP verification (privacy protected).")
    }

    pub fn circuit_open() -> Self {
        Self::unknown("circuit-open")
    }

    pub fn rate_limited() -> Self {
        Self::unknown("rate-limited")
    }

    pub fn is_conclusive(&self) -> bool {
        matches!(self.smtp_status, SmtpStatus::Deliverable | SmtpStatus::Invalid)
    }
}

/// RCPT reply classification: 2xx accepted, 450/451 greylisting,
/// 550/551/553 no such mailbox, everything else inconclusive.
pub(crate) fn classify_rcpt(code: u16) -> (SmtpStatus, bool) {
    match code {
        200..=299 => (SmtpStatus::Deliverable, false),
        450 | 451 => (SmtpStatus::Unknown, true),
        550 | 551 | 553 => (SmtpStatus::Invalid, false),
        _ => (SmtpStatus::Unknown, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rcpt_classification_table() {
        assert_eq!(classify_rcpt(250), (SmtpStatus::Deliverable, false));
        assert_eq!(classify_rcpt(251), (SmtpStatus::Deliverable, false));
        assert_eq!(classify_rcpt(450), (SmtpStatus::Unknown, true));
        assert_eq!(classify_rcpt(451), (SmtpStatus::Unknown, true));
        assert_eq!(classify_rcpt(452), (SmtpStatus::Unknown, false));
        assert_eq!(classify_rcpt(550), (SmtpStatus::Invalid, false));
        assert_eq!(classify_rcpt(551), (SmtpStatus::Invalid, false));
        assert_eq!(classify_rcpt(553), (SmtpStatus::Invalid, false));
        assert_eq!(classify_rcpt(554), (SmtpStatus::Unknown, false));
        assert_eq!(classify_rcpt(421), (SmtpStatus::Unknown, false));
    }
}
