use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration knobs for SMTP probing sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmtpProbeOptions {
    /// EHLO/HELO identity presented to the server.
    pub helo_domain: String,
    /// Envelope sender for MAIL FROM; empty means the null sender.
    pub mail_from: String,
    /// How many MX hosts to try before giving up.
    pub max_mx: usize,
    #[serde(with = "duration_ms")]
    pub connect_timeout: Duration,
    #[serde(with = "duration_ms")]
    pub command_timeout: Duration,
    #[serde(with = "duration_ms")]
    pub tls_timeout: Duration,
}

impl Default for SmtpProbeOptions {
    fn default() -> Self {
        Self {
            helo_domain: "verifier.local".to_string(),
            mail_from: "verify@verifier.local".to_string(),
            max_mx: 2,
            connect_timeout: Duration::from_secs(4),
            command_timeout: Duration::from_secs(4),
            tls_timeout: Duration::from_secs(3),
        }
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
