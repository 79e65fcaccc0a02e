use std::time::Instant;

use rand::Rng;

use crate::classify::{NON_VERIFIABLE_DOMAINS, fingerprint_server};
use crate::smtp::error::SmtpProbeError;
use crate::smtp::options::SmtpProbeOptions;
use crate::smtp::pool::SmtpPool;
use crate::smtp::session::SmtpSession;
use crate::smtp::types::{SmtpProbeResult, SmtpStatus, classify_rcpt};

/// Port ladder: MX port first, then submission, then implicit TLS.
pub const SMTP_PORTS: [u16; 3] = [25, 587, 465];

const ANTI_SPAM_BANNERS: &[&str] = &["Proofpoint", "Barracuda", "Google Frontend", "Spamhaus"];

/// Probes of a whole batch against one domain.
#[derive(Debug)]
pub struct BatchOutcome {
    /// One result per input address, same order.
    pub results: Vec<SmtpProbeResult>,
    /// True when no session could be established or one died mid-dialogue;
    /// feeds the circuit breaker.
    pub transport_failure: bool,
}

impl BatchOutcome {
    fn all(count: usize, result: SmtpProbeResult, transport_failure: bool) -> Self {
        Self {
            results: vec![result; count],
            transport_failure,
        }
    }
}

/// Random local part for the catch-all probe: 12 lowercase letters keep the
/// collision probability around 1 in 26^12.
pub(crate) fn random_local_part() -> String {
    let mut rng = rand::thread_rng();
    (0..12).map(|_| rng.gen_range(b'a'..=b'z') as char).collect()
}

fn banner_is_anti_spam(banner: &str) -> bool {
    ANTI_SPAM_BANNERS.iter().any(|vendor| banner.contains(vendor))
}

/// Verify a batch of same-domain addresses without sending a message.
///
/// One SMTP session carries the whole batch: a single MAIL FROM, one RCPT
/// per address, and one RCPT for a random local part (the catch-all
/// probe). MX hosts are tried in preference order, ports in ladder order;
/// transport failures move to the next port, protocol verdicts are final.
pub async fn probe_batch(
    pool: &SmtpPool,
    domain: &str,
    mx_hosts: &[String],
    emails: &[String],
) -> BatchOutcome {
    let started = Instant::now();

    if NON_VERIFIABLE_DOMAINS.contains(domain) {
        return BatchOutcome::all(emails.len(), SmtpProbeResult::privacy_protected(), false);
    }

    if mx_hosts.is_empty() {
        return BatchOutcome::all(
            emails.len(),
            SmtpProbeResult::unknown("no MX host available"),
            false,
        );
    }

    let options = pool.options().clone();
    let mut last_error: Option<SmtpProbeError> = None;
    let mut timed_out = false;

    for host in mx_hosts.iter().take(options.max_mx.max(1)) {
        for port in SMTP_PORTS {
            let session = match pool.acquire(host, port).await {
                Ok(session) => session,
                Err(err) => {
                    tracing::debug!(domain, host = %host, port, error = %err, "smtp connect failed");
                    timed_out |= err.is_timeout();
                    last_error = Some(err);
                    continue;
                }
            };

            match run_session(pool, &options, session, host, port, domain, emails, started).await
            {
                Ok(outcome) => return outcome,
                Err(err) => {
                    tracing::debug!(domain, host = %host, port, error = %err, "smtp session died");
                    timed_out |= err.is_timeout();
                    last_error = Some(err);
                }
            }
        }
    }

    let message = last_error
        .map(|err| err.to_string())
        .unwrap_or_else(|| "no server responded".to_string());
    let mut result = SmtpProbeResult::unknown(message);
    result.timed_out = timed_out;
    result.mx_host = mx_hosts[0].clone();
    result.duration_ms = started.elapsed().as_millis() as u64;
    BatchOutcome::all(emails.len(), result, true)
}

#[allow(clippy::too_many_arguments)]
async fn run_session(
    pool: &SmtpPool,
    options: &SmtpProbeOptions,
    mut session: SmtpSession,
    host: &str,
    port: u16,
    domain: &str,
    emails: &[String],
    started: Instant,
) -> Result<BatchOutcome, SmtpProbeError> {
    let banner = session.banner.clone().unwrap_or_default();
    let provider = fingerprint_server(&banner).map(str::to_string);

    let base = SmtpProbeResult {
        smtp_status: SmtpStatus::Unknown,
        code: 0,
        message: String::new(),
        mx_host: host.to_string(),
        is_catch_all: false,
        anti_spam: false,
        greylisted: false,
        timed_out: false,
        duration_ms: 0,
        server_banner: Some(banner.clone()),
        server_provider: provider,
    };

    if banner_is_anti_spam(&banner) {
        pool.release(host, port, session).await;
        let mut result = base;
        result.anti_spam = true;
        result.message = "Anti-spam gateway detected from banner.".to_string();
        result.duration_ms = started.elapsed().as_millis() as u64;
        return Ok(BatchOutcome::all(emails.len(), result, false));
    }

    let mail_reply = session.mail_from(&options.mail_from).await?;
    if mail_reply.code >= 400 {
        // Server refuses the envelope entirely: RCPT results would be
        // meaningless, treat as anti-spam posture.
        let _ = session.rset().await;
        pool.release(host, port, session).await;
        let mut result = base;
        result.anti_spam = true;
        result.code = mail_reply.code;
        result.message = "Server rejected MAIL FROM (anti-spam).".to_string();
        result.duration_ms = started.elapsed().as_millis() as u64;
        return Ok(BatchOutcome::all(emails.len(), result, false));
    }

    let mut replies = Vec::with_capacity(emails.len());
    for email in emails {
        replies.push(session.rcpt_to(email).await?);
    }

    let random_rcpt = format!("{}@{}", random_local_part(), domain);
    let random_reply = session.rcpt_to(&random_rcpt).await?;
    let is_catch_all = random_reply.is_positive_completion();

    let _ = session.rset().await;
    pool.release(host, port, session).await;

    let duration_ms = started.elapsed().as_millis() as u64;
    let results = replies
        .into_iter()
        .map(|reply| {
            let (smtp_status, greylisted) = classify_rcpt(reply.code);
            SmtpProbeResult {
                smtp_status,
                code: reply.code,
                message: reply.text(),
                is_catch_all,
                greylisted,
                duration_ms,
                ..base.clone()
            }
        })
        .collect();

    Ok(BatchOutcome {
        results,
        transport_failure: false,
    })
}
