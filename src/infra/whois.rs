use std::time::Duration;

use chrono::{NaiveDate, Utc};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

const WHOIS_PORT: u16 = 43;
const IANA_WHOIS: &str = "whois.iana.org";
const MAX_RESPONSE: usize = 64 * 1024;

const CREATION_KEYS: &[&str] = &[
    "creation date:",
    "created:",
    "created on:",
    "registered on:",
    "registration time:",
];

/// Age of the domain registration in days, via a two-step WHOIS dialogue
/// (IANA referral, then the TLD registry). Best effort: any failure is `None`.
pub(crate) async fn domain_age_days(domain: &str, timeout: Duration) -> Option<i64> {
    let tld = domain.rsplit('.').next()?;
    let referral = query(IANA_WHOIS, tld, timeout).await?;
    let server = referral
        .lines()
        .find_map(|line| line.strip_prefix("whois:"))
        .map(|value| value.trim().to_string())?;

    let response = query(&server, domain, timeout).await?;
    let created = parse_creation_date(&response)?;
    Some((Utc::now().date_naive() - created).num_days())
}

async fn query(server: &str, name: &str, timeout: Duration) -> Option<String> {
    let attempt = async {
        let mut stream = TcpStream::connect((server, WHOIS_PORT)).await.ok()?;
        stream
            .write_all(format!("{name}\r\n").as_bytes())
            .await
            .ok()?;
        let mut raw = Vec::new();
        let mut buf = [0u8; 2048];
        loop {
            match stream.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    raw.extend_from_slice(&buf[..n]);
                    if raw.len() >= MAX_RESPONSE {
                        break;
                    }
                }
                Err(_) => return None,
            }
        }
        Some(String::from_utf8_lossy(&raw).into_owned())
    };
    tokio::time::timeout(timeout, attempt).await.ok()?
}

pub(crate) fn parse_creation_date(response: &str) -> Option<NaiveDate> {
    for line in response.lines() {
        let lower = line.trim().to_ascii_lowercase();
        let Some(key) = CREATION_KEYS.iter().find(|k| lower.starts_with(**k)) else {
            continue;
        };
        let value = line.trim()[key.len()..].trim();
        if let Some(date) = parse_date(value) {
            return Some(date);
        }
    }
    None
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    // Registries disagree on formats; try the common ones.
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }
    let day = value.split_whitespace().next().unwrap_or(value);
    let day = day.split('T').next().unwrap_or(day);
    for format in ["%Y-%m-%d", "%d-%b-%Y", "%Y.%m.%d", "%d/%m/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(day, format) {
            return Some(date);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_icann_style() {
        let response = "Domain Name: ACME.IO\nCreation Date: 2015-03-20T09:30:00Z\n";
        assert_eq!(
            parse_creation_date(response),
            NaiveDate::from_ymd_opt(2015, 3, 20)
        );
    }

    #[test]
    fn parses_legacy_style() {
        let response = "   created:      1997-09-15\n";
        assert_eq!(
            parse_creation_date(response),
            NaiveDate::from_ymd_opt(1997, 9, 15)
        );
    }

    #[test]
    fn parses_nominet_style() {
        let response = "Registered on: 11-Feb-2004\n";
        assert_eq!(
            parse_creation_date(response),
            NaiveDate::from_ymd_opt(2004, 2, 11)
        );
    }

    #[test]
    fn missing_date_is_none() {
        assert_eq!(parse_creation_date("No match for domain"), None);
    }
}
