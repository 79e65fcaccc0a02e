//! Domain infrastructure probing: SPF/DMARC records, WHOIS age, web
//! presence, HTTPS reachability. Every probe is best-effort and degrades
//! to its zero value; the combined snapshot feeds decision and scoring.

mod error;
pub mod score;
mod types;
mod web;
mod whois;

pub use error::InfraProbeError;
pub use score::{InfraScore, score_domain_infra};
pub use types::{DomainInfra, WebFingerprint, WebStatus};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use trust_dns_resolver::TokioAsyncResolver;
use trust_dns_resolver::error::ResolveErrorKind;

pub const TXT_LIFETIME: Duration = Duration::from_secs(4);
pub const TLS_TIMEOUT: Duration = Duration::from_secs(3);
pub const WHOIS_TIMEOUT: Duration = Duration::from_secs(4);

#[async_trait]
pub trait LookupTxt: Send + Sync {
    /// TXT records at `name`; NXDOMAIN/NoAnswer map to an empty list.
    async fn lookup_txt(&self, name: &str) -> Result<Vec<String>, InfraProbeError>;
}

/// System-configured TXT lookups with a bounded lifetime.
pub struct DnsTxt {
    resolver: TokioAsyncResolver,
    lifetime: Duration,
}

impl DnsTxt {
    pub fn from_system_conf(lifetime: Duration) -> Result<Self, InfraProbeError> {
        let (config, mut opts) = trust_dns_resolver::system_conf::read_system_conf()
            .map_err(|err| InfraProbeError::txt_lookup("system-conf", err.into()))?;
        opts.timeout = lifetime;
        Ok(Self {
            resolver: TokioAsyncResolver::tokio(config, opts),
            lifetime,
        })
    }
}

#[async_trait]
impl LookupTxt for DnsTxt {
    async fn lookup_txt(&self, name: &str) -> Result<Vec<String>, InfraProbeError> {
        let lookup = match tokio::time::timeout(self.lifetime, self.resolver.txt_lookup(name)).await
        {
            Ok(lookup) => lookup,
            Err(_) => return Ok(Vec::new()),
        };
        match lookup {
            Ok(lookup) => Ok(lookup
                .iter()
                .map(|txt| {
                    txt.txt_data()
                        .iter()
                        .map(|piece| String::from_utf8_lossy(piece).into_owned())
                        .collect::<String>()
                })
                .collect()),
            Err(err) => match err.kind() {
                ResolveErrorKind::NoRecordsFound { .. } => Ok(Vec::new()),
                _ => Err(InfraProbeError::txt_lookup(name, err)),
            },
        }
    }
}

fn starts_with_ignore_ascii_case(input: &str, prefix: &str) -> bool {
    input
        .get(..prefix.len())
        .map(|head| head.eq_ignore_ascii_case(prefix))
        .unwrap_or(false)
}

pub(crate) fn has_spf_record(records: &[String]) -> bool {
    records
        .iter()
        .any(|record| starts_with_ignore_ascii_case(record.trim(), "v=spf1"))
}

pub(crate) fn has_dmarc_record(records: &[String]) -> bool {
    records
        .iter()
        .any(|record| starts_with_ignore_ascii_case(record.trim(), "v=dmarc1"))
}

#[async_trait]
pub trait InfraProber: Send + Sync {
    async fn probe(&self, domain: &str) -> DomainInfra;
}

/// The production prober: DNS TXT + HTTP landing page + WHOIS + TLS
/// handshake, all issued concurrently with individual timeouts.
pub struct NetInfraProber {
    txt: Arc<dyn LookupTxt>,
    client: Option<reqwest::Client>,
}

impl NetInfraProber {
    pub fn from_system_conf() -> Result<Self, InfraProbeError> {
        Ok(Self::new(Arc::new(DnsTxt::from_system_conf(TXT_LIFETIME)?)))
    }

    pub fn new(txt: Arc<dyn LookupTxt>) -> Self {
        Self {
            txt,
            client: web::build_client(),
        }
    }

    async fn probe_spf(&self, domain: &str) -> bool {
        match self.txt.lookup_txt(domain).await {
            Ok(records) => has_spf_record(&records),
            Err(err) => {
                tracing::debug!(domain, error = %err, "SPF probe failed");
                false
            }
        }
    }

    async fn probe_dmarc(&self, domain: &str) -> bool {
        let name = format!("_dmarc.{domain}");
        match self.txt.lookup_txt(&name).await {
            Ok(records) => has_dmarc_record(&records),
            Err(err) => {
                tracing::debug!(domain, error = %err, "DMARC probe failed");
                false
            }
        }
    }

    async fn probe_web(&self, domain: &str) -> (Option<WebFingerprint>, WebStatus) {
        let Some(client) = &self.client else {
            return (None, WebStatus::None);
        };
        let (fingerprint, body_len) = web::fetch_fingerprint(client, domain).await;
        let status = if fingerprint.parking {
            WebStatus::Parking
        } else if matches!(fingerprint.http_status, Some(code) if code < 500)
            && web::body_is_substantial(body_len)
        {
            WebStatus::Active
        } else {
            WebStatus::None
        };
        (Some(fingerprint), status)
    }
}

#[async_trait]
impl InfraProber for NetInfraProber {
    async fn probe(&self, domain: &str) -> DomainInfra {
        let (has_spf, has_dmarc, (web, web_status), https, domain_age_days) = tokio::join!(
            self.probe_spf(domain),
            self.probe_dmarc(domain),
            self.probe_web(domain),
            https_reachable(domain, TLS_TIMEOUT),
            whois::domain_age_days(domain, WHOIS_TIMEOUT),
        );

        DomainInfra {
            domain: domain.to_string(),
            domain_age_days,
            has_spf,
            has_dmarc,
            web_status,
            https,
            web,
        }
    }
}

/// TLS handshake against port 443; certificate must validate for `domain`.
async fn https_reachable(domain: &str, timeout: Duration) -> bool {
    let attempt = async {
        let connector = native_tls::TlsConnector::new().ok()?;
        let connector = tokio_native_tls::TlsConnector::from(connector);
        let stream = TcpStream::connect((domain, 443)).await.ok()?;
        connector.connect(domain, stream).await.ok()?;
        Some(())
    };
    matches!(tokio::time::timeout(timeout, attempt).await, Ok(Some(())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spf_prefix_match() {
        assert!(has_spf_record(&["v=spf1 include:_spf.acme.io ~all".to_string()]));
        assert!(has_spf_record(&[" V=SPF1 -all".to_string()]));
        assert!(!has_spf_record(&["verification=abc123".to_string()]));
        assert!(!has_spf_record(&[]));
    }

    #[test]
    fn dmarc_prefix_match() {
        assert!(has_dmarc_record(&["v=DMARC1; p=reject".to_string()]));
        assert!(!has_dmarc_record(&["v=spf1 -all".to_string()]));
    }

    struct StubTxt {
        apex: Vec<String>,
        dmarc: Vec<String>,
    }

    #[async_trait]
    impl LookupTxt for StubTxt {
        async fn lookup_txt(&self, name: &str) -> Result<Vec<String>, InfraProbeError> {
            if name.starts_with("_dmarc.") {
                Ok(self.dmarc.clone())
            } else {
                Ok(self.apex.clone())
            }
        }
    }

    #[tokio::test]
    async fn spf_and_dmarc_probes_use_the_right_names() {
        let prober = NetInfraProber::new(Arc::new(StubTxt {
            apex: vec!["v=spf1 mx -all".to_string()],
            dmarc: vec!["v=DMARC1; p=none".to_string()],
        }));
        assert!(prober.probe_spf("acme.io").await);
        assert!(prober.probe_dmarc("acme.io").await);

        let bare = NetInfraProber::new(Arc::new(StubTxt {
            apex: vec![],
            dmarc: vec![],
        }));
        assert!(!bare.probe_spf("acme.io").await);
        assert!(!bare.probe_dmarc("acme.io").await);
    }
}
