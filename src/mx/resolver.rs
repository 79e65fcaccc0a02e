use std::time::Duration;

use async_trait::async_trait;
use trust_dns_resolver::TokioAsyncResolver;
use trust_dns_resolver::error::{ResolveError, ResolveErrorKind};

use super::MxRecord;
use super::error::MxLookupError;

/// Hostname substrings that mark a parked or junk MX set. A match fails
/// the whole lookup rather than downgrading it.
const PARKING_KEYWORDS: &[&str] = &["example.com", "invalid", "parking", "localhost"];

pub(crate) fn normalize_domain(domain: &str) -> Result<String, MxLookupError> {
    let trimmed = domain.trim();
    if trimmed.is_empty() {
        return Err(MxLookupError::EmptyDomain);
    }
    idna::domain_to_ascii(trimmed).map_err(MxLookupError::idna)
}

pub(crate) fn normalize_exchange(exchange: String) -> String {
    exchange.trim_end_matches('.').to_ascii_lowercase()
}

#[async_trait]
pub trait LookupMx: Send + Sync {
    /// Raw MX records for `domain`. NoAnswer/NXDOMAIN map to an empty list.
    async fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, MxLookupError>;

    /// Whether `domain` itself resolves to an address (implicit-MX fallback).
    async fn lookup_a(&self, domain: &str) -> Result<bool, MxLookupError>;
}

/// Resolve the ordered MX record set for `ascii_domain`.
///
/// Records are sorted by ascending preference then host. An empty MX set
/// falls back to a single synthetic `(0, domain)` record when the domain
/// has an address record; otherwise the empty list is returned and the
/// caller decides what that means.
pub(crate) async fn resolve_with<R: LookupMx + ?Sized>(
    resolver: &R,
    ascii_domain: &str,
) -> Result<Vec<MxRecord>, MxLookupError> {
    let mut records = resolver.lookup_mx(ascii_domain).await?;

    records.sort();
    records.dedup();

    for record in &records {
        if let Some(keyword) = PARKING_KEYWORDS
            .iter()
            .find(|k| record.exchange.contains(*k))
        {
            tracing::debug!(
                domain = ascii_domain,
                exchange = %record.exchange,
                keyword,
                "parking keyword in MX exchange"
            );
            return Err(MxLookupError::ParkedExchange {
                host: record.exchange.clone(),
            });
        }
    }

    if records.is_empty() && resolver.lookup_a(ascii_domain).await? {
        records.push(MxRecord::new(0, ascii_domain));
    }

    Ok(records)
}

/// System-configured Tokio resolver with a bounded lookup lifetime.
pub struct DnsMx {
    resolver: TokioAsyncResolver,
    lifetime: Duration,
}

impl DnsMx {
    pub fn from_system_conf(lifetime: Duration) -> Result<Self, MxLookupError> {
        let (config, mut opts) = trust_dns_resolver::system_conf::read_system_conf()
            .map_err(|err| MxLookupError::resolver_init(err.into()))?;
        opts.timeout = lifetime;
        Ok(Self {
            resolver: TokioAsyncResolver::tokio(config, opts),
            lifetime,
        })
    }

    fn map_lookup_err(
        &self,
        domain: &str,
        err: ResolveError,
    ) -> Result<Vec<MxRecord>, MxLookupError> {
        match err.kind() {
            ResolveErrorKind::NoRecordsFound { .. } => Ok(Vec::new()),
            ResolveErrorKind::Timeout => Err(MxLookupError::Timeout {
                domain: domain.to_string(),
            }),
            _ => Err(MxLookupError::lookup(err)),
        }
    }
}

#[async_trait]
impl LookupMx for DnsMx {
    async fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, MxLookupError> {
        let lookup = tokio::time::timeout(self.lifetime, self.resolver.mx_lookup(domain))
            .await
            .map_err(|_| MxLookupError::Timeout {
                domain: domain.to_string(),
            })?;
        match lookup {
            Ok(lookup) => Ok(lookup
                .iter()
                .map(|mx| MxRecord::new(mx.preference(), normalize_exchange(mx.exchange().to_utf8())))
                .collect()),
            Err(err) => self.map_lookup_err(domain, err),
        }
    }

    async fn lookup_a(&self, domain: &str) -> Result<bool, MxLookupError> {
        let lookup = tokio::time::timeout(self.lifetime, self.resolver.lookup_ip(domain))
            .await
            .map_err(|_| MxLookupError::Timeout {
                domain: domain.to_string(),
            })?;
        match lookup {
            Ok(addrs) => Ok(addrs.iter().next().is_some()),
            Err(err) => match err.kind() {
                ResolveErrorKind::NoRecordsFound { .. } => Ok(false),
                ResolveErrorKind::Timeout => Err(MxLookupError::Timeout {
                    domain: domain.to_string(),
                }),
                _ => Err(MxLookupError::lookup(err)),
            },
        }
    }
}
