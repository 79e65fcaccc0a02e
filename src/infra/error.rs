use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraProbeError {
    #[error("TXT lookup for {name} failed: {source}")]
    TxtLookup {
        name: String,
        #[source]
        source: trust_dns_resolver::error::ResolveError,
    },
}

impl InfraProbeError {
    pub(crate) fn txt_lookup(name: &str, source: trust_dns_resolver::error::ResolveError) -> Self {
        Self::TxtLookup {
            name: name.to_string(),
            source,
        }
    }
}
