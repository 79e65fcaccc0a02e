use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebStatus {
    Active,
    Parking,
    None,
}

/// What the landing page told us, feeding the commercial promotion rule.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WebFingerprint {
    pub has_website: bool,
    pub http_status: Option<u16>,
    pub https: bool,
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub has_favicon: bool,
    pub parking: bool,
}

/// Best-effort snapshot of a domain's mail/web infrastructure.
/// Every probe degrades to its zero value on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainInfra {
    pub domain: String,
    pub domain_age_days: Option<i64>,
    pub has_spf: bool,
    pub has_dmarc: bool,
    pub web_status: WebStatus,
    pub https: bool,
    pub web: Option<WebFingerprint>,
}

impl DomainInfra {
    pub fn empty(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            domain_age_days: None,
            has_spf: false,
            has_dmarc: false,
            web_status: WebStatus::None,
            https: false,
            web: None,
        }
    }
}
