use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub ok: bool,
    pub reasons: Vec<String>,
}

/// A submitted address after syntactic acceptance.
///
/// `local` and `domain` are only non-empty when `valid` is true; nothing
/// downstream of the syntax stage may consume an invalid record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedEmail {
    pub original: String,
    pub local: String,
    pub domain: String,
    pub ascii_domain: String,
    pub valid: bool,
    pub reasons: Vec<String>,
}

impl ParsedEmail {
    pub(crate) fn invalid(original: &str, reasons: Vec<String>) -> Self {
        Self {
            original: original.to_string(),
            local: String::new(),
            domain: String::new(),
            ascii_domain: String::new(),
            valid: false,
            reasons,
        }
    }
}

#[derive(Error, Debug)]
pub enum EmailError {
    #[error("invalid format")]
    InvalidFormat,
    #[error("too long")]
    TooLong,
    #[error("{0}")]
    Other(String),
}
