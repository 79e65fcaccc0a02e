use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::error::MxLookupError;
use super::resolver::{self, LookupMx};
use super::{MxRecord, MxResolver};

type LookupResult = Result<Vec<MxRecord>, MxLookupError>;
type LookupFn = dyn Fn(&str) -> LookupResult + Send + Sync;

pub(crate) struct StubResolver {
    pub on_lookup: Box<LookupFn>,
    pub a_record: bool,
    pub calls: AtomicUsize,
}

impl StubResolver {
    pub(crate) fn new<F>(f: F) -> Self
    where
        F: Fn(&str) -> LookupResult + Send + Sync + 'static,
    {
        Self {
            on_lookup: Box::new(f),
            a_record: false,
            calls: AtomicUsize::new(0),
        }
    }

    fn with_a_record(mut self) -> Self {
        self.a_record = true;
        self
    }
}

#[async_trait]
impl LookupMx for StubResolver {
    async fn lookup_mx(&self, domain: &str) -> LookupResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.on_lookup)(domain)
    }

    async fn lookup_a(&self, _domain: &str) -> Result<bool, MxLookupError> {
        Ok(self.a_record)
    }
}

#[test]
fn normalize_domain_rejects_empty() {
    let err = resolver::normalize_domain("").expect_err("empty domain should fail");
    assert!(matches!(err, MxLookupError::EmptyDomain));
}

#[test]
fn normalize_exchange_trims_dot_and_lowercases() {
    let out = resolver::normalize_exchange("Mail.EXAMPLE-MX.com.".to_string());
    assert_eq!(out, "mail.example-mx.com");
}

#[tokio::test]
async fn resolve_with_sorts_and_dedups_records() {
    let stub = StubResolver::new(|domain| {
        assert_eq!(domain, "acme.io");
        Ok(vec![
            MxRecord::new(20, "mx2.acme.io"),
            MxRecord::new(10, "mx1.acme.io"),
            MxRecord::new(10, "mx1.acme.io"),
            MxRecord::new(30, "mx3.acme.io"),
        ])
    });

    let records = resolver::resolve_with(&stub, "acme.io")
        .await
        .expect("lookup succeeds");
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].preference, 10);
    assert_eq!(records[0].exchange, "mx1.acme.io");
    assert_eq!(records[2].preference, 30);
}

#[tokio::test]
async fn parking_keyword_poisons_the_set() {
    let stub = StubResolver::new(|_| {
        Ok(vec![
            MxRecord::new(10, "mx1.acme.io"),
            MxRecord::new(20, "mail.parking-lot.net"),
        ])
    });

    let err = resolver::resolve_with(&stub, "acme.io")
        .await
        .expect_err("parked exchange should fail the lookup");
    match err {
        MxLookupError::ParkedExchange { host } => assert_eq!(host, "mail.parking-lot.net"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn empty_mx_falls_back_to_a_record() {
    let stub = StubResolver::new(|_| Ok(Vec::new())).with_a_record();
    let records = resolver::resolve_with(&stub, "acme.io")
        .await
        .expect("lookup succeeds");
    assert_eq!(records, vec![MxRecord::new(0, "acme.io")]);
}

#[tokio::test]
async fn empty_mx_without_a_record_stays_empty() {
    let stub = StubResolver::new(|_| Ok(Vec::new()));
    let records = resolver::resolve_with(&stub, "acme.io")
        .await
        .expect("lookup succeeds");
    assert!(records.is_empty());
}

#[tokio::test]
async fn cache_serves_repeat_lookups() {
    let stub = Arc::new(StubResolver::new(|_| {
        Ok(vec![MxRecord::new(10, "mx1.acme.io")])
    }));
    let resolver = MxResolver::new(stub.clone());

    let first = resolver.resolve("acme.io").await.expect("first lookup");
    let second = resolver.resolve("acme.io").await.expect("second lookup");
    assert_eq!(first, second);
    assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn errors_are_not_cached() {
    let stub = Arc::new(StubResolver::new(|domain| {
        Err(MxLookupError::Timeout {
            domain: domain.to_string(),
        })
    }));
    let resolver = MxResolver::new(stub.clone());

    assert!(resolver.resolve("acme.io").await.is_err());
    assert!(resolver.resolve("acme.io").await.is_err());
    assert_eq!(stub.calls.load(Ordering::SeqCst), 2);
}
