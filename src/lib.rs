#![forbid(unsafe_code)]
//! mailverdict — email deliverability verification engine.
//!
//! For each submitted address the pipeline combines syntax validation,
//! MX resolution, SMTP probing (EHLO/MAIL/RCPT, never DATA), domain
//! infrastructure fingerprinting and heuristic classification into a
//! verdict of deliverable / undeliverable / risky / unknown with a
//! quality score and a human-readable reason. A queue-driven worker fans
//! out per-address pipelines, batching SMTP probes per destination domain
//! behind a connection pool, a shared token bucket and a circuit breaker.

pub mod batch;
pub mod classify;
pub mod decision;
pub mod gateway;
pub mod infra;
pub mod job;
pub mod limiter;
pub mod mx;
pub mod pipeline;
pub mod reputation;
pub mod smtp;
pub mod validator;

pub use decision::{Signals, Verdict, VerdictStatus, decide};
pub use gateway::{MailboxProber, SmtpGateway};
pub use job::{JobEnvelope, JobProgress, JobStatus, Worker, WorkerConfig};
pub use pipeline::{EngineConfig, VerificationResult, VerifyEngine};
pub use validator::{ParsedEmail, parse_email, validate_email};
