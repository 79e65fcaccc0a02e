//! SMTP probing: session dialogue, connection pool, batch state machine.
//!
//! Probes never issue DATA; a session is EHLO/STARTTLS/MAIL/RCPT/RSET/QUIT
//! only.

mod error;
mod options;
pub mod pool;
pub mod probe;
pub mod session;
mod types;

pub use error::SmtpProbeError;
pub use options::SmtpProbeOptions;
pub use pool::{PoolConfig, SmtpPool};
pub use probe::{BatchOutcome, SMTP_PORTS, probe_batch};
pub use session::{SmtpReply, SmtpSession};
pub use types::{SmtpProbeResult, SmtpStatus};
