use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use mailverdict::gateway::SmtpGateway;
use mailverdict::infra::NetInfraProber;
use mailverdict::job::{MemoryStore, RedisQueue, Worker, WorkerConfig};
use mailverdict::limiter::{GateConfig, RedisGate};
use mailverdict::mx::MxResolver;
use mailverdict::pipeline::{EngineConfig, VerifyEngine};
use mailverdict::reputation::ReputationStore;
use mailverdict::smtp::{PoolConfig, SmtpPool, SmtpProbeOptions};

/// Queue worker: pulls verification jobs and runs the pipeline.
#[derive(Parser, Debug)]
#[command(name = "mailverdict-worker", version, about)]
struct Cli {
    #[arg(long, env = "QUEUE_URL", default_value = "redis://127.0.0.1:6379/0")]
    queue_url: String,

    #[arg(long, env = "QUEUE_KEY", default_value = "email_jobs")]
    queue_key: String,

    #[arg(long, env = "RATE_LIMIT_URL", default_value = "redis://127.0.0.1:6379/2")]
    rate_limit_url: String,

    #[arg(long, env = "WORKER_CONCURRENCY", default_value_t = 10)]
    concurrency: usize,

    /// Seconds to sleep when the queue is empty.
    #[arg(long, env = "WORKER_SLEEP_EMPTY", default_value_t = 1.0)]
    sleep_empty: f64,

    #[arg(long, env = "HELO_DOMAIN", default_value = "verifier.local")]
    helo_domain: String,

    #[arg(long, env = "MAIL_FROM", default_value = "verify@verifier.local")]
    mail_from: String,

    /// Connection string for a persistence backend. The stock worker keeps
    /// results in memory behind the same trait; a custom build wires this
    /// into its own `ResultStore`.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Accepted for parity with the API deployment; unused by the worker.
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,

    /// Accepted for parity with the API deployment; unused by the worker.
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    tracing::debug!(
        auth_configured = cli.jwt_secret.is_some() || cli.api_key.is_some(),
        "starting worker"
    );

    let queue = RedisQueue::connect(&cli.queue_url, cli.queue_key.clone())
        .await
        .context("connect job queue")?;
    let gate = RedisGate::connect(&cli.rate_limit_url, GateConfig::default())
        .await
        .context("connect rate-limit store")?;

    let resolver = MxResolver::from_system_conf().context("initialize DNS resolver")?;
    let infra = NetInfraProber::from_system_conf().context("initialize infra prober")?;

    let options = SmtpProbeOptions {
        helo_domain: cli.helo_domain,
        mail_from: cli.mail_from,
        ..SmtpProbeOptions::default()
    };
    let pool = SmtpPool::new(PoolConfig::default(), options);
    let gateway = SmtpGateway::new(pool, Arc::new(gate));

    let engine = VerifyEngine::new(
        resolver,
        Arc::new(infra),
        Arc::new(gateway),
        Arc::new(ReputationStore::new()),
        EngineConfig::default(),
    );

    // Relational/search-index stores are deployment concerns; the worker
    // ships with the in-memory reference store behind the same trait.
    if let Some(url) = &cli.database_url {
        tracing::warn!(url = %url, "DATABASE_URL set but no persistence backend is built in; using the in-memory store");
    }
    let store = Arc::new(MemoryStore::new());

    let worker = Worker::new(
        queue,
        store,
        Arc::new(engine),
        WorkerConfig {
            concurrency: cli.concurrency,
            sleep_empty: Duration::from_secs_f64(cli.sleep_empty.max(0.0)),
            ..WorkerConfig::default()
        },
    );

    tokio::select! {
        _ = worker.run() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupt received, shutting down");
        }
    }

    Ok(())
}
