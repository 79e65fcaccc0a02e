use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex as AsyncMutex;

use crate::smtp::error::SmtpProbeError;
use crate::smtp::options::SmtpProbeOptions;
use crate::smtp::session::SmtpSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_per_host: usize,
    pub idle_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_per_host: 3,
            idle_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PoolKey {
    host: String,
    port: u16,
}

struct IdleEntry {
    session: SmtpSession,
    last_used: Instant,
}

#[derive(Default)]
struct HostPool {
    idle: AsyncMutex<VecDeque<IdleEntry>>,
}

/// Per-host bounded pool of established SMTP sessions.
///
/// Idle lists are protected by a per-host async mutex which also
/// serialises fresh connection setup; sessions handed out by `acquire`
/// are exclusively owned by the caller until `release`d. A caller that
/// drops a session instead of releasing it simply closes the socket,
/// so cancelled pipelines cannot leak connections.
pub struct SmtpPool {
    hosts: std::sync::Mutex<HashMap<PoolKey, Arc<HostPool>>>,
    config: PoolConfig,
    options: SmtpProbeOptions,
}

impl SmtpPool {
    pub fn new(config: PoolConfig, options: SmtpProbeOptions) -> Self {
        Self {
            hosts: std::sync::Mutex::new(HashMap::new()),
            config,
            options,
        }
    }

    pub fn options(&self) -> &SmtpProbeOptions {
        &self.options
    }

    fn host_pool(&self, host: &str, port: u16) -> Arc<HostPool> {
        let key = PoolKey {
            host: host.to_string(),
            port,
        };
        let mut hosts = self.hosts.lock().expect("pool map poisoned");
        hosts.entry(key).or_default().clone()
    }

    /// Pop a live idle session or open a fresh one. Stale idle entries are
    /// pruned opportunistically on every call.
    pub async fn acquire(&self, host: &str, port: u16) -> Result<SmtpSession, SmtpProbeError> {
        let pool = self.host_pool(host, port);
        let mut idle = pool.idle.lock().await;

        let mut stale = Vec::new();
        while let Some(entry) = idle.front() {
            if entry.last_used.elapsed() > self.config.idle_timeout {
                stale.push(idle.pop_front().expect("front checked"));
            } else {
                break;
            }
        }
        for entry in stale {
            entry.session.quit().await;
        }

        if let Some(entry) = idle.pop_front() {
            tracing::trace!(host, port, "reusing pooled smtp session");
            return Ok(entry.session);
        }

        // Fresh connections are opened while holding the host mutex so a
        // burst of acquires cannot stampede one server.
        SmtpSession::establish(host, port, &self.options).await
    }

    /// Return a session to the idle list, or close it when the per-host
    /// cap is already met.
    pub async fn release(&self, host: &str, port: u16, session: SmtpSession) {
        let pool = self.host_pool(host, port);
        let mut idle = pool.idle.lock().await;
        if idle.len() < self.config.max_per_host {
            idle.push_back(IdleEntry {
                session,
                last_used: Instant::now(),
            });
        } else {
            drop(idle);
            session.quit().await;
        }
    }

    #[cfg(test)]
    pub(crate) async fn idle_count(&self, host: &str, port: u16) -> usize {
        self.host_pool(host, port).idle.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    use super::*;

    /// Minimal SMTP-ish endpoint: greets, answers 250 to everything,
    /// 221 to QUIT.
    async fn spawn_greeter(max_sessions: usize) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind greeter");
        let port = listener.local_addr().expect("addr").port();
        tokio::spawn(async move {
            for _ in 0..max_sessions {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                tokio::spawn(async move {
                    let (read, mut write) = stream.into_split();
                    let mut reader = BufReader::new(read);
                    if write.write_all(b"220 pool.test ESMTP\r\n").await.is_err() {
                        return;
                    }
                    let mut line = String::new();
                    loop {
                        line.clear();
                        match reader.read_line(&mut line).await {
                            Ok(0) | Err(_) => return,
                            Ok(_) => {}
                        }
                        let quitting = line.starts_with("QUIT");
                        let reply: &[u8] = if quitting { b"221 bye\r\n" } else { b"250 ok\r\n" };
                        if write.write_all(reply).await.is_err() || quitting {
                            return;
                        }
                    }
                });
            }
        });
        port
    }

    fn fast_options() -> SmtpProbeOptions {
        SmtpProbeOptions {
            connect_timeout: Duration::from_millis(500),
            command_timeout: Duration::from_millis(500),
            ..SmtpProbeOptions::default()
        }
    }

    #[tokio::test]
    #[ignore = "requires loopback TCP binding"]
    async fn release_then_acquire_reuses_the_idle_entry() {
        let port = spawn_greeter(4).await;
        let pool = SmtpPool::new(PoolConfig::default(), fast_options());

        let session = pool.acquire("127.0.0.1", port).await.expect("acquire");
        pool.release("127.0.0.1", port, session).await;
        assert_eq!(pool.idle_count("127.0.0.1", port).await, 1);

        let _again = pool.acquire("127.0.0.1", port).await.expect("reacquire");
        assert_eq!(pool.idle_count("127.0.0.1", port).await, 0);
    }

    #[tokio::test]
    #[ignore = "requires loopback TCP binding"]
    async fn idle_list_never_exceeds_cap() {
        let port = spawn_greeter(8).await;
        let config = PoolConfig {
            max_per_host: 2,
            ..PoolConfig::default()
        };
        let pool = SmtpPool::new(config, fast_options());

        let mut sessions = Vec::new();
        for _ in 0..4 {
            sessions.push(pool.acquire("127.0.0.1", port).await.expect("acquire"));
        }
        for session in sessions {
            pool.release("127.0.0.1", port, session).await;
        }
        assert_eq!(pool.idle_count("127.0.0.1", port).await, 2);
    }
}
