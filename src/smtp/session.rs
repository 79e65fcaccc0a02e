use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_native_tls::{TlsConnector, TlsStream};

use crate::smtp::error::SmtpProbeError;
use crate::smtp::options::SmtpProbeOptions;

#[derive(Debug, Clone)]
pub struct SmtpReply {
    pub code: u16,
    pub lines: Vec<String>,
}

impl SmtpReply {
    pub fn is_positive_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }

    pub fn is_transient_failure(&self) -> bool {
        (400..500).contains(&self.code)
    }

    pub fn is_permanent_failure(&self) -> bool {
        (500..600).contains(&self.code)
    }

    pub fn has_capability(&self, cap: &str) -> bool {
        let upper = cap.to_ascii_uppercase();
        self.lines.iter().any(|line| {
            line.split_whitespace()
                .next()
                .map(|token| token.eq_ignore_ascii_case(&upper))
                .unwrap_or(false)
        })
    }

    pub fn text(&self) -> String {
        self.lines.join(" ")
    }
}

#[derive(Debug)]
enum StreamState {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
    Invalid,
}

#[derive(Debug)]
pub struct SmtpStream {
    state: StreamState,
    buffer: Vec<u8>,
    command_timeout: Duration,
}

impl SmtpStream {
    pub async fn connect(
        host: &str,
        port: u16,
        connect_timeout: Duration,
        command_timeout: Duration,
    ) -> Result<Self, SmtpProbeError> {
        let connect = TcpStream::connect((host, port));
        let stream = tokio::time::timeout(connect_timeout, connect)
            .await
            .map_err(|_| SmtpProbeError::Timeout {
                host: format!("{host}:{port}"),
            })?
            .map_err(|err| SmtpProbeError::Connect {
                host: format!("{host}:{port}"),
                source: err,
            })?;
        Ok(Self {
            state: StreamState::Plain(stream),
            buffer: Vec::new(),
            command_timeout,
        })
    }

    /// Implicit-TLS connect (port 465): handshake before the banner.
    pub async fn connect_tls(
        host: &str,
        port: u16,
        connector: &TlsConnector,
        connect_timeout: Duration,
        tls_timeout: Duration,
        command_timeout: Duration,
    ) -> Result<Self, SmtpProbeError> {
        let mut stream = Self::connect(host, port, connect_timeout, command_timeout).await?;
        stream.upgrade_tls(host, connector, tls_timeout).await?;
        Ok(stream)
    }

    pub async fn upgrade_tls(
        &mut self,
        domain: &str,
        connector: &TlsConnector,
        tls_timeout: Duration,
    ) -> Result<(), SmtpProbeError> {
        let mut state = StreamState::Invalid;
        std::mem::swap(&mut self.state, &mut state);
        let plain = match state {
            StreamState::Plain(stream) => stream,
            StreamState::Tls(stream) => {
                self.state = StreamState::Tls(stream);
                return Ok(());
            }
            StreamState::Invalid => unreachable!(),
        };

        let handshake = connector.connect(domain, plain);
        let tls = tokio::time::timeout(tls_timeout, handshake)
            .await
            .map_err(|_| SmtpProbeError::Timeout {
                host: domain.to_string(),
            })?
            .map_err(|err| SmtpProbeError::Tls { source: err })?;
        self.state = StreamState::Tls(Box::new(tls));
        Ok(())
    }

    pub async fn send_command(&mut self, command: &str) -> Result<(), SmtpProbeError> {
        let mut data = command.as_bytes().to_vec();
        data.extend_from_slice(b"\r\n");
        self.write_all(&data).await
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<(), SmtpProbeError> {
        let timeout = self.command_timeout;
        let io = async {
            match &mut self.state {
                StreamState::Plain(stream) => {
                    stream.write_all(data).await?;
                    stream.flush().await
                }
                StreamState::Tls(stream) => {
                    stream.write_all(data).await?;
                    stream.flush().await
                }
                StreamState::Invalid => Err(std::io::Error::other("invalid stream state")),
            }
        };
        tokio::time::timeout(timeout, io)
            .await
            .map_err(|_| SmtpProbeError::Timeout {
                host: "peer".to_string(),
            })?
            .map_err(|err| SmtpProbeError::Io { source: err })
    }

    pub async fn read_reply(&mut self) -> Result<SmtpReply, SmtpProbeError> {
        let mut lines = Vec::new();
        let mut code: Option<u16> = None;
        loop {
            let line = self.read_line().await?;
            if line.len() < 3 {
                return Err(SmtpProbeError::Protocol(format!("invalid reply: {line}")));
            }
            let parsed_code = line[..3].parse::<u16>().map_err(|_| {
                SmtpProbeError::Protocol(format!("invalid code in line: {line}"))
            })?;
            if let Some(existing) = code {
                if existing != parsed_code {
                    return Err(SmtpProbeError::Protocol(format!(
                        "inconsistent reply codes: {existing} vs {parsed_code}"
                    )));
                }
            } else {
                code = Some(parsed_code);
            }
            let is_last = !line.as_bytes().get(3).map(|b| *b == b'-').unwrap_or(false);
            let text = if line.len() > 4 {
                line[4..].to_string()
            } else {
                String::new()
            };
            lines.push(text);
            if is_last {
                break;
            }
        }
        Ok(SmtpReply {
            code: code.unwrap_or(0),
            lines,
        })
    }

    async fn read_line(&mut self) -> Result<String, SmtpProbeError> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|byte| *byte == b'\n') {
                let mut line = self.buffer.drain(..=pos).collect::<Vec<_>>();
                if line.ends_with(b"\r\n") {
                    line.truncate(line.len() - 2);
                } else if line.ends_with(b"\n") {
                    line.truncate(line.len() - 1);
                }
                return String::from_utf8(line)
                    .map_err(|err| SmtpProbeError::Protocol(format!("utf8 error: {err}")));
            }

            let mut buf = [0u8; 512];
            let timeout = self.command_timeout;
            let read = async {
                match &mut self.state {
                    StreamState::Plain(stream) => stream.read(&mut buf).await,
                    StreamState::Tls(stream) => stream.read(&mut buf).await,
                    StreamState::Invalid => Err(std::io::Error::other("invalid stream state")),
                }
            };
            let read = tokio::time::timeout(timeout, read)
                .await
                .map_err(|_| SmtpProbeError::Timeout {
                    host: "peer".to_string(),
                })?
                .map_err(|err| SmtpProbeError::Io { source: err })?;
            if read == 0 {
                return Err(SmtpProbeError::Io {
                    source: std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "connection closed",
                    ),
                });
            }
            self.buffer.extend_from_slice(&buf[..read]);
        }
    }
}

/// An SMTP session past the greeting/EHLO exchange, ready for MAIL FROM.
/// This is the unit the connection pool caches.
#[derive(Debug)]
pub struct SmtpSession {
    host: String,
    stream: SmtpStream,
    pub banner: Option<String>,
    pub esmtp: bool,
}

impl SmtpSession {
    /// Connect and run the opening dialogue: banner, EHLO (HELO fallback),
    /// and — on the submission port — opportunistic STARTTLS with re-EHLO.
    /// Port 465 uses implicit TLS, port 25 stays in the clear.
    pub async fn establish(
        host: &str,
        port: u16,
        options: &SmtpProbeOptions,
    ) -> Result<Self, SmtpProbeError> {
        let connector = TlsConnector::from(
            native_tls::TlsConnector::new().map_err(|err| SmtpProbeError::Tls { source: err })?,
        );

        let stream = if port == 465 {
            SmtpStream::connect_tls(
                host,
                port,
                &connector,
                options.connect_timeout,
                options.tls_timeout,
                options.command_timeout,
            )
            .await?
        } else {
            SmtpStream::connect(host, port, options.connect_timeout, options.command_timeout)
                .await?
        };

        let mut session = Self {
            host: host.to_string(),
            stream,
            banner: None,
            esmtp: false,
        };

        let banner = session.stream.read_reply().await?;
        if !banner.is_positive_completion() {
            return Err(SmtpProbeError::Protocol(format!(
                "unexpected greeting from {host}: {}",
                banner.code
            )));
        }
        session.banner = Some(banner.text());

        let helo_cmd = format!("EHLO {}", options.helo_domain);
        let mut reply = session.command(&helo_cmd).await?;
        session.esmtp = reply.is_positive_completion();
        if !session.esmtp {
            reply = session
                .command(&format!("HELO {}", options.helo_domain))
                .await?;
            if !reply.is_positive_completion() {
                return Err(SmtpProbeError::Protocol(format!(
                    "EHLO/HELO rejected by {host}: {}",
                    reply.code
                )));
            }
        }

        if port == 587 && session.esmtp && reply.has_capability("STARTTLS") {
            let tls_reply = session.command("STARTTLS").await?;
            if tls_reply.is_positive_completion() {
                session
                    .stream
                    .upgrade_tls(host, &connector, options.tls_timeout)
                    .await?;
                session.command(&helo_cmd).await?;
            }
        }

        Ok(session)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub async fn command(&mut self, command: &str) -> Result<SmtpReply, SmtpProbeError> {
        tracing::trace!(host = %self.host, command, "smtp send");
        self.stream.send_command(command).await?;
        let reply = self.stream.read_reply().await?;
        tracing::trace!(host = %self.host, code = reply.code, "smtp reply");
        Ok(reply)
    }

    pub async fn mail_from(&mut self, sender: &str) -> Result<SmtpReply, SmtpProbeError> {
        let envelope = if sender.is_empty() {
            "MAIL FROM:<>".to_string()
        } else {
            format!("MAIL FROM:<{sender}>")
        };
        self.command(&envelope).await
    }

    pub async fn rcpt_to(&mut self, address: &str) -> Result<SmtpReply, SmtpProbeError> {
        self.command(&format!("RCPT TO:<{address}>")).await
    }

    pub async fn rset(&mut self) -> Result<SmtpReply, SmtpProbeError> {
        self.command("RSET").await
    }

    /// Polite close; errors are irrelevant at this point.
    pub async fn quit(mut self) {
        if self.stream.send_command("QUIT").await.is_ok() {
            let _ = self.stream.read_reply().await;
        }
    }
}
